use chrono::{DateTime, TimeZone, Utc};
use collector_core::{CoreError, PostRecord, QuerySpec, RawPost, RunConfig};

const REDDIT_WEB_BASE: &str = "https://www.reddit.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExtractOptions {
    /// Post bodies are cut to this many characters; `0` keeps them whole.
    pub max_selftext_chars: usize,
}

impl From<&RunConfig> for ExtractOptions {
    fn from(config: &RunConfig) -> Self {
        Self {
            max_selftext_chars: config.max_selftext_chars,
        }
    }
}

/// Maps a raw listing post fetched by `query` onto a fully populated record.
///
/// Absent text becomes `""`, an absent score `0` and an absent creation
/// time the Unix epoch. A post without a subreddit is attributed to the
/// queried one. Only a missing post id is an error.
pub fn extract(
    raw: &RawPost,
    query: &QuerySpec,
    options: &ExtractOptions,
) -> Result<PostRecord, CoreError> {
    let id = match raw.id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => {
            return Err(CoreError::MalformedRecord {
                reason: format!(
                    "post has no id (title: {:?})",
                    raw.title.as_deref().unwrap_or_default()
                ),
            })
        }
    };

    Ok(PostRecord {
        id,
        title: raw.title.clone().unwrap_or_default(),
        author: raw.author.clone().unwrap_or_default(),
        score: raw.score.unwrap_or_default(),
        created_utc: created_at(raw.created_utc),
        permalink: absolute_permalink(raw.permalink.as_deref().unwrap_or_default()),
        selftext: truncate_chars(
            raw.selftext.as_deref().unwrap_or_default(),
            options.max_selftext_chars,
        ),
        subreddit: raw
            .subreddit
            .as_deref()
            .filter(|subreddit| !subreddit.is_empty())
            .unwrap_or(query.subreddit())
            .to_string(),
        source_query: query.source_label().to_string(),
    })
}

fn created_at(created_utc: Option<f64>) -> DateTime<Utc> {
    created_utc
        .filter(|seconds| seconds.is_finite())
        .and_then(|seconds| Utc.timestamp_opt(seconds.trunc() as i64, 0).single())
        .unwrap_or_default()
}

fn absolute_permalink(permalink: &str) -> String {
    if permalink.is_empty() || permalink.starts_with("http://") || permalink.starts_with("https://")
    {
        permalink.to_string()
    } else if permalink.starts_with('/') {
        format!("{}{}", REDDIT_WEB_BASE, permalink)
    } else {
        format!("{}/{}", REDDIT_WEB_BASE, permalink)
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if max_chars == 0 {
        return text.to_string();
    }
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_post(id: Option<&str>) -> RawPost {
        RawPost {
            id: id.map(str::to_string),
            title: Some("Rust 2024 is out".to_string()),
            author: Some("ferris".to_string()),
            score: Some(1234),
            created_utc: Some(1_700_000_000.0),
            permalink: Some("/r/rust/comments/abc123/rust_2024_is_out/".to_string()),
            selftext: Some("Release notes inside.".to_string()),
            subreddit: Some("rust".to_string()),
        }
    }

    fn hot() -> QuerySpec {
        QuerySpec::trending("rust", 10)
    }

    #[test]
    fn test_extract_complete_post() {
        let record =
            extract(&raw_post(Some("abc123")), &hot(), &ExtractOptions::default()).unwrap();

        assert_eq!(record.id, "abc123");
        assert_eq!(record.title, "Rust 2024 is out");
        assert_eq!(record.author, "ferris");
        assert_eq!(record.score, 1234);
        assert_eq!(record.created_utc.timestamp(), 1_700_000_000);
        assert_eq!(
            record.permalink,
            "https://www.reddit.com/r/rust/comments/abc123/rust_2024_is_out/"
        );
        assert_eq!(record.selftext, "Release notes inside.");
        assert_eq!(record.subreddit, "rust");
        assert_eq!(record.source_query, "hot");
    }

    #[test]
    fn test_missing_optional_fields_become_empty() {
        let raw = RawPost {
            id: Some("xyz".to_string()),
            ..RawPost::default()
        };
        let query = QuerySpec::search("OpenAI", "GPT-4", 10);
        let record = extract(&raw, &query, &ExtractOptions::default()).unwrap();

        assert_eq!(record.title, "");
        assert_eq!(record.author, "");
        assert_eq!(record.score, 0);
        assert_eq!(record.created_utc.timestamp(), 0);
        assert_eq!(record.permalink, "");
        assert_eq!(record.selftext, "");
        assert_eq!(record.subreddit, "OpenAI");
        assert_eq!(record.source_query, "GPT-4");
    }

    #[test]
    fn test_missing_id_is_malformed() {
        let result = extract(&raw_post(None), &hot(), &ExtractOptions::default());
        assert!(matches!(result, Err(CoreError::MalformedRecord { .. })));

        let result = extract(&raw_post(Some("  ")), &hot(), &ExtractOptions::default());
        assert!(matches!(result, Err(CoreError::MalformedRecord { .. })));
    }

    #[test]
    fn test_selftext_truncated_on_char_boundary() {
        let mut raw = raw_post(Some("abc123"));
        raw.selftext = Some("héllo wörld".to_string());

        let options = ExtractOptions {
            max_selftext_chars: 7,
        };
        let record = extract(&raw, &hot(), &options).unwrap();
        assert_eq!(record.selftext, "héllo w");

        let options = ExtractOptions {
            max_selftext_chars: 50,
        };
        let record = extract(&raw, &hot(), &options).unwrap();
        assert_eq!(record.selftext, "héllo wörld");
    }

    #[test]
    fn test_subreddit_falls_back_to_query() {
        let mut raw = raw_post(Some("abc123"));
        raw.subreddit = None;
        let record = extract(&raw, &hot(), &ExtractOptions::default()).unwrap();
        assert_eq!(record.subreddit, "rust");

        raw.subreddit = Some(String::new());
        let query = QuerySpec::search("MachineLearning", "GPT-4", 5);
        let record = extract(&raw, &query, &ExtractOptions::default()).unwrap();
        assert_eq!(record.subreddit, "MachineLearning");

        raw.subreddit = Some("learnrust".to_string());
        let record = extract(&raw, &hot(), &ExtractOptions::default()).unwrap();
        assert_eq!(record.subreddit, "learnrust");
    }

    #[test]
    fn test_absolute_permalink_kept() {
        assert_eq!(
            absolute_permalink("https://old.reddit.com/r/rust/comments/1/"),
            "https://old.reddit.com/r/rust/comments/1/"
        );
        assert_eq!(
            absolute_permalink("r/rust/comments/1/"),
            "https://www.reddit.com/r/rust/comments/1/"
        );
    }

    #[test]
    fn test_bad_timestamp_falls_back_to_epoch() {
        assert_eq!(created_at(Some(f64::NAN)).timestamp(), 0);
        assert_eq!(created_at(None).timestamp(), 0);
        assert_eq!(created_at(Some(1_600_000_000.9)).timestamp(), 1_600_000_000);
    }
}
