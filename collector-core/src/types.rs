use crate::error::CoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reddit script-app credentials, read once at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    pub user_agent: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// Subreddit names are ASCII letters, digits and underscores.
pub fn is_valid_subreddit_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// One step of a collection run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum QuerySpec {
    Trending {
        subreddit: String,
        limit: u32,
    },
    Search {
        subreddit: String,
        keyword: String,
        limit: u32,
    },
}

impl QuerySpec {
    pub fn trending(subreddit: impl Into<String>, limit: u32) -> Self {
        QuerySpec::Trending {
            subreddit: subreddit.into(),
            limit,
        }
    }

    pub fn search(subreddit: impl Into<String>, keyword: impl Into<String>, limit: u32) -> Self {
        QuerySpec::Search {
            subreddit: subreddit.into(),
            keyword: keyword.into(),
            limit,
        }
    }

    pub fn subreddit(&self) -> &str {
        match self {
            QuerySpec::Trending { subreddit, .. } | QuerySpec::Search { subreddit, .. } => {
                subreddit
            }
        }
    }

    pub fn limit(&self) -> u32 {
        match self {
            QuerySpec::Trending { limit, .. } | QuerySpec::Search { limit, .. } => *limit,
        }
    }

    /// Value stored in `PostRecord::source_query` for posts this query returns.
    pub fn source_label(&self) -> &str {
        match self {
            QuerySpec::Trending { .. } => "hot",
            QuerySpec::Search { keyword, .. } => keyword,
        }
    }
}

impl fmt::Display for QuerySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuerySpec::Trending { subreddit, limit } => {
                write!(f, "{} hot posts from r/{}", limit, subreddit)
            }
            QuerySpec::Search {
                subreddit,
                keyword,
                limit,
            } => write!(
                f,
                "{} posts matching '{}' from r/{}",
                limit, keyword, subreddit
            ),
        }
    }
}

/// A post as it comes off a Reddit listing. Anything may be absent or null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawPost {
    pub id: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub score: Option<i64>,
    pub created_utc: Option<f64>,
    pub permalink: Option<String>,
    pub selftext: Option<String>,
    pub subreddit: Option<String>,
}

/// Flat, fully populated record written to the output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: String,
    pub title: String,
    pub author: String,
    pub score: i64,
    pub created_utc: DateTime<Utc>,
    pub permalink: String,
    pub selftext: String,
    pub subreddit: String,
    pub source_query: String,
}

impl PostRecord {
    /// Column order of the CSV output.
    pub const FIELDS: [&'static str; 9] = [
        "id",
        "title",
        "author",
        "score",
        "created_utc",
        "permalink",
        "selftext",
        "subreddit",
        "source_query",
    ];
}

/// The two reads a collection run needs from the platform.
pub trait PostSource {
    async fn fetch_trending(
        &mut self,
        subreddit: &str,
        limit: u32,
    ) -> Result<Vec<RawPost>, CoreError>;

    async fn search(
        &mut self,
        subreddit: &str,
        keyword: &str,
        limit: u32,
    ) -> Result<Vec<RawPost>, CoreError>;
}
