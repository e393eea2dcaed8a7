use crate::metrics::{MetricsCollector, RequestMetrics};
use collector_core::{CoreError, ErrorExt, RawPost, RedditApiError};
use reqwest::header::HeaderValue;
use reqwest::{redirect, Client, Method, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

const REDDIT_API_BASE: &str = "https://oauth.reddit.com";

/// Reddit caps listing pages at 100 children.
pub const MAX_PAGE_SIZE: u32 = 100;

const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Listing child kind for a link post.
const POST_KIND: &str = "t3";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListing<T> {
    pub kind: String,
    pub data: RedditListingData<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingData<T> {
    #[serde(default = "Vec::new")]
    pub children: Vec<RedditListingChild<T>>,
    pub after: Option<String>,
    pub before: Option<String>,
    pub dist: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingChild<T> {
    pub kind: String,
    pub data: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditUserData {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub created_utc: f64,
    #[serde(default)]
    pub link_karma: i64,
    #[serde(default)]
    pub comment_karma: i64,
}

#[derive(Debug)]
pub struct RedditApiClient {
    http_client: Client,
    metrics: MetricsCollector,
}

impl RedditApiClient {
    pub fn new(user_agent: String) -> Result<Self, CoreError> {
        // Unknown subreddits redirect to /subreddits/search; surface the 3xx instead.
        let http_client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .redirect(redirect::Policy::none())
            .build()?;

        Ok(Self {
            http_client,
            metrics: MetricsCollector::new(),
        })
    }

    pub fn http_client(&self) -> &Client {
        &self.http_client
    }

    pub async fn make_request(
        &mut self,
        method: Method,
        endpoint: &str,
        access_token: &str,
        query_params: &[(&str, &str)],
    ) -> Result<Response, CoreError> {
        let url = format!("{}{}", REDDIT_API_BASE, endpoint);
        let start_time = Instant::now();

        let mut request_builder = self
            .http_client
            .request(method.clone(), &url)
            .bearer_auth(access_token);
        if !query_params.is_empty() {
            request_builder = request_builder.query(query_params);
        }

        debug!("Making Reddit API request: {} {}", method, endpoint);
        let mut status_code = None;
        let outcome = match request_builder.send().await {
            Ok(response) => {
                status_code = Some(response.status().as_u16());
                check_status(
                    response.status(),
                    response.headers().get("retry-after"),
                    endpoint,
                )
                .map(|()| response)
            }
            Err(e) => {
                error!("Network error for {} {}: {}", method, endpoint, e);
                if e.is_timeout() {
                    Err(CoreError::RedditApi(RedditApiError::RequestTimeout))
                } else {
                    Err(CoreError::Network(e))
                }
            }
        };

        self.metrics.record_request(RequestMetrics {
            endpoint: endpoint.to_string(),
            method: method.to_string(),
            status_code,
            response_time: start_time.elapsed(),
            success: outcome.is_ok(),
            rate_limited: matches!(
                outcome,
                Err(CoreError::RedditApi(RedditApiError::RateLimitExceeded { .. }))
            ),
            error_type: outcome.as_ref().err().map(|e| e.error_code()),
        });

        outcome
    }

    pub async fn get_user_info(&mut self, access_token: &str) -> Result<RedditUserData, CoreError> {
        let response = self
            .make_request(Method::GET, "/api/v1/me", access_token, &[])
            .await?;

        let user_data: RedditUserData = response.json().await.map_err(|e| {
            error!("Failed to parse user data: {}", e);
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: "Failed to parse user data".to_string(),
            })
        })?;

        debug!("Retrieved user info for: {}", user_data.name);
        Ok(user_data)
    }

    /// Up to `limit` posts from `/r/{subreddit}/hot`, in the platform's order.
    pub async fn get_hot_posts(
        &mut self,
        access_token: &str,
        subreddit: &str,
        limit: u32,
    ) -> Result<Vec<RawPost>, CoreError> {
        let endpoint = format!("/r/{}/hot", subreddit);
        let posts = self
            .get_listing(access_token, &endpoint, subreddit, &[], limit)
            .await?;

        info!("Retrieved {} hot posts from r/{}", posts.len(), subreddit);
        Ok(posts)
    }

    /// Up to `limit` posts from r/{subreddit} matching `keyword`, by relevance.
    pub async fn search_posts(
        &mut self,
        access_token: &str,
        subreddit: &str,
        keyword: &str,
        limit: u32,
    ) -> Result<Vec<RawPost>, CoreError> {
        let endpoint = format!("/r/{}/search", subreddit);
        let params = [("q", keyword), ("restrict_sr", "1"), ("sort", "relevance")];
        let posts = self
            .get_listing(access_token, &endpoint, subreddit, &params, limit)
            .await?;

        info!(
            "Retrieved {} posts matching '{}' from r/{}",
            posts.len(),
            keyword,
            subreddit
        );
        Ok(posts)
    }

    async fn get_listing(
        &mut self,
        access_token: &str,
        endpoint: &str,
        subreddit: &str,
        base_params: &[(&str, &str)],
        limit: u32,
    ) -> Result<Vec<RawPost>, CoreError> {
        let limit = limit as usize;
        let mut posts = Vec::with_capacity(limit.min(MAX_PAGE_SIZE as usize));
        let mut after: Option<String> = None;

        while posts.len() < limit {
            let page_size = page_size(posts.len(), limit).to_string();

            let mut params = base_params.to_vec();
            params.push(("limit", page_size.as_str()));
            params.push(("raw_json", "1"));
            if let Some(cursor) = after.as_deref() {
                params.push(("after", cursor));
            }

            let response = self
                .make_request(Method::GET, endpoint, access_token, &params)
                .await?;

            let listing: RedditListing<RawPost> = response.json().await.map_err(|e| {
                error!("Failed to parse listing {}: {}", endpoint, e);
                CoreError::RedditApi(RedditApiError::InvalidResponse {
                    details: format!("Failed to parse posts for r/{}", subreddit),
                })
            })?;

            debug!(
                "Page of {} children from {}",
                listing.data.children.len(),
                endpoint
            );
            after = absorb_page(&mut posts, listing, limit);
            if after.is_none() {
                break;
            }
        }

        Ok(posts)
    }

    pub fn get_metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

}

/// Posts to request next when `collected` of `limit` are already in hand.
fn page_size(collected: usize, limit: usize) -> usize {
    limit.saturating_sub(collected).min(MAX_PAGE_SIZE as usize)
}

/// Appends the page's posts to `posts` without going past `limit` and returns
/// the cursor for the next page. `None` once the listing or the limit is
/// exhausted. Children that are not posts are skipped.
fn absorb_page(
    posts: &mut Vec<RawPost>,
    listing: RedditListing<RawPost>,
    limit: usize,
) -> Option<String> {
    let RedditListingData {
        children, after, ..
    } = listing.data;
    let page_len = children.len();
    let remaining = limit.saturating_sub(posts.len());

    let (kept, skipped): (Vec<_>, Vec<_>) = children
        .into_iter()
        .partition(|child| child.kind == POST_KIND);
    if !skipped.is_empty() {
        warn!("Skipped {} listing children that are not posts", skipped.len());
    }
    posts.extend(kept.into_iter().take(remaining).map(|child| child.data));

    if page_len == 0 || posts.len() >= limit {
        return None;
    }
    after
}

/// Maps a non-success status onto the error taxonomy.
pub fn check_status(
    status: StatusCode,
    retry_after: Option<&HeaderValue>,
    endpoint: &str,
) -> Result<(), CoreError> {
    if status.is_success() {
        debug!("Request successful: {} {}", status, endpoint);
        return Ok(());
    }

    error!("Request failed with status: {} for {}", status, endpoint);
    let error = match status.as_u16() {
        429 => {
            let retry_after = retry_after
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<f64>().ok())
                .map(|seconds| seconds.ceil() as u64)
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            warn!("Rate limited, retry after {} seconds", retry_after);
            RedditApiError::RateLimitExceeded { retry_after }
        }
        401 => RedditApiError::InvalidToken,
        403 => RedditApiError::Forbidden {
            resource: endpoint.to_string(),
        },
        404 => RedditApiError::SubredditNotFound {
            subreddit: subreddit_from_endpoint(endpoint).to_string(),
        },
        _ if status.is_redirection() => RedditApiError::SubredditNotFound {
            subreddit: subreddit_from_endpoint(endpoint).to_string(),
        },
        code if status.is_server_error() => RedditApiError::ServerError { status_code: code },
        code => RedditApiError::InvalidResponse {
            details: format!("Unexpected status {} for {}", code, endpoint),
        },
    };
    Err(CoreError::RedditApi(error))
}

fn subreddit_from_endpoint(endpoint: &str) -> &str {
    endpoint
        .strip_prefix("/r/")
        .and_then(|rest| rest.split('/').next())
        .unwrap_or(endpoint)
}
