pub mod api;
pub mod metrics;

#[cfg(test)]
mod tests;

use api::RedditApiClient;
use collector_core::{
    is_valid_subreddit_name, CoreError, Credentials, PostSource, RawPost, RedditApiError,
};
use oauth2::basic::{BasicClient, BasicErrorResponse};
use oauth2::{
    AuthUrl, ClientId, ClientSecret, HttpRequest, HttpResponse, RequestTokenError,
    ResourceOwnerPassword, ResourceOwnerUsername, Scope, TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};
use tracing::{debug, info};

const REDDIT_AUTH_URL: &str = "https://www.reddit.com/api/v1/authorize";
const REDDIT_TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";

/// Reddit access tokens last an hour; used when the response omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditToken {
    pub access_token: String,
    pub expires_at: SystemTime,
    pub scope: Vec<String>,
}

impl RedditToken {
    pub fn is_expired(&self) -> bool {
        SystemTime::now() >= self.expires_at
    }
}

#[derive(Debug, Clone)]
pub enum AuthState {
    NotAuthenticated,
    Authenticated { token: RedditToken },
    TokenExpired { token: RedditToken },
}

/// Authenticated Reddit session for a script app (password grant).
#[derive(Debug)]
pub struct RedditClient {
    credentials: Credentials,
    oauth_client: BasicClient,
    api_client: RedditApiClient,
    auth_state: AuthState,
}

impl RedditClient {
    pub fn new(credentials: Credentials) -> Result<Self, CoreError> {
        let oauth_client = BasicClient::new(
            ClientId::new(credentials.client_id.clone()),
            Some(ClientSecret::new(credentials.client_secret.clone())),
            AuthUrl::new(REDDIT_AUTH_URL.to_string()).map_err(invalid_url)?,
            Some(TokenUrl::new(REDDIT_TOKEN_URL.to_string()).map_err(invalid_url)?),
        );
        let api_client = RedditApiClient::new(credentials.user_agent.clone())?;

        Ok(Self {
            credentials,
            oauth_client,
            api_client,
            auth_state: AuthState::NotAuthenticated,
        })
    }

    /// Authenticates and checks the account before handing out the session.
    pub async fn connect(credentials: &Credentials) -> Result<Self, CoreError> {
        let mut client = Self::new(credentials.clone())?;
        client.authenticate().await?;

        let access_token = client.ensure_authenticated().await?;
        let me = client.api_client.get_user_info(&access_token).await?;
        info!("Connected as u/{}", me.name);

        Ok(client)
    }

    pub fn get_required_scopes() -> Vec<&'static str> {
        vec!["identity", "read"]
    }

    pub async fn authenticate(&mut self) -> Result<(), CoreError> {
        info!(
            "Requesting access token for u/{}",
            self.credentials.username
        );

        let username = ResourceOwnerUsername::new(self.credentials.username.clone());
        let password = ResourceOwnerPassword::new(self.credentials.password.clone());
        let scopes = Self::get_required_scopes()
            .into_iter()
            .map(|scope| Scope::new(scope.to_string()));
        let http_client = self.api_client.http_client();

        let token_response = self
            .oauth_client
            .exchange_password(&username, &password)
            .add_scopes(scopes)
            .request_async(|request| token_http_client(http_client, request))
            .await
            .map_err(token_error)?;

        let lifetime = token_response
            .expires_in()
            .unwrap_or(DEFAULT_TOKEN_LIFETIME);
        let scope = token_response
            .scopes()
            .map(|scopes| scopes.iter().map(|s| s.as_str().to_string()).collect())
            .unwrap_or_default();

        self.set_token(RedditToken {
            access_token: token_response.access_token().secret().clone(),
            expires_at: SystemTime::now() + lifetime,
            scope,
        });
        debug!("Access token valid for {:?}", lifetime);
        Ok(())
    }

    pub fn set_token(&mut self, token: RedditToken) {
        self.auth_state = if token.is_expired() {
            AuthState::TokenExpired { token }
        } else {
            AuthState::Authenticated { token }
        };
    }

    pub fn get_auth_state(&self) -> &AuthState {
        &self.auth_state
    }

    pub fn needs_refresh(&self) -> bool {
        match &self.auth_state {
            AuthState::NotAuthenticated => false,
            AuthState::Authenticated { token } => token.is_expired(),
            AuthState::TokenExpired { .. } => true,
        }
    }

    /// Returns a usable access token, repeating the password grant once the
    /// current token has expired.
    pub async fn ensure_authenticated(&mut self) -> Result<String, CoreError> {
        if self.needs_refresh() {
            info!("Access token expired, requesting a new one");
            self.authenticate().await?;
        }

        match &self.auth_state {
            AuthState::Authenticated { token } => Ok(token.access_token.clone()),
            AuthState::NotAuthenticated => Err(CoreError::RedditApi(
                RedditApiError::AuthenticationFailed {
                    reason: "Not authenticated. Connect before fetching posts".to_string(),
                },
            )),
            AuthState::TokenExpired { .. } => Err(CoreError::RedditApi(
                RedditApiError::AuthenticationFailed {
                    reason: "Token expired and could not be renewed".to_string(),
                },
            )),
        }
    }

    pub fn get_api_metrics(&self) -> &metrics::ApiMetrics {
        self.api_client.get_metrics().get_metrics()
    }

    pub fn log_api_summary(&self) {
        self.api_client.get_metrics().log_summary();
    }
}

impl PostSource for RedditClient {
    async fn fetch_trending(
        &mut self,
        subreddit: &str,
        limit: u32,
    ) -> Result<Vec<RawPost>, CoreError> {
        validate_query(subreddit, None, limit)?;
        let access_token = self.ensure_authenticated().await?;
        self.api_client
            .get_hot_posts(&access_token, subreddit, limit)
            .await
    }

    async fn search(
        &mut self,
        subreddit: &str,
        keyword: &str,
        limit: u32,
    ) -> Result<Vec<RawPost>, CoreError> {
        validate_query(subreddit, Some(keyword), limit)?;
        let access_token = self.ensure_authenticated().await?;
        self.api_client
            .search_posts(&access_token, subreddit, keyword, limit)
            .await
    }
}

fn validate_query(subreddit: &str, keyword: Option<&str>, limit: u32) -> Result<(), CoreError> {
    if !is_valid_subreddit_name(subreddit) {
        return Err(CoreError::InvalidInput {
            message: format!(
                "Subreddit name {:?} must be letters, digits or underscores",
                subreddit
            ),
        });
    }
    if keyword.is_some_and(|keyword| keyword.trim().is_empty()) {
        return Err(CoreError::InvalidInput {
            message: "Query must be a non-empty string".to_string(),
        });
    }
    if limit == 0 {
        return Err(CoreError::InvalidInput {
            message: "Limit must be a positive integer".to_string(),
        });
    }
    Ok(())
}

/// Sends oauth2 token requests through the client that carries our User-Agent.
async fn token_http_client(
    client: &reqwest::Client,
    request: HttpRequest,
) -> Result<HttpResponse, reqwest::Error> {
    let response = client
        .request(request.method, request.url)
        .headers(request.headers)
        .body(request.body)
        .send()
        .await?;

    let status_code = response.status();
    let headers = response.headers().clone();
    let body = response.bytes().await?.to_vec();

    Ok(HttpResponse {
        status_code,
        headers,
        body,
    })
}

fn token_error(error: RequestTokenError<reqwest::Error, BasicErrorResponse>) -> CoreError {
    let reason = match error {
        RequestTokenError::ServerResponse(response) => response.to_string(),
        RequestTokenError::Request(e) => return CoreError::Network(e),
        // Reddit answers a wrong password with 200 and {"error": "invalid_grant"}.
        RequestTokenError::Parse(e, body) => error_field(&body).unwrap_or_else(|| e.to_string()),
        RequestTokenError::Other(reason) => reason,
    };
    CoreError::RedditApi(RedditApiError::AuthenticationFailed { reason })
}

fn error_field(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value.get("error").map(|error| match error.as_str() {
        Some(text) => text.to_string(),
        None => error.to_string(),
    })
}

fn invalid_url(error: oauth2::url::ParseError) -> CoreError {
    CoreError::InvalidInput {
        message: format!("Invalid OAuth2 endpoint: {}", error),
    }
}
