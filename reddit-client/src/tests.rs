use crate::{api, metrics, AuthState, RedditClient, RedditToken};
use collector_core::{CoreError, Credentials, PostSource, RedditApiError};
use std::time::{Duration, SystemTime};

fn create_test_credentials() -> Credentials {
    Credentials {
        client_id: "test_client_id".to_string(),
        client_secret: "test_client_secret".to_string(),
        username: "test_user".to_string(),
        password: "test_password".to_string(),
        user_agent: "reddit-collector/0.1 by test_user".to_string(),
    }
}

fn token_expiring_at(expires_at: SystemTime) -> RedditToken {
    RedditToken {
        access_token: "token".to_string(),
        expires_at,
        scope: vec!["identity".to_string(), "read".to_string()],
    }
}

#[test]
fn test_client_creation() {
    let client = RedditClient::new(create_test_credentials());
    assert!(client.is_ok());

    let client = client.unwrap();
    assert!(!client.needs_refresh());
    assert!(matches!(
        client.get_auth_state(),
        AuthState::NotAuthenticated
    ));
}

#[test]
fn test_required_scopes() {
    let scopes = RedditClient::get_required_scopes();
    assert_eq!(scopes, vec!["identity", "read"]);
}

#[test]
fn test_token_creation_and_expiry() {
    let now = SystemTime::now();
    let valid_token = token_expiring_at(now + Duration::from_secs(3600));
    let expired_token = token_expiring_at(now - Duration::from_secs(3600));

    let mut client = RedditClient::new(create_test_credentials()).unwrap();

    client.set_token(valid_token);
    assert!(matches!(
        client.get_auth_state(),
        AuthState::Authenticated { .. }
    ));
    assert!(!client.needs_refresh());

    client.set_token(expired_token);
    assert!(client.needs_refresh());
    assert!(matches!(
        client.get_auth_state(),
        AuthState::TokenExpired { .. }
    ));
}

#[tokio::test]
async fn test_ensure_authenticated_without_token() {
    let mut client = RedditClient::new(create_test_credentials()).unwrap();

    let result = client.ensure_authenticated().await;
    if let Err(CoreError::RedditApi(RedditApiError::AuthenticationFailed { reason })) = result {
        assert!(reason.contains("Not authenticated"));
    } else {
        panic!("Expected AuthenticationFailed error");
    }
}

#[tokio::test]
async fn test_ensure_authenticated_with_valid_token() {
    let mut client = RedditClient::new(create_test_credentials()).unwrap();
    client.set_token(RedditToken {
        access_token: "live_token".to_string(),
        ..token_expiring_at(SystemTime::now() + Duration::from_secs(600))
    });

    let access_token = client.ensure_authenticated().await.unwrap();
    assert_eq!(access_token, "live_token");
}

#[test]
fn test_invalid_queries_rejected_before_network() {
    let mut client = RedditClient::new(create_test_credentials()).unwrap();

    let result = tokio_test::block_on(client.fetch_trending("", 10));
    assert!(matches!(result, Err(CoreError::InvalidInput { .. })));

    let result = tokio_test::block_on(client.fetch_trending("rust", 0));
    assert!(matches!(result, Err(CoreError::InvalidInput { .. })));

    let result = tokio_test::block_on(client.search("rust", "  ", 10));
    assert!(matches!(result, Err(CoreError::InvalidInput { .. })));

    let result = tokio_test::block_on(client.fetch_trending("rust/../x", 10));
    assert!(matches!(result, Err(CoreError::InvalidInput { .. })));

    let result = tokio_test::block_on(client.search("rust?sort=new", "async", 10));
    assert!(matches!(result, Err(CoreError::InvalidInput { .. })));

    assert_eq!(client.get_api_metrics().total_requests, 0);
}

#[test]
fn test_unauthenticated_fetch_fails_without_request() {
    let mut client = RedditClient::new(create_test_credentials()).unwrap();

    let result = tokio_test::block_on(client.search("rust", "async", 5));
    assert!(matches!(
        result,
        Err(CoreError::RedditApi(
            RedditApiError::AuthenticationFailed { .. }
        ))
    ));
    assert_eq!(client.get_api_metrics().total_requests, 0);
}

#[test]
fn test_invalid_grant_body_reason() {
    let reason = crate::error_field(br#"{"error": "invalid_grant"}"#);
    assert_eq!(reason.as_deref(), Some("invalid_grant"));

    let reason = crate::error_field(br#"{"error": 401, "message": "Unauthorized"}"#);
    assert_eq!(reason.as_deref(), Some("401"));

    assert!(crate::error_field(b"<html>not json</html>").is_none());
    assert!(crate::error_field(br#"{"access_token": "abc"}"#).is_none());
}

#[test]
fn test_token_error_other() {
    let error = crate::token_error(oauth2::RequestTokenError::Other(
        "unexpected response".to_string(),
    ));
    assert!(matches!(
        error,
        CoreError::RedditApi(RedditApiError::AuthenticationFailed { ref reason })
            if reason == "unexpected response"
    ));
}

#[test]
fn test_token_serialization() {
    let token = RedditToken {
        access_token: "test_access_token".to_string(),
        expires_at: SystemTime::UNIX_EPOCH + Duration::from_secs(1640995200),
        scope: vec!["identity".to_string(), "read".to_string()],
    };

    let serialized = serde_json::to_string(&token).unwrap();
    assert!(serialized.contains("test_access_token"));

    let deserialized: RedditToken = serde_json::from_str(&serialized).unwrap();
    assert_eq!(deserialized.access_token, token.access_token);
    assert_eq!(deserialized.expires_at, token.expires_at);
    assert_eq!(deserialized.scope, token.scope);
}

#[test]
fn test_api_client_metrics_start_empty() {
    let client = api::RedditApiClient::new("test-user-agent/1.0".to_string()).unwrap();
    assert_eq!(client.get_metrics().get_metrics().total_requests, 0);
    assert!(client.get_metrics().get_endpoint_metrics("/r/rust/hot").is_none());
}

#[test]
fn test_metrics_collector_tracks_listing_endpoints() {
    let mut collector = metrics::MetricsCollector::new();

    collector.record_request(metrics::RequestMetrics {
        endpoint: "/r/rust/hot".to_string(),
        method: "GET".to_string(),
        status_code: Some(200),
        response_time: Duration::from_millis(200),
        success: true,
        rate_limited: false,
        error_type: None,
    });

    let endpoint_metrics = collector.get_endpoint_metrics("/r/rust/hot").unwrap();
    assert_eq!(endpoint_metrics.request_count, 1);
    assert_eq!(endpoint_metrics.success_rate(), 1.0);
    assert_eq!(
        endpoint_metrics.average_response_time(),
        Duration::from_millis(200)
    );
}
