//! Credential lifecycle: cached token reuse, refresh exchange, and the
//! invalidation rules that force a full authorization flow.

use chrono::{Duration, Utc};
use gmail_agent::auth::{Authenticator, Scope, StoredToken};
use gmail_agent::config::CredentialPaths;
use gmail_agent::error::GmailError;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn write_client_secret(paths: &CredentialPaths, token_uri: &str) {
    paths.ensure_dir().await.unwrap();
    let secret = serde_json::json!({
        "installed": {
            "client_id": "test-client-id",
            "client_secret": "test-client-secret",
            "auth_uri": "https://accounts.google.com/o/oauth2/auth",
            "token_uri": token_uri,
            "redirect_uris": ["http://localhost"]
        }
    });
    tokio::fs::write(paths.client_secret_file(), secret.to_string())
        .await
        .unwrap();
}

async fn write_token(paths: &CredentialPaths, token: &StoredToken) {
    paths.ensure_dir().await.unwrap();
    tokio::fs::write(paths.token_file(), serde_json::to_string(token).unwrap())
        .await
        .unwrap();
}

fn stored_token(access: &str, refresh: Option<&str>, expires_in_secs: i64) -> StoredToken {
    StoredToken {
        access_token: access.to_string(),
        refresh_token: refresh.map(str::to_string),
        expires_at: Some(Utc::now() + Duration::seconds(expires_in_secs)),
        scopes: vec!["https://www.googleapis.com/auth/gmail.readonly".to_string()],
    }
}

#[tokio::test]
async fn valid_cached_token_is_returned_unchanged() {
    let temp = tempfile::tempdir().unwrap();
    let paths = CredentialPaths::with_dir(temp.path());
    write_token(&paths, &stored_token("cached-token", None, 3600)).await;

    let auth = Authenticator::new(paths);
    let token = auth.acquire(false).await.unwrap();
    assert_eq!(token.access_token, "cached-token");
}

#[tokio::test]
async fn expired_token_is_refreshed_and_persisted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=r1"))
        .and(body_string_contains("client_id=test-client-id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "fresh-token",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let temp = tempfile::tempdir().unwrap();
    let paths = CredentialPaths::with_dir(temp.path());
    write_client_secret(&paths, &format!("{}/token", server.uri())).await;
    write_token(&paths, &stored_token("stale-token", Some("r1"), -100)).await;

    let auth = Authenticator::new(paths.clone());
    let token = auth.acquire(false).await.unwrap();

    assert_eq!(token.access_token, "fresh-token");
    // Google omits the refresh token on refresh responses; the old one is kept.
    assert_eq!(token.refresh_token.as_deref(), Some("r1"));
    assert!(token.is_valid());

    let persisted = tokio::fs::read_to_string(paths.token_file()).await.unwrap();
    assert!(persisted.contains("fresh-token"));
    assert!(!persisted.contains("stale-token"));
}

#[tokio::test]
async fn refresh_response_may_rotate_the_refresh_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "fresh-token",
            "token_type": "Bearer",
            "expires_in": 3600,
            "refresh_token": "r2"
        })))
        .mount(&server)
        .await;

    let temp = tempfile::tempdir().unwrap();
    let paths = CredentialPaths::with_dir(temp.path());
    write_client_secret(&paths, &format!("{}/token", server.uri())).await;
    write_token(&paths, &stored_token("stale-token", Some("r1"), -100)).await;

    let auth = Authenticator::new(paths);
    let token = auth.acquire(false).await.unwrap();
    assert_eq!(token.refresh_token.as_deref(), Some("r2"));
}

#[tokio::test]
async fn scope_change_deletes_the_cached_token() {
    let temp = tempfile::tempdir().unwrap();
    let paths = CredentialPaths::with_dir(temp.path());
    // The cached token is still valid; a scope change must discard it anyway.
    write_token(&paths, &stored_token("still-valid", Some("r1"), 3600)).await;

    let auth = Authenticator::new(paths.clone());
    auth.set_scope(Scope::Full).await.unwrap();

    assert!(!paths.token_file().exists());
    assert_eq!(auth.current_scope().await, Scope::Full);

    // With no client secret on disk the forced full flow reports NotConfigured
    // instead of ever touching the discarded token.
    let err = auth.acquire(false).await.unwrap_err();
    assert!(matches!(err, GmailError::NotConfigured));
}

#[tokio::test]
async fn refresh_is_skipped_without_client_configuration() {
    let temp = tempfile::tempdir().unwrap();
    let paths = CredentialPaths::with_dir(temp.path());
    write_token(&paths, &stored_token("stale-token", Some("r1"), -100)).await;

    let auth = Authenticator::new(paths);
    let err = auth.acquire(false).await.unwrap_err();
    assert!(matches!(err, GmailError::NotConfigured));
}

#[tokio::test]
async fn malformed_token_file_counts_as_no_token() {
    let temp = tempfile::tempdir().unwrap();
    let paths = CredentialPaths::with_dir(temp.path());
    paths.ensure_dir().await.unwrap();
    tokio::fs::write(paths.token_file(), "{ not json").await.unwrap();

    let auth = Authenticator::new(paths);
    let err = auth.acquire(false).await.unwrap_err();
    assert!(matches!(err, GmailError::NotConfigured));
}
