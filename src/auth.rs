//! OAuth2 credential lifecycle for the Gmail API
//!
//! Owns the persisted scope setting and token bundle. `acquire` hands back a
//! ready-to-use token, refreshing or re-running the authorization flow as
//! needed; `set_scope` switches the permission level and invalidates any
//! cached token so the next acquisition is forced through a full flow.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::CredentialPaths;
use crate::error::{GmailError, Result};

/// Redirect target for the manual copy/paste flow. Deliberately points at a
/// port nothing listens on; the operator copies the failed redirect URL.
const MANUAL_REDIRECT_URI: &str = "http://localhost:8080/";

/// Validity buffer so a token is never handed out seconds before expiry
const EXPIRY_BUFFER_SECS: i64 = 60;

/// Permission level requested from the Gmail API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Read-only access to messages and labels
    Readonly,
    /// Read plus modify; required for sending, drafting, and replying
    Modify,
    /// Full mailbox access
    Full,
}

/// Default scope; modify is needed for send/draft/reply support
pub const DEFAULT_SCOPE: Scope = Scope::Modify;

impl Scope {
    pub const ALL: [Scope; 3] = [Scope::Readonly, Scope::Modify, Scope::Full];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Readonly => "readonly",
            Scope::Modify => "modify",
            Scope::Full => "full",
        }
    }

    /// Gmail scope URLs requested for this permission level
    pub fn scope_urls(&self) -> &'static [&'static str] {
        match self {
            Scope::Readonly => &["https://www.googleapis.com/auth/gmail.readonly"],
            Scope::Modify => &[
                "https://www.googleapis.com/auth/gmail.readonly",
                "https://www.googleapis.com/auth/gmail.modify",
            ],
            Scope::Full => &["https://mail.google.com/"],
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = GmailError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "readonly" => Ok(Scope::Readonly),
            "modify" => Ok(Scope::Modify),
            "full" => Ok(Scope::Full),
            other => Err(GmailError::InvalidScope(other.to_string())),
        }
    }
}

/// Persisted token bundle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl StoredToken {
    /// True when the token can be used as-is. Tokens without an expiry are
    /// treated as valid; expiry is checked with a 60 second buffer.
    pub fn is_valid(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() + Duration::seconds(EXPIRY_BUFFER_SECS) < expires_at,
            None => true,
        }
    }

    fn from_response(response: TokenResponse, scopes: &[&str]) -> Self {
        let expires_at = response
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(secs as i64));
        StoredToken {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_at,
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Token endpoint response body
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// OAuth2 client secret in Google's "installed app" JSON format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSecret {
    pub installed: InstalledApp,
}

/// Installed application credentials (desktop/CLI app)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstalledApp {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

fn default_auth_uri() -> String {
    "https://accounts.google.com/o/oauth2/auth".to_string()
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// Credential manager owning the scope setting and the persisted token
pub struct Authenticator {
    paths: CredentialPaths,
    http: reqwest::Client,
}

impl Authenticator {
    pub fn new(paths: CredentialPaths) -> Self {
        Self {
            paths,
            http: reqwest::Client::new(),
        }
    }

    pub fn paths(&self) -> &CredentialPaths {
        &self.paths
    }

    /// Currently configured scope, falling back to the default when the
    /// marker file is absent or unreadable
    pub async fn current_scope(&self) -> Scope {
        match tokio::fs::read_to_string(self.paths.scope_file()).await {
            Ok(contents) => contents.parse().unwrap_or(DEFAULT_SCOPE),
            Err(_) => DEFAULT_SCOPE,
        }
    }

    /// Persist a new scope and delete any cached token so the next
    /// acquisition runs a full authorization flow with the new permissions
    pub async fn set_scope(&self, scope: Scope) -> Result<()> {
        self.paths.ensure_dir().await?;
        tokio::fs::write(self.paths.scope_file(), scope.as_str()).await?;

        let token_file = self.paths.token_file();
        if token_file.exists() {
            tokio::fs::remove_file(&token_file).await?;
            info!("Cleared cached token after scope change");
        }
        Ok(())
    }

    /// Delete any cached token so the next acquisition runs a full flow
    pub async fn force_reauth(&self) -> Result<()> {
        let token_file = self.paths.token_file();
        if token_file.exists() {
            tokio::fs::remove_file(&token_file).await?;
        }
        Ok(())
    }

    /// True when a client secret file is present
    pub fn is_configured(&self) -> bool {
        self.paths.client_secret_file().exists()
    }

    /// Produce a usable token, in order of preference: the cached token
    /// unchanged, the cached token refreshed in place, or a token minted by
    /// a full authorization flow (local listener, or manual copy/paste when
    /// `manual` is set).
    pub async fn acquire(&self, manual: bool) -> Result<StoredToken> {
        let scope = self.current_scope().await;
        let scopes = scope.scope_urls();

        if let Some(token) = self.load_token().await {
            if token.is_valid() {
                debug!("Using cached token");
                return Ok(token);
            }
            if let Some(refresh_token) = token.refresh_token.as_deref() {
                if let Ok(secret) = self.load_client_secret().await {
                    match self.refresh_exchange(&secret.installed, refresh_token, scopes).await {
                        Ok(refreshed) => {
                            self.persist_token(&refreshed).await?;
                            info!("Refreshed access token");
                            return Ok(refreshed);
                        }
                        Err(e) => {
                            warn!("Token refresh failed: {e}; falling back to full authorization");
                        }
                    }
                }
            }
        }

        let secret = self.load_client_secret().await?;
        let token = if manual {
            self.manual_flow(&secret.installed, scopes).await?
        } else {
            self.local_server_flow(&secret.installed, scopes).await?
        };
        self.persist_token(&token).await?;
        Ok(token)
    }

    /// Load the persisted token; absent or malformed files count as no token
    pub async fn load_token(&self) -> Option<StoredToken> {
        let raw = tokio::fs::read_to_string(self.paths.token_file()).await.ok()?;
        serde_json::from_str(&raw).ok()
    }

    /// Read the OAuth2 client secret file
    pub async fn load_client_secret(&self) -> Result<ClientSecret> {
        let raw = tokio::fs::read_to_string(self.paths.client_secret_file())
            .await
            .map_err(|_| GmailError::NotConfigured)?;
        Ok(serde_json::from_str(&raw)?)
    }

    async fn persist_token(&self, token: &StoredToken) -> Result<()> {
        self.paths.ensure_dir().await?;
        let path = self.paths.token_file();
        tokio::fs::write(&path, serde_json::to_string_pretty(token)?).await?;
        secure_token_file(&path).await?;
        Ok(())
    }

    /// Full flow with an ephemeral local listener capturing the redirect
    async fn local_server_flow(
        &self,
        secret: &InstalledApp,
        scopes: &[&str],
    ) -> Result<StoredToken> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        let redirect_uri = format!("http://localhost:{port}/");
        let auth_url = authorization_url(secret, scopes, &redirect_uri)?;

        println!("Opening your browser for Google authorization...");
        println!("If it does not open, visit this URL:\n\n{auth_url}\n");
        if let Err(e) = open::that(auth_url.as_str()) {
            warn!("Could not open browser: {e}");
        }

        info!("Waiting for authorization callback on port {port}");
        let code = wait_for_callback(listener).await?;
        self.exchange_code(secret, &code, &redirect_uri, scopes).await
    }

    /// Full flow for headless environments: the operator completes consent
    /// in any browser and pastes the resulting redirect URL back here
    async fn manual_flow(&self, secret: &InstalledApp, scopes: &[&str]) -> Result<StoredToken> {
        let auth_url = authorization_url(secret, scopes, MANUAL_REDIRECT_URI)?;
        print_manual_instructions(&auth_url);

        let redirect_url = read_operator_line()?;
        if redirect_url.is_empty() {
            return Err(GmailError::AuthFailed("no redirect URL provided".to_string()));
        }
        let code = extract_authorization_code(&redirect_url).ok_or_else(|| {
            GmailError::AuthFailed(
                "redirect URL does not contain an authorization code; \
                 copy the full URL from the address bar after clicking Allow"
                    .to_string(),
            )
        })?;

        self.exchange_code(secret, &code, MANUAL_REDIRECT_URI, scopes).await
    }

    /// Exchange an authorization code for tokens
    async fn exchange_code(
        &self,
        secret: &InstalledApp,
        code: &str,
        redirect_uri: &str,
        scopes: &[&str],
    ) -> Result<StoredToken> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", secret.client_id.as_str()),
            ("client_secret", secret.client_secret.as_str()),
            ("redirect_uri", redirect_uri),
        ];

        let response = self.http.post(&secret.token_uri).form(&params).send().await?;
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GmailError::AuthFailed(format!(
                "token exchange rejected: {}",
                body.trim()
            )));
        }

        let parsed: TokenResponse = response.json().await?;
        Ok(StoredToken::from_response(parsed, scopes))
    }

    /// Refresh exchange against the token endpoint. The refresh token is
    /// carried forward when the response omits one.
    async fn refresh_exchange(
        &self,
        secret: &InstalledApp,
        refresh_token: &str,
        scopes: &[&str],
    ) -> Result<StoredToken> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", secret.client_id.as_str()),
            ("client_secret", secret.client_secret.as_str()),
        ];

        let response = self.http.post(&secret.token_uri).form(&params).send().await?;
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GmailError::AuthFailed(format!(
                "token refresh rejected: {}",
                body.trim()
            )));
        }

        let parsed: TokenResponse = response.json().await?;
        let mut token = StoredToken::from_response(parsed, scopes);
        if token.refresh_token.is_none() {
            token.refresh_token = Some(refresh_token.to_string());
        }
        Ok(token)
    }
}

/// Build the consent URL. `access_type=offline` and `prompt=consent` make
/// Google return a refresh token on every full authorization.
fn authorization_url(secret: &InstalledApp, scopes: &[&str], redirect_uri: &str) -> Result<Url> {
    let mut url = Url::parse(&secret.auth_uri)
        .map_err(|e| GmailError::AuthFailed(format!("invalid auth_uri: {e}")))?;
    url.query_pairs_mut()
        .append_pair("client_id", &secret.client_id)
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("response_type", "code")
        .append_pair("scope", &scopes.join(" "))
        .append_pair("access_type", "offline")
        .append_pair("prompt", "consent");
    Ok(url)
}

/// Accept exactly one redirect callback and pull the authorization code out
/// of the request line
async fn wait_for_callback(listener: TcpListener) -> Result<String> {
    let (stream, _) = listener.accept().await?;
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;

    let code = callback_param(&request_line, "code");
    let error = callback_param(&request_line, "error");

    let (status, body) = if code.is_some() {
        ("200 OK", "Authorization complete. You can close this window.")
    } else {
        ("400 Bad Request", "Authorization failed. Please try again.")
    };
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n\
         <html><body><h1>{body}</h1></body></html>"
    );
    let mut stream = reader.into_inner();
    let _ = stream.write_all(response.as_bytes()).await;

    if let Some(error) = error {
        return Err(GmailError::AuthFailed(format!("consent denied: {error}")));
    }
    code.ok_or_else(|| GmailError::AuthFailed("no authorization code in callback".to_string()))
}

/// Extract a query parameter from an HTTP request line
/// (`GET /?code=...&scope=... HTTP/1.1`)
fn callback_param(request_line: &str, name: &str) -> Option<String> {
    let path = request_line.split_whitespace().nth(1)?;
    let query = path.split('?').nth(1)?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// Pull the authorization code out of a pasted redirect URL
fn extract_authorization_code(redirect_url: &str) -> Option<String> {
    let url = Url::parse(redirect_url).ok()?;
    url.query_pairs()
        .find(|(key, value)| key == "code" && !value.is_empty())
        .map(|(_, value)| value.into_owned())
}

/// Blocking read of one trimmed line from the operator. EOF reads as empty,
/// which the caller treats as an abort.
fn read_operator_line() -> Result<String> {
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn print_manual_instructions(auth_url: &Url) {
    let divider = "=".repeat(70);
    println!("\n{divider}");
    println!("MANUAL AUTHENTICATION FOR HEADLESS MACHINES");
    println!("{divider}");
    println!("\nNo local listener is used; you will copy the redirect URL by hand.\n");

    println!("STEP 1: Open this URL in any browser:");
    println!("\n{auth_url}\n");

    println!("STEP 2: Complete the Google consent flow and click Allow.");

    println!("\nSTEP 3: Your browser will try to load {MANUAL_REDIRECT_URI} and fail");
    println!("with a connection error. That is expected; do not close the tab.");

    println!("\nSTEP 4: Copy the FULL URL from the address bar, for example:");
    println!("http://localhost:8080/?state=...&code=4/0...");
    println!();
    print!("Paste the full URL here: ");
    use std::io::Write;
    let _ = std::io::stdout().flush();
}

/// Restrict the token file to the owning user
#[cfg(unix)]
async fn secure_token_file(path: &std::path::Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = tokio::fs::metadata(path).await?.permissions();
    perms.set_mode(0o600);
    tokio::fs::set_permissions(path, perms).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn secure_token_file(_path: &std::path::Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CredentialPaths;

    fn installed_app() -> InstalledApp {
        InstalledApp {
            client_id: "test-client-id".to_string(),
            client_secret: "test-secret".to_string(),
            auth_uri: default_auth_uri(),
            token_uri: default_token_uri(),
            redirect_uris: vec!["http://localhost".to_string()],
        }
    }

    #[test]
    fn test_scope_round_trip() {
        for scope in Scope::ALL {
            assert_eq!(scope.as_str().parse::<Scope>().unwrap(), scope);
        }
    }

    #[test]
    fn test_scope_rejects_unknown_value() {
        let err = "admin".parse::<Scope>().unwrap_err();
        assert!(matches!(err, GmailError::InvalidScope(s) if s == "admin"));
    }

    #[test]
    fn test_scope_urls() {
        assert_eq!(Scope::Readonly.scope_urls().len(), 1);
        assert_eq!(Scope::Modify.scope_urls().len(), 2);
        assert_eq!(Scope::Full.scope_urls(), &["https://mail.google.com/"]);
        assert!(Scope::Modify
            .scope_urls()
            .contains(&"https://www.googleapis.com/auth/gmail.modify"));
    }

    #[test]
    fn test_stored_token_validity_buffer() {
        let expired = StoredToken {
            access_token: "a".to_string(),
            refresh_token: None,
            expires_at: Some(Utc::now() + Duration::seconds(30)),
            scopes: vec![],
        };
        // Expires inside the 60 second buffer, so already unusable.
        assert!(!expired.is_valid());

        let valid = StoredToken {
            access_token: "a".to_string(),
            refresh_token: None,
            expires_at: Some(Utc::now() + Duration::seconds(3600)),
            scopes: vec![],
        };
        assert!(valid.is_valid());

        let no_expiry = StoredToken {
            access_token: "a".to_string(),
            refresh_token: None,
            expires_at: None,
            scopes: vec![],
        };
        assert!(no_expiry.is_valid());
    }

    #[test]
    fn test_authorization_url_contents() {
        let url = authorization_url(
            &installed_app(),
            Scope::Modify.scope_urls(),
            "http://localhost:9999/",
        )
        .unwrap();
        let url = url.as_str();

        assert!(url.starts_with("https://accounts.google.com/o/oauth2/auth?"));
        assert!(url.contains("client_id=test-client-id"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("prompt=consent"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A9999%2F"));
        assert!(url.contains("gmail.modify"));
    }

    #[test]
    fn test_callback_param_parsing() {
        let line = "GET /?state=xyz&code=4%2F0abc&scope=email HTTP/1.1\r\n";
        assert_eq!(callback_param(line, "code").as_deref(), Some("4/0abc"));
        assert_eq!(callback_param(line, "state").as_deref(), Some("xyz"));
        assert!(callback_param(line, "error").is_none());

        let line = "GET / HTTP/1.1\r\n";
        assert!(callback_param(line, "code").is_none());
    }

    #[test]
    fn test_extract_authorization_code() {
        let url = "http://localhost:8080/?state=s&code=4%2F0AX4XfWh&scope=email";
        assert_eq!(
            extract_authorization_code(url).as_deref(),
            Some("4/0AX4XfWh")
        );

        assert!(extract_authorization_code("http://localhost:8080/?state=s").is_none());
        assert!(extract_authorization_code("not a url").is_none());
        assert!(extract_authorization_code("http://localhost:8080/?code=").is_none());
    }

    #[test]
    fn test_client_secret_parsing_with_defaults() {
        let json = r#"{
            "installed": {
                "client_id": "id",
                "client_secret": "secret",
                "redirect_uris": ["http://localhost"]
            }
        }"#;
        let secret: ClientSecret = serde_json::from_str(json).unwrap();
        assert_eq!(secret.installed.client_id, "id");
        assert_eq!(secret.installed.auth_uri, default_auth_uri());
        assert_eq!(secret.installed.token_uri, default_token_uri());
    }

    #[tokio::test]
    async fn test_current_scope_defaults_to_modify() {
        let temp = tempfile::tempdir().unwrap();
        let auth = Authenticator::new(CredentialPaths::with_dir(temp.path()));
        assert_eq!(auth.current_scope().await, Scope::Modify);
    }

    #[tokio::test]
    async fn test_set_scope_persists_and_clears_token() {
        let temp = tempfile::tempdir().unwrap();
        let paths = CredentialPaths::with_dir(temp.path());
        let auth = Authenticator::new(paths.clone());

        tokio::fs::create_dir_all(paths.dir()).await.unwrap();
        tokio::fs::write(paths.token_file(), "{}").await.unwrap();

        auth.set_scope(Scope::Readonly).await.unwrap();
        assert_eq!(auth.current_scope().await, Scope::Readonly);
        assert!(!paths.token_file().exists());
    }

    #[tokio::test]
    async fn test_load_token_treats_malformed_as_absent() {
        let temp = tempfile::tempdir().unwrap();
        let paths = CredentialPaths::with_dir(temp.path());
        let auth = Authenticator::new(paths.clone());

        assert!(auth.load_token().await.is_none());

        tokio::fs::create_dir_all(paths.dir()).await.unwrap();
        tokio::fs::write(paths.token_file(), "not json").await.unwrap();
        assert!(auth.load_token().await.is_none());
    }

    #[tokio::test]
    async fn test_acquire_without_client_secret_is_not_configured() {
        let temp = tempfile::tempdir().unwrap();
        let auth = Authenticator::new(CredentialPaths::with_dir(temp.path()));
        let err = auth.acquire(true).await.unwrap_err();
        assert!(matches!(err, GmailError::NotConfigured));
    }
}
