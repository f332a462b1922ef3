use thiserror::Error;

/// Type alias for Result with GmailError
pub type Result<T> = std::result::Result<T, GmailError>;

/// Error types for the Gmail agent
#[derive(Error, Debug)]
pub enum GmailError {
    /// No OAuth2 client secret file present; the operator must complete setup
    #[error("Gmail API not configured. Run 'setup' for instructions.")]
    NotConfigured,

    /// Interactive or manual authorization failed or was aborted
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// Requested scope is not one of the enumerated values
    #[error("Invalid scope: {0}. Choose from: readonly, modify, full")]
    InvalidScope(String),

    /// Malformed email address supplied to send/draft/reply
    #[error("Invalid email address: {0}")]
    InvalidRecipient(String),

    /// Gmail API rejected or failed the call
    #[error("Gmail API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// Invalid message payload or encoding
    #[error("Invalid message format: {0}")]
    InvalidFormat(String),

    /// Network-related error reaching Gmail or the token endpoint
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (file operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GmailError {
    /// Check whether the error calls for the operator to run `auth` again
    pub fn needs_auth(&self) -> bool {
        matches!(self, GmailError::NotConfigured | GmailError::AuthFailed(_))
    }
}
