//! Gmail Agent CLI
//!
//! A one-shot command-line client for Gmail: authenticate, search, read,
//! send, reply, create drafts, and download attachments, then exit.
//!
//! # Overview
//!
//! Two subsystems carry the interesting state:
//! - **Credential manager** ([`auth`]): owns the persisted scope setting and
//!   token bundle, refreshes expired tokens in place, and runs the full
//!   OAuth2 authorization flow (local listener or manual copy/paste) when
//!   nothing usable is cached.
//! - **Message codec** ([`mime`], [`reply`]): walks Gmail's nested part
//!   trees to pull out bodies and attachments, composes outgoing messages
//!   into the base64 wire envelope, and derives reply-threading headers.
//!
//! Everything else is a thin mapping from a CLI flag to one Gmail REST call
//! and a print statement.
//!
//! # Example Usage
//!
//! ```no_run
//! use gmail_agent::auth::Authenticator;
//! use gmail_agent::client::{GmailApi, HttpGmailApi};
//! use gmail_agent::config::CredentialPaths;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let auth = Authenticator::new(CredentialPaths::new()?);
//!     let token = auth.acquire(false).await?;
//!
//!     let api = HttpGmailApi::new(token.access_token);
//!     let labels = api.list_labels().await?;
//!     println!("{} labels", labels.len());
//!     Ok(())
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`auth`] - OAuth2 credential lifecycle (scope, token, flows)
//! - [`attachments`] - Attachment decoding and collision-free file naming
//! - [`cli`] - Command-line surface and command handlers
//! - [`client`] - Narrow Gmail REST API interface and implementation
//! - [`config`] - Locations of persisted credential state
//! - [`error`] - Error types and result alias
//! - [`mime`] - Part-tree extraction and outgoing message construction
//! - [`models`] - Wire and derived data structures
//! - [`output`] - Markdown and JSON rendering
//! - [`query`] - Gmail search query assembly
//! - [`reply`] - Reply-threading derivation

pub mod attachments;
pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod mime;
pub mod models;
pub mod output;
pub mod query;
pub mod reply;

// Re-export commonly used types for convenience
pub use error::{GmailError, Result};

// Core data models
pub use models::{
    AttachmentInfo, Message, MessageDetails, MessagePart, OutgoingMail, RawMessage, ReplyContext,
};

// Credential manager
pub use auth::{Authenticator, Scope, StoredToken};

// Client trait and implementation
pub use client::{GmailApi, HeaderSet, HttpGmailApi, LabelInfo};

// Codec entry points
pub use mime::{build_message, extract_attachments, extract_body, extract_message};
pub use reply::derive_reply_context;

// Search query assembly
pub use query::SearchFilters;

// CLI types (for binary usage)
pub use cli::{Cli, Commands};
