//! Gmail REST API client
//!
//! The remote service is consumed through the narrow [`GmailApi`] trait so
//! command handlers can be exercised against a substitute implementation.
//! [`HttpGmailApi`] is the production implementation: plain REST calls with a
//! bearer token, no retries, remote errors surfaced with the service's own
//! message.

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::error::{GmailError, Result};
use crate::models::{
    AttachmentData, Draft, LabelsResponse, Message, MessageRef, MessagesResponse, RawMessage,
    SendResponse,
};

/// Production Gmail REST endpoint
pub const DEFAULT_BASE_URL: &str = "https://gmail.googleapis.com/gmail/v1";

/// Label info with both identifiers present
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelInfo {
    pub id: String,
    pub name: String,
}

/// Header allow-lists used by metadata fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderSet {
    /// What search listings display
    Display,
    /// What reply derivation needs
    Threading,
}

impl HeaderSet {
    pub fn names(self) -> &'static [&'static str] {
        match self {
            HeaderSet::Display => &["From", "To", "Subject", "Date"],
            HeaderSet::Threading => &["From", "To", "Subject", "Message-ID", "References"],
        }
    }
}

/// Narrow interface over the remote mail service
#[async_trait]
pub trait GmailApi: Send + Sync {
    /// List message references matching a Gmail search query
    async fn list_messages(&self, query: &str, limit: u32) -> Result<Vec<MessageRef>>;

    /// Fetch a message with its full payload tree
    async fn get_message_full(&self, id: &str) -> Result<Message>;

    /// Fetch message metadata restricted to a header allow-list
    async fn get_message_metadata(&self, id: &str, headers: HeaderSet) -> Result<Message>;

    /// Fetch one attachment's payload
    async fn get_attachment(&self, message_id: &str, attachment_id: &str)
        -> Result<AttachmentData>;

    /// Send a composed message
    async fn send_message(&self, raw: &RawMessage) -> Result<SendResponse>;

    /// Create a draft from a composed message
    async fn create_draft(&self, raw: &RawMessage) -> Result<Draft>;

    /// List all labels in the account
    async fn list_labels(&self) -> Result<Vec<LabelInfo>>;
}

/// REST implementation backed by `reqwest`
pub struct HttpGmailApi {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

#[derive(Serialize)]
struct DraftRequest<'a> {
    message: &'a RawMessage,
}

impl HttpGmailApi {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self::with_base_url(access_token, DEFAULT_BASE_URL)
    }

    /// Point the client at a different endpoint (used by tests)
    pub fn with_base_url(access_token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            access_token: access_token.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/users/me/{path}", self.base_url)
    }

    /// Map non-success responses to `ApiError` with the service's message
    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(GmailError::ApiError {
            status: status.as_u16(),
            message: api_error_message(&body),
        })
    }
}

/// Pull the human-readable message out of Gmail's error envelope, falling
/// back to the raw body
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("error")?
                .get("message")?
                .as_str()
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl GmailApi for HttpGmailApi {
    async fn list_messages(&self, query: &str, limit: u32) -> Result<Vec<MessageRef>> {
        debug!("Listing messages: query={query:?} limit={limit}");
        let response = self
            .http
            .get(self.url("messages"))
            .bearer_auth(&self.access_token)
            .query(&[("q", query)])
            .query(&[("maxResults", limit)])
            .send()
            .await?;
        let parsed: MessagesResponse = Self::check(response).await?.json().await?;
        Ok(parsed.messages.unwrap_or_default())
    }

    async fn get_message_full(&self, id: &str) -> Result<Message> {
        let response = self
            .http
            .get(self.url(&format!("messages/{id}")))
            .bearer_auth(&self.access_token)
            .query(&[("format", "full")])
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn get_message_metadata(&self, id: &str, headers: HeaderSet) -> Result<Message> {
        let mut request = self
            .http
            .get(self.url(&format!("messages/{id}")))
            .bearer_auth(&self.access_token)
            .query(&[("format", "metadata")]);
        for header in headers.names() {
            request = request.query(&[("metadataHeaders", header)]);
        }
        let response = request.send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn get_attachment(
        &self,
        message_id: &str,
        attachment_id: &str,
    ) -> Result<AttachmentData> {
        let response = self
            .http
            .get(self.url(&format!("messages/{message_id}/attachments/{attachment_id}")))
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn send_message(&self, raw: &RawMessage) -> Result<SendResponse> {
        let response = self
            .http
            .post(self.url("messages/send"))
            .bearer_auth(&self.access_token)
            .json(raw)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn create_draft(&self, raw: &RawMessage) -> Result<Draft> {
        let response = self
            .http
            .post(self.url("drafts"))
            .bearer_auth(&self.access_token)
            .json(&DraftRequest { message: raw })
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn list_labels(&self) -> Result<Vec<LabelInfo>> {
        let response = self
            .http
            .get(self.url("labels"))
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let parsed: LabelsResponse = Self::check(response).await?.json().await?;

        let labels = parsed
            .labels
            .unwrap_or_default()
            .into_iter()
            .filter_map(|label| match (label.id, label.name) {
                (Some(id), Some(name)) => Some(LabelInfo { id, name }),
                _ => None,
            })
            .collect();
        Ok(labels)
    }
}
