//! Common test utilities and fixtures
#![allow(dead_code)]

use async_trait::async_trait;
use base64::engine::Engine;
use gmail_agent::client::{GmailApi, HeaderSet, LabelInfo};
use gmail_agent::error::Result;
use gmail_agent::mime::URL_SAFE_LENIENT;
use gmail_agent::models::{AttachmentData, Draft, Message, MessageRef, RawMessage, SendResponse};
use mockall::mock;
use serde_json::json;

mock! {
    pub GmailService {}

    #[async_trait]
    impl GmailApi for GmailService {
        async fn list_messages(&self, query: &str, limit: u32) -> Result<Vec<MessageRef>>;
        async fn get_message_full(&self, id: &str) -> Result<Message>;
        async fn get_message_metadata(&self, id: &str, headers: HeaderSet) -> Result<Message>;
        async fn get_attachment(
            &self,
            message_id: &str,
            attachment_id: &str,
        ) -> Result<AttachmentData>;
        async fn send_message(&self, raw: &RawMessage) -> Result<SendResponse>;
        async fn create_draft(&self, raw: &RawMessage) -> Result<Draft>;
        async fn list_labels(&self) -> Result<Vec<LabelInfo>>;
    }
}

/// Decode the wire payload of a composed message back to RFC 822 text
pub fn decode_raw(raw: &RawMessage) -> String {
    String::from_utf8(URL_SAFE_LENIENT.decode(&raw.raw).unwrap()).unwrap()
}

/// Build a metadata-format message with the given headers
pub fn metadata_message(id: &str, thread_id: &str, headers: &[(&str, &str)]) -> Message {
    let headers: Vec<_> = headers
        .iter()
        .map(|(name, value)| json!({"name": name, "value": value}))
        .collect();
    serde_json::from_value(json!({
        "id": id,
        "threadId": thread_id,
        "labelIds": ["INBOX"],
        "snippet": "Email snippet...",
        "payload": {
            "mimeType": "multipart/alternative",
            "headers": headers
        }
    }))
    .unwrap()
}

/// Build a full-format message with a plain text body
pub fn full_text_message(
    id: &str,
    thread_id: &str,
    from: &str,
    subject: &str,
    body: &str,
) -> Message {
    serde_json::from_value(json!({
        "id": id,
        "threadId": thread_id,
        "labelIds": ["INBOX", "UNREAD"],
        "snippet": "Email snippet...",
        "payload": {
            "mimeType": "multipart/alternative",
            "headers": [
                {"name": "From", "value": from},
                {"name": "To", "value": "me@example.com"},
                {"name": "Subject", "value": subject},
                {"name": "Date", "value": "Mon, 1 Jan 2024 10:00:00 -0800"}
            ],
            "parts": [
                {
                    "mimeType": "text/plain",
                    "body": {"data": URL_SAFE_LENIENT.encode(body), "size": body.len()}
                }
            ]
        }
    }))
    .unwrap()
}

/// Build a full-format message carrying one downloadable attachment
pub fn message_with_attachment(id: &str, filename: &str, attachment_id: &str) -> Message {
    serde_json::from_value(json!({
        "id": id,
        "threadId": "thread-1",
        "snippet": "",
        "payload": {
            "mimeType": "multipart/mixed",
            "headers": [
                {"name": "From", "value": "sender@example.com"},
                {"name": "Subject", "value": "With attachment"}
            ],
            "parts": [
                {
                    "mimeType": "text/plain",
                    "body": {"data": URL_SAFE_LENIENT.encode("see attached"), "size": 12}
                },
                {
                    "mimeType": "application/pdf",
                    "filename": filename,
                    "body": {"attachmentId": attachment_id, "size": 1024}
                }
            ]
        }
    }))
    .unwrap()
}

pub fn send_response(id: &str, thread_id: &str) -> SendResponse {
    SendResponse {
        id: id.to_string(),
        thread_id: Some(thread_id.to_string()),
    }
}

pub fn message_ref(id: &str) -> MessageRef {
    serde_json::from_value(json!({"id": id, "threadId": format!("thread_{id}")})).unwrap()
}
