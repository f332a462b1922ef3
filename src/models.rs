//! Core data structures
//!
//! The `serde` types in the first half mirror the Gmail REST API JSON shapes
//! (messages.list, messages.get, labels.list, attachments.get). Everything the
//! API marks optional stays optional here; higher layers decide what missing
//! fields mean. The second half holds the flattened views this tool actually
//! works with.

use serde::{Deserialize, Serialize};

/// Response of `users/me/messages?q=...`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesResponse {
    pub messages: Option<Vec<MessageRef>>,
    pub next_page_token: Option<String>,
    pub result_size_estimate: Option<u64>,
}

/// A bare message reference from a list call
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    pub id: String,
    pub thread_id: Option<String>,
}

/// A fetched message (metadata or full format)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub thread_id: Option<String>,
    pub label_ids: Option<Vec<String>>,
    pub snippet: Option<String>,
    pub payload: Option<MessagePart>,
}

/// One node of a message's MIME part tree
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    pub mime_type: Option<String>,
    pub filename: Option<String>,
    pub headers: Option<Vec<Header>>,
    pub body: Option<MessagePartBody>,
    pub parts: Option<Vec<MessagePart>>,
}

impl MessagePart {
    /// Look up a header value by name, ignoring case
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.as_ref()?.iter().find_map(|h| {
            let header_name = h.name.as_deref()?;
            if header_name.eq_ignore_ascii_case(name) {
                h.value.as_deref()
            } else {
                None
            }
        })
    }
}

/// Inline body payload of a MIME part
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePartBody {
    pub data: Option<String>,
    pub size: Option<u64>,
    pub attachment_id: Option<String>,
}

/// A single RFC 822 header
#[derive(Debug, Clone, Deserialize)]
pub struct Header {
    pub name: Option<String>,
    pub value: Option<String>,
}

/// Response of `users/me/labels`
#[derive(Debug, Clone, Deserialize)]
pub struct LabelsResponse {
    pub labels: Option<Vec<Label>>,
}

/// A label as returned by the API
#[derive(Debug, Clone, Deserialize)]
pub struct Label {
    pub id: Option<String>,
    pub name: Option<String>,
}

/// Attachment payload from `messages/{id}/attachments/{attachment_id}`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentData {
    pub data: Option<String>,
    pub size: Option<u64>,
}

/// Wire-ready outgoing message envelope for send and draft calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMessage {
    /// URL-safe base64 encoding of the composed RFC 822 message
    pub raw: String,
    /// Present only for replies that must land in an existing thread
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}

/// Response of a send call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResponse {
    pub id: String,
    pub thread_id: Option<String>,
}

/// Response of a draft-creation call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Draft {
    pub id: String,
    pub message: SendResponse,
}

/// Flattened view of a fetched message, recomputed fresh on every fetch
#[derive(Debug, Clone, Serialize)]
pub struct MessageDetails {
    pub id: String,
    pub thread_id: Option<String>,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub date: String,
    pub snippet: String,
    pub labels: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<AttachmentInfo>,
}

/// Metadata for one attachment found in a part tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachmentInfo {
    pub filename: String,
    pub mime_type: String,
    pub size: u64,
    pub attachment_id: Option<String>,
}

/// Threading metadata derived from a message being replied to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyContext {
    /// Resolved reply-to address
    pub to: String,
    /// Subject with a "Re:" prefix applied at most once
    pub subject: String,
    pub thread_id: Option<String>,
    /// Message-ID of the original, empty if the header was absent
    pub message_id: String,
    /// Accumulated References chain, empty if nothing to chain
    pub references: String,
}

/// Inputs for composing an outgoing message
#[derive(Debug, Clone, Default)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
    /// Comma-separated, empty when unset
    pub cc: String,
    /// Comma-separated, empty when unset
    pub bcc: String,
    pub html: bool,
    pub in_reply_to: String,
    pub references: String,
    pub thread_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_message_with_nested_parts() {
        let value = json!({
            "id": "m1",
            "threadId": "t1",
            "labelIds": ["INBOX", "UNREAD"],
            "snippet": "Email snippet...",
            "payload": {
                "mimeType": "multipart/mixed",
                "headers": [
                    {"name": "From", "value": "Alice <alice@example.com>"},
                    {"name": "Subject", "value": "Hello"}
                ],
                "parts": [
                    {
                        "mimeType": "text/plain",
                        "body": {"data": "aGVsbG8=", "size": 5}
                    },
                    {
                        "mimeType": "application/pdf",
                        "filename": "report.pdf",
                        "body": {"attachmentId": "att-1", "size": 12345}
                    }
                ]
            }
        });

        let msg: Message = serde_json::from_value(value).unwrap();
        assert_eq!(msg.id, "m1");
        assert_eq!(msg.thread_id.as_deref(), Some("t1"));

        let payload = msg.payload.unwrap();
        assert_eq!(payload.header("from"), Some("Alice <alice@example.com>"));
        let parts = payload.parts.unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1].filename.as_deref(), Some("report.pdf"));
        assert_eq!(
            parts[1].body.as_ref().unwrap().attachment_id.as_deref(),
            Some("att-1")
        );
    }

    #[test]
    fn test_raw_message_omits_absent_thread_id() {
        let raw = RawMessage {
            raw: "abc".to_string(),
            thread_id: None,
        };
        let json = serde_json::to_value(&raw).unwrap();
        assert!(json.get("threadId").is_none());

        let raw = RawMessage {
            raw: "abc".to_string(),
            thread_id: Some("t9".to_string()),
        };
        let json = serde_json::to_value(&raw).unwrap();
        assert_eq!(json["threadId"], "t9");
    }

    #[test]
    fn test_message_details_serialization_skips_empty() {
        let details = MessageDetails {
            id: "m1".to_string(),
            thread_id: None,
            from: "a@example.com".to_string(),
            to: "b@example.com".to_string(),
            subject: "(no subject)".to_string(),
            date: String::new(),
            snippet: String::new(),
            labels: vec![],
            body: None,
            attachments: vec![],
        };
        let json = serde_json::to_value(&details).unwrap();
        assert!(json.get("body").is_none());
        assert!(json.get("attachments").is_none());
    }
}
