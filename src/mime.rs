//! Message body/attachment extraction and outgoing MIME construction
//!
//! Gmail delivers message content as a recursively nested part tree with
//! URL-safe base64 payloads, and accepts outgoing mail as a base64-encoded
//! RFC 822 message. Both directions of that conversion live here.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, Engine, GeneralPurpose, GeneralPurposeConfig};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{AttachmentInfo, Message, MessageDetails, MessagePart, OutgoingMail, RawMessage};

/// URL-safe base64 engine that tolerates both padded and unpadded input.
/// Gmail is inconsistent about padding; encoding always pads.
pub const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email regex")
});

/// Validate a single email address
pub fn validate_email(address: &str) -> bool {
    EMAIL_RE.is_match(address.trim())
}

/// Extract the plain text body from a message part tree.
///
/// Preference order:
/// 1. the node's own inline payload, even when children also carry text;
/// 2. the first direct child that is `text/plain` with a payload;
/// 3. the first non-empty result of recursing into the children in order.
///
/// Returns an empty string when the tree holds no decodable body.
pub fn extract_body(part: &MessagePart) -> String {
    if let Some(data) = inline_data(part) {
        return decode_text(data);
    }

    let children = match &part.parts {
        Some(parts) => parts.as_slice(),
        None => return String::new(),
    };

    for child in children {
        if child.mime_type.as_deref() == Some("text/plain") {
            if let Some(data) = inline_data(child) {
                return decode_text(data);
            }
        }
    }

    for child in children {
        let body = extract_body(child);
        if !body.is_empty() {
            return body;
        }
    }

    String::new()
}

/// Collect attachment metadata from the entire part tree.
///
/// Any node with a non-empty filename contributes one descriptor, and is
/// still traversed into afterwards. The output order is pre-order traversal
/// order: parent before children, children in their given order.
pub fn extract_attachments(part: &MessagePart) -> Vec<AttachmentInfo> {
    let mut attachments = Vec::new();
    collect_attachments(part, &mut attachments);
    attachments
}

fn collect_attachments(part: &MessagePart, out: &mut Vec<AttachmentInfo>) {
    if let Some(filename) = part.filename.as_deref().filter(|f| !f.is_empty()) {
        out.push(AttachmentInfo {
            filename: filename.to_string(),
            mime_type: part.mime_type.clone().unwrap_or_default(),
            size: part.body.as_ref().and_then(|b| b.size).unwrap_or(0),
            attachment_id: part.body.as_ref().and_then(|b| b.attachment_id.clone()),
        });
    }
    if let Some(parts) = &part.parts {
        for child in parts {
            collect_attachments(child, out);
        }
    }
}

/// Flatten a fetched message into its derived view.
///
/// Headers are read from the payload; the body is decoded only when
/// requested. The attachment list is always computed so callers can decide
/// whether to surface it.
pub fn extract_message(msg: &Message, include_body: bool) -> MessageDetails {
    let payload = msg.payload.as_ref();
    let header = |name: &str| {
        payload
            .and_then(|p| p.header(name))
            .unwrap_or_default()
            .to_string()
    };

    let subject = payload
        .and_then(|p| p.header("Subject"))
        .unwrap_or("(no subject)")
        .to_string();

    let body = if include_body {
        Some(payload.map(extract_body).unwrap_or_default())
    } else {
        None
    };

    MessageDetails {
        id: msg.id.clone(),
        thread_id: msg.thread_id.clone(),
        from: header("From"),
        to: header("To"),
        subject,
        date: header("Date"),
        snippet: msg.snippet.clone().unwrap_or_default(),
        labels: msg.label_ids.clone().unwrap_or_default(),
        body,
        attachments: payload.map(extract_attachments).unwrap_or_default(),
    }
}

/// Compose an outgoing message into the wire envelope the send and draft
/// endpoints accept.
///
/// To, From, and Subject are always set; Cc, Bcc, In-Reply-To, and
/// References only when non-empty. An HTML body is wrapped as a
/// multipart/alternative container holding a single text/html part.
pub fn build_message(mail: &OutgoingMail) -> RawMessage {
    let mut headers: Vec<(&str, &str)> = vec![
        ("To", mail.to.as_str()),
        ("From", "me"),
        ("Subject", mail.subject.as_str()),
    ];
    if !mail.cc.is_empty() {
        headers.push(("Cc", mail.cc.as_str()));
    }
    if !mail.bcc.is_empty() {
        headers.push(("Bcc", mail.bcc.as_str()));
    }
    if !mail.in_reply_to.is_empty() {
        headers.push(("In-Reply-To", mail.in_reply_to.as_str()));
    }
    if !mail.references.is_empty() {
        headers.push(("References", mail.references.as_str()));
    }
    headers.push(("MIME-Version", "1.0"));

    let mut text = String::new();
    for (name, value) in &headers {
        text.push_str(name);
        text.push_str(": ");
        text.push_str(value);
        text.push_str("\r\n");
    }

    if mail.html {
        let boundary = mime_boundary();
        text.push_str(&format!(
            "Content-Type: multipart/alternative; boundary=\"{boundary}\"\r\n\r\n"
        ));
        text.push_str(&format!("--{boundary}\r\n"));
        text.push_str("Content-Type: text/html; charset=\"utf-8\"\r\n\r\n");
        text.push_str(&mail.body);
        text.push_str(&format!("\r\n--{boundary}--\r\n"));
    } else {
        text.push_str("Content-Type: text/plain; charset=\"utf-8\"\r\n\r\n");
        text.push_str(&mail.body);
    }

    RawMessage {
        raw: URL_SAFE_LENIENT.encode(text.as_bytes()),
        thread_id: mail.thread_id.clone(),
    }
}

fn inline_data(part: &MessagePart) -> Option<&str> {
    part.body
        .as_ref()
        .and_then(|b| b.data.as_deref())
        .filter(|d| !d.is_empty())
}

/// Decode a URL-safe base64 payload as UTF-8 text, replacing invalid
/// sequences rather than failing. Undecodable payloads yield an empty string.
fn decode_text(data: &str) -> String {
    match URL_SAFE_LENIENT.decode(data) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(_) => String::new(),
    }
}

fn mime_boundary() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    format!("=_part_{nanos:x}")
}
