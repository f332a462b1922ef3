//! Reply-threading derivation
//!
//! Builds the addressing and threading metadata a reply needs from the
//! headers of the message being answered.

use crate::models::{Message, ReplyContext};

/// Derive reply addressing and threading metadata from an original message.
///
/// The reply-to address is the angle-bracketed part of the From header when
/// present, otherwise the raw From value. The subject gains a "Re: " prefix
/// at most once. The References chain is the original's References followed
/// by its Message-ID, space-joined.
pub fn derive_reply_context(original: &Message) -> ReplyContext {
    let header = |name: &str| {
        original
            .payload
            .as_ref()
            .and_then(|p| p.header(name))
            .unwrap_or_default()
    };

    let from = header("From");
    let to = bracketed_address(from).unwrap_or(from).to_string();

    let original_subject = original
        .payload
        .as_ref()
        .and_then(|p| p.header("Subject"))
        .unwrap_or("(no subject)");
    let subject = if original_subject.to_lowercase().starts_with("re:") {
        original_subject.to_string()
    } else {
        format!("Re: {original_subject}")
    };

    let message_id = header("Message-ID").to_string();
    let prior_references = header("References");
    let references = if !prior_references.is_empty() && !message_id.is_empty() {
        format!("{prior_references} {message_id}")
    } else if !message_id.is_empty() {
        message_id.clone()
    } else {
        String::new()
    };

    ReplyContext {
        to,
        subject,
        thread_id: original.thread_id.clone(),
        message_id,
        references,
    }
}

/// Extract the address from a "Display Name <address>" header value
fn bracketed_address(header: &str) -> Option<&str> {
    let start = header.find('<')?;
    let rest = &header[start + 1..];
    let end = rest.find('>')?;
    Some(rest[..end].trim())
}
