//! Human-readable and JSON rendering
//!
//! Default output is Markdown meant for a terminal; every command also
//! supports a JSON toggle that serializes the same data verbatim.

use serde::Serialize;

use crate::client::LabelInfo;
use crate::error::Result;
use crate::models::MessageDetails;

/// Pretty-printed JSON for `--json` output
pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Render search results as Markdown
pub fn messages_markdown(messages: &[MessageDetails], full_body: bool) -> String {
    if messages.is_empty() {
        return "No messages found.".to_string();
    }

    let mut lines = vec![format!("# Gmail Search Results ({} messages)\n", messages.len())];

    for msg in messages {
        lines.push(format!("## {}", msg.subject));
        lines.push(format!("**From:** {}", msg.from));
        lines.push(format!("**To:** {}", msg.to));
        lines.push(format!("**Date:** {}", msg.date));
        lines.push(format!("**ID:** `{}`", msg.id));

        if !msg.labels.is_empty() {
            lines.push(format!("**Labels:** {}", msg.labels.join(", ")));
        }
        if !msg.attachments.is_empty() {
            let names: Vec<&str> = msg.attachments.iter().map(|a| a.filename.as_str()).collect();
            lines.push(format!("**Attachments:** {}", names.join(", ")));
        }

        lines.push(String::new());

        match (&msg.body, full_body) {
            (Some(body), true) => {
                lines.push("### Body".to_string());
                lines.push(body.clone());
            }
            _ => lines.push(format!("> {}", msg.snippet)),
        }

        lines.push("\n---\n".to_string());
    }

    lines.join("\n")
}

/// Render the label list as Markdown, sorted by name
pub fn labels_markdown(labels: &[LabelInfo]) -> String {
    let mut sorted: Vec<&LabelInfo> = labels.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));

    let mut lines = vec!["# Gmail Labels\n".to_string()];
    for label in sorted {
        lines.push(format!("- {} (`{}`)", label.name, label.id));
    }
    lines.join("\n")
}
