//! Gmail search query assembly
//!
//! Filter flags are concatenated into Gmail's own search grammar
//! (`from:`, `after:`, `has:attachment`, ...). The grammar itself is
//! passed through verbatim; nothing here validates or parses it.

/// Structured search filters collected from the command line
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub query: String,
    pub from: Option<String>,
    pub to: Option<String>,
    pub subject: Option<String>,
    pub label: Option<String>,
    pub after: Option<String>,
    pub before: Option<String>,
    pub has_attachment: bool,
    pub unread: bool,
    pub starred: bool,
}

impl SearchFilters {
    /// Build the Gmail search string from free text plus recognized filters
    pub fn build(&self) -> String {
        let mut parts: Vec<String> = Vec::new();

        if !self.query.is_empty() {
            parts.push(self.query.clone());
        }
        if let Some(from) = non_empty(&self.from) {
            parts.push(format!("from:{from}"));
        }
        if let Some(to) = non_empty(&self.to) {
            parts.push(format!("to:{to}"));
        }
        if let Some(subject) = non_empty(&self.subject) {
            parts.push(format!("subject:{subject}"));
        }
        if let Some(label) = non_empty(&self.label) {
            parts.push(format!("label:{label}"));
        }
        if let Some(after) = non_empty(&self.after) {
            parts.push(format!("after:{after}"));
        }
        if let Some(before) = non_empty(&self.before) {
            parts.push(format!("before:{before}"));
        }
        if self.has_attachment {
            parts.push("has:attachment".to_string());
        }
        if self.unread {
            parts.push("is:unread".to_string());
        }
        if self.starred {
            parts.push("is:starred".to_string());
        }

        parts.join(" ")
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
