//! Conversation model - ordered chat messages plus title and creation time

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// Title the store replaces with a timestamped label.
pub const DEFAULT_TITLE: &str = "Conversation";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    /// Older saved conversations used the key `message`.
    #[serde(alias = "message")]
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub messages: Vec<Message>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            title: None,
            created_at: Utc::now(),
            messages: Vec::new(),
        }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }
}

/// Resolve the title to persist: a missing or default title becomes
/// `Conversation on YYYY-MM-DD HH:MM:SS` (local time).
pub fn resolve_title(title: Option<&str>) -> String {
    match title.map(str::trim) {
        Some(t) if !t.is_empty() && t != DEFAULT_TITLE => t.to_string(),
        _ => format!("{} on {}", DEFAULT_TITLE, Local::now().format("%Y-%m-%d %H:%M:%S")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_serialization() {
        let json = serde_json::to_string(&Message::user("How many entities?")).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"How many entities?"}"#);
    }

    #[test]
    fn test_legacy_message_key_is_accepted() {
        let messages: Vec<Message> = serde_json::from_str(
            r#"[{"role":"user","message":"hi"},{"role":"assistant","content":"hello"}]"#,
        )
        .unwrap();
        assert_eq!(messages, vec![Message::user("hi"), Message::assistant("hello")]);
    }

    #[test]
    fn test_resolve_title() {
        assert_eq!(resolve_title(Some("Lease review")), "Lease review");
        for title in [None, Some("Conversation"), Some("   ")] {
            let resolved = resolve_title(title);
            assert!(resolved.starts_with("Conversation on "), "{}", resolved);
            // "Conversation on " + "YYYY-MM-DD HH:MM:SS"
            assert_eq!(resolved.len(), "Conversation on ".len() + 19);
        }
    }
}
