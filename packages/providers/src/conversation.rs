use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Turns kept per session
pub const MAX_TURNS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Per-session chat history. Sessions idle longer than the TTL are dropped
/// and the number of live sessions is capped.
#[derive(Clone)]
pub struct ConversationStore {
    sessions: moka::sync::Cache<String, Arc<Vec<ChatMessage>>>,
}

impl std::fmt::Debug for ConversationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationStore")
            .field("sessions", &self.sessions.entry_count())
            .finish()
    }
}

impl ConversationStore {
    pub fn new(max_sessions: u64, idle_ttl: Duration) -> Self {
        let sessions = moka::sync::Cache::builder()
            .max_capacity(max_sessions)
            .time_to_idle(idle_ttl)
            .build();
        Self { sessions }
    }

    pub fn history(&self, session_id: &str) -> Vec<ChatMessage> {
        self.sessions
            .get(session_id)
            .map(|h| h.as_ref().clone())
            .unwrap_or_default()
    }

    pub fn append(&self, session_id: &str, message: ChatMessage) {
        let mut history = self.history(session_id);
        history.push(message);
        if history.len() > MAX_TURNS {
            let excess = history.len() - MAX_TURNS;
            history.drain(..excess);
        }
        self.sessions
            .insert(session_id.to_string(), Arc::new(history));
    }

    pub fn clear(&self, session_id: &str) {
        self.sessions.invalidate(session_id);
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new(10_000, Duration::from_secs(60 * 60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_is_trimmed_to_recent_turns() {
        let store = ConversationStore::default();
        for i in 0..15 {
            store.append("s1", ChatMessage::user(format!("message {i}")));
        }

        let history = store.history("s1");
        assert_eq!(history.len(), MAX_TURNS);
        assert_eq!(history[0].content, "message 5");
        assert_eq!(history[MAX_TURNS - 1].content, "message 14");
    }

    #[test]
    fn test_sessions_are_isolated() {
        let store = ConversationStore::default();
        store.append("a", ChatMessage::user("hello"));
        store.append("b", ChatMessage::assistant("hi"));

        assert_eq!(store.history("a"), vec![ChatMessage::user("hello")]);
        store.clear("a");
        assert!(store.history("a").is_empty());
        assert_eq!(store.history("b").len(), 1);
    }
}
