//! Outbound integrations: channel analytics, the AI assistant and its
//! per-session conversation memory.

pub mod ai;
pub mod analytics;
pub mod conversation;

pub use ai::AiClient;
pub use analytics::{AnalyticsClient, ChannelStats};
pub use conversation::{ChatMessage, ChatRole, ConversationStore};

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Provider responded with {status}: {message}")]
    Response { status: u16, message: String },

    #[error("Failed to parse provider response: {0}")]
    Parse(String),
}
