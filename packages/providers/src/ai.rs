//! Sales assistant backed by an OpenAI-compatible chat completion endpoint

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ProviderError;
use crate::conversation::{ChatMessage, ChatRole, ConversationStore, MAX_TURNS};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MODEL: &str = "gpt-4o-mini";

pub const FALLBACK_REPLY: &str =
    "The assistant is unavailable right now. A manager will get back to you shortly.";

const SYSTEM_PROMPT: &str = "You help advertisers book placements in messaging channels. \
Answer briefly, quote prices in whole currency units and never promise a slot \
that has not been reserved.";

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, Clone)]
pub struct AiClient {
    endpoint: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
    conversations: ConversationStore,
}

impl AiClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        conversations: ConversationStore,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            client,
            conversations,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Reads `OPENAI_ENDPOINT`, `OPENAI_API_KEY` and optionally `OPENAI_MODEL`
    pub fn from_env(conversations: ConversationStore) -> Option<Self> {
        let endpoint = std::env::var("OPENAI_ENDPOINT").ok()?;
        let key = std::env::var("OPENAI_API_KEY").ok()?;
        let client = Self::new(endpoint, key, conversations);
        Some(match std::env::var("OPENAI_MODEL") {
            Ok(model) => client.with_model(model),
            Err(_) => client,
        })
    }

    pub fn conversations(&self) -> &ConversationStore {
        &self.conversations
    }

    /// Answers `message` in the context of the session's recent turns.
    /// Provider failures yield [`FALLBACK_REPLY`] and leave the history as is.
    #[tracing::instrument(name = "ai.reply", skip(self, message))]
    pub async fn reply(&self, session_id: &str, message: &str) -> String {
        let mut turns = self.conversations.history(session_id);
        turns.push(ChatMessage::user(message));
        if turns.len() > MAX_TURNS {
            let excess = turns.len() - MAX_TURNS;
            turns.drain(..excess);
        }

        match self.complete(turns).await {
            Ok(answer) => {
                self.conversations
                    .append(session_id, ChatMessage::user(message));
                self.conversations
                    .append(session_id, ChatMessage::assistant(answer.clone()));
                answer
            }
            Err(e) => {
                tracing::warn!(session_id, error = %e, "Assistant request failed");
                FALLBACK_REPLY.to_string()
            }
        }
    }

    async fn complete(&self, turns: Vec<ChatMessage>) -> Result<String, ProviderError> {
        let mut messages = Vec::with_capacity(turns.len() + 1);
        messages.push(ChatMessage {
            role: ChatRole::System,
            content: SYSTEM_PROMPT.to_string(),
        });
        messages.extend(turns);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .bearer_auth(&self.api_key)
            .json(&CompletionRequest {
                model: &self.model,
                messages,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProviderError::Response {
                status: status.as_u16(),
                message,
            });
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;
        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::Parse("completion without choices".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::{Json, Router, routing::post};
    use serde_json::{Value, json};

    async fn completions(Json(body): Json<Value>) -> axum::response::Response {
        let messages = body["messages"].as_array().cloned().unwrap_or_default();
        let last = messages
            .last()
            .and_then(|m| m["content"].as_str())
            .unwrap_or_default()
            .to_string();
        if last == "fail" {
            return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
        }
        Json(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": format!("{} turns, last: {}", messages.len(), last)
                }
            }]
        }))
        .into_response()
    }

    async fn serve() -> String {
        let app = Router::new().route("/chat/completions", post(completions));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_reply_carries_history() {
        let ai = AiClient::new(serve().await, "key", ConversationStore::default());

        assert_eq!(ai.reply("s", "price?").await, "2 turns, last: price?");
        // system + user + assistant + user
        assert_eq!(ai.reply("s", "and native?").await, "4 turns, last: and native?");
        assert_eq!(ai.conversations().history("s").len(), 4);
    }

    #[tokio::test]
    async fn test_failure_degrades_to_fallback() {
        let ai = AiClient::new(serve().await, "key", ConversationStore::default());

        assert_eq!(ai.reply("s", "fail").await, FALLBACK_REPLY);
        assert!(ai.conversations().history("s").is_empty());
    }
}
