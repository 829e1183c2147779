use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Json, Router, routing::post};
use serde::{Deserialize, Serialize};

pub fn routes() -> Router<AppState> {
    Router::new().route("/{session_id}", post(ask).delete(reset))
}

#[derive(Debug, Deserialize)]
pub struct AskInput {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub reply: String,
}

#[tracing::instrument(name = "POST /assistant/{session_id}", skip(state, input))]
pub async fn ask(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(input): Json<AskInput>,
) -> Result<Json<AskResponse>, ApiError> {
    let assistant = state
        .assistant
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Assistant not configured"))?;
    if input.message.trim().is_empty() {
        return Err(ApiError::bad_request("Message must not be empty"));
    }
    let reply = assistant.reply(&session_id, &input.message).await;
    Ok(Json(AskResponse { reply }))
}

#[tracing::instrument(name = "DELETE /assistant/{session_id}", skip(state))]
pub async fn reset(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if let Some(assistant) = state.assistant.as_ref() {
        assistant.conversations().clear(&session_id);
    }
    Ok(StatusCode::NO_CONTENT)
}
