use crate::error::ApiError;
use crate::state::AppState;
use adslot::model::Client;
use axum::extract::{Path, State};
use axum::{
    Json, Router,
    routing::{get, post},
};
use serde::Deserialize;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_client))
        .route("/{client_id}", get(get_client))
}

#[derive(Debug, Deserialize)]
pub struct CreateClientInput {
    pub telegram_id: i64,
    pub name: String,
}

#[tracing::instrument(name = "POST /clients", skip(state, input))]
pub async fn create_client(
    State(state): State<AppState>,
    Json(input): Json<CreateClientInput>,
) -> Result<Json<Client>, ApiError> {
    let client = state
        .services
        .directory
        .register_client(input.telegram_id, &input.name)
        .await?;
    Ok(Json(client))
}

#[tracing::instrument(name = "GET /clients/{client_id}", skip(state))]
pub async fn get_client(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
) -> Result<Json<Client>, ApiError> {
    Ok(Json(state.services.directory.client(&client_id).await?))
}
