//! Slot ledger endpoints
//!
//! Reservation contention is ordinary traffic: a lost race answers 409 with
//! `ALREADY_RESERVED` and is not reported as a server error.

use crate::error::ApiError;
use crate::state::AppState;
use adslot::model::Slot;
use axum::extract::{Path, State};
use axum::{
    Json, Router,
    routing::{get, post},
};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(open_slot))
        .route("/reclaim", post(reclaim_expired))
        .route("/{slot_id}", get(get_slot))
        .route("/{slot_id}/reserve", post(reserve))
        .route("/{slot_id}/release", post(release))
        .route("/{slot_id}/confirm", post(confirm))
}

#[derive(Debug, Deserialize)]
pub struct OpenSlotInput {
    pub channel_id: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

#[derive(Debug, Deserialize)]
pub struct HolderInput {
    pub holder_id: String,
}

#[derive(Debug, Serialize)]
pub struct ReclaimResponse {
    pub reclaimed: u64,
}

#[tracing::instrument(name = "POST /slots", skip(state))]
pub async fn open_slot(
    State(state): State<AppState>,
    Json(input): Json<OpenSlotInput>,
) -> Result<Json<Slot>, ApiError> {
    let slot = state
        .services
        .ledger
        .open_slot(&input.channel_id, input.date, input.time)
        .await?;
    Ok(Json(slot))
}

#[tracing::instrument(name = "GET /slots/{slot_id}", skip(state))]
pub async fn get_slot(
    State(state): State<AppState>,
    Path(slot_id): Path<String>,
) -> Result<Json<Slot>, ApiError> {
    Ok(Json(state.services.ledger.get(&slot_id).await?))
}

#[tracing::instrument(name = "POST /slots/{slot_id}/reserve", skip(state))]
pub async fn reserve(
    State(state): State<AppState>,
    Path(slot_id): Path<String>,
    Json(input): Json<HolderInput>,
) -> Result<Json<Slot>, ApiError> {
    if input.holder_id.trim().is_empty() {
        return Err(ApiError::bad_request("holder_id must not be empty"));
    }
    let slot = state
        .services
        .ledger
        .reserve(&slot_id, &input.holder_id, state.reservation_ttl)
        .await?;
    Ok(Json(slot))
}

#[tracing::instrument(name = "POST /slots/{slot_id}/release", skip(state))]
pub async fn release(
    State(state): State<AppState>,
    Path(slot_id): Path<String>,
    Json(input): Json<HolderInput>,
) -> Result<Json<Slot>, ApiError> {
    let slot = state
        .services
        .ledger
        .release(&slot_id, &input.holder_id)
        .await?;
    Ok(Json(slot))
}

#[tracing::instrument(name = "POST /slots/{slot_id}/confirm", skip(state))]
pub async fn confirm(
    State(state): State<AppState>,
    Path(slot_id): Path<String>,
    Json(input): Json<HolderInput>,
) -> Result<Json<Slot>, ApiError> {
    let slot = state
        .services
        .ledger
        .confirm(&slot_id, &input.holder_id)
        .await?;
    Ok(Json(slot))
}

#[tracing::instrument(name = "POST /slots/reclaim", skip(state))]
pub async fn reclaim_expired(
    State(state): State<AppState>,
) -> Result<Json<ReclaimResponse>, ApiError> {
    let reclaimed = state.services.ledger.reclaim_expired().await?;
    Ok(Json(ReclaimResponse { reclaimed }))
}
