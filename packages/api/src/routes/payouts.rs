use crate::error::ApiError;
use crate::state::AppState;
use adslot::model::ManagerPayout;
use axum::extract::{Path, State};
use axum::{
    Json, Router,
    routing::{get, post},
};
use serde::Deserialize;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(request_payout))
        .route("/{payout_id}", get(get_payout))
        .route("/{payout_id}/approve", post(approve))
        .route("/{payout_id}/reject", post(reject))
        .route("/{payout_id}/paid", post(mark_paid))
}

#[derive(Debug, Deserialize)]
pub struct PayoutInput {
    pub manager_id: String,
    pub amount: i64,
}

#[tracing::instrument(name = "POST /payouts", skip(state))]
pub async fn request_payout(
    State(state): State<AppState>,
    Json(input): Json<PayoutInput>,
) -> Result<Json<ManagerPayout>, ApiError> {
    let payout = state
        .services
        .payouts
        .request_payout(&input.manager_id, input.amount)
        .await?;
    Ok(Json(payout))
}

#[tracing::instrument(name = "GET /payouts/{payout_id}", skip(state))]
pub async fn get_payout(
    State(state): State<AppState>,
    Path(payout_id): Path<String>,
) -> Result<Json<ManagerPayout>, ApiError> {
    Ok(Json(state.services.payouts.get(&payout_id).await?))
}

#[tracing::instrument(name = "POST /payouts/{payout_id}/approve", skip(state))]
pub async fn approve(
    State(state): State<AppState>,
    Path(payout_id): Path<String>,
) -> Result<Json<ManagerPayout>, ApiError> {
    Ok(Json(state.services.payouts.approve_payout(&payout_id).await?))
}

#[tracing::instrument(name = "POST /payouts/{payout_id}/reject", skip(state))]
pub async fn reject(
    State(state): State<AppState>,
    Path(payout_id): Path<String>,
) -> Result<Json<ManagerPayout>, ApiError> {
    Ok(Json(state.services.payouts.reject_payout(&payout_id).await?))
}

#[tracing::instrument(name = "POST /payouts/{payout_id}/paid", skip(state))]
pub async fn mark_paid(
    State(state): State<AppState>,
    Path(payout_id): Path<String>,
) -> Result<Json<ManagerPayout>, ApiError> {
    Ok(Json(state.services.payouts.mark_paid(&payout_id).await?))
}
