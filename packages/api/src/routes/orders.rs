use crate::error::ApiError;
use crate::state::AppState;
use adslot::model::{Order, OrderStatus};
use adslot::orders::{NewOrder, TransitionOutcome};
use axum::extract::{Path, State};
use axum::{
    Json, Router,
    routing::{get, post},
};
use serde::Deserialize;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_order))
        .route("/{order_id}", get(get_order))
        .route("/{order_id}/transition", post(transition))
}

#[derive(Debug, Deserialize)]
pub struct TransitionInput {
    pub status: OrderStatus,
}

/// Creates an order on a slot the client currently holds and books the slot
#[tracing::instrument(name = "POST /orders", skip(state))]
pub async fn create_order(
    State(state): State<AppState>,
    Json(input): Json<NewOrder>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(state.services.orders.create_order(input).await?))
}

#[tracing::instrument(name = "GET /orders/{order_id}", skip(state))]
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(state.services.orders.get_order(&order_id).await?))
}

#[tracing::instrument(name = "POST /orders/{order_id}/transition", skip(state))]
pub async fn transition(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    Json(input): Json<TransitionInput>,
) -> Result<Json<TransitionOutcome>, ApiError> {
    let outcome = state
        .services
        .orders
        .transition(&order_id, input.status)
        .await?;
    if outcome.award.is_some() {
        state.response_cache.invalidate_all();
    }
    Ok(Json(outcome))
}
