use crate::error::ApiError;
use crate::state::AppState;
use adslot::model::{LeaderboardMetric, Manager, ManagerStatus};
use adslot::progression::SaleAward;
use axum::extract::{Path, Query, State};
use axum::{
    Json, Router,
    routing::{get, post, put},
};
use serde::Deserialize;
use serde_json::Value;

const DEFAULT_LEADERBOARD_LIMIT: usize = 10;
const MAX_LEADERBOARD_LIMIT: usize = 100;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_manager))
        .route("/leaderboard", get(leaderboard))
        .route("/{manager_id}", get(get_manager))
        .route("/{manager_id}/status", put(set_status))
        .route("/{manager_id}/award", post(award_sale))
}

#[derive(Debug, Deserialize)]
pub struct CreateManagerInput {
    pub telegram_id: i64,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusInput {
    pub status: ManagerStatus,
}

#[derive(Debug, Deserialize)]
pub struct AwardInput {
    pub amount: i64,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub metric: Option<String>,
    pub limit: Option<usize>,
}

#[tracing::instrument(name = "POST /managers", skip(state, input))]
pub async fn create_manager(
    State(state): State<AppState>,
    Json(input): Json<CreateManagerInput>,
) -> Result<Json<Manager>, ApiError> {
    let manager = state
        .services
        .directory
        .register_manager(input.telegram_id, &input.name)
        .await?;
    Ok(Json(manager))
}

#[tracing::instrument(name = "GET /managers/{manager_id}", skip(state))]
pub async fn get_manager(
    State(state): State<AppState>,
    Path(manager_id): Path<String>,
) -> Result<Json<Manager>, ApiError> {
    Ok(Json(state.services.directory.manager(&manager_id).await?))
}

#[tracing::instrument(name = "PUT /managers/{manager_id}/status", skip(state))]
pub async fn set_status(
    State(state): State<AppState>,
    Path(manager_id): Path<String>,
    Json(input): Json<StatusInput>,
) -> Result<Json<Manager>, ApiError> {
    let manager = state
        .services
        .directory
        .set_manager_status(&manager_id, input.status)
        .await?;
    state.response_cache.invalidate_all();
    Ok(Json(manager))
}

/// Credits a sale made outside the order workflow
#[tracing::instrument(name = "POST /managers/{manager_id}/award", skip(state))]
pub async fn award_sale(
    State(state): State<AppState>,
    Path(manager_id): Path<String>,
    Json(input): Json<AwardInput>,
) -> Result<Json<SaleAward>, ApiError> {
    let award = state
        .services
        .progression
        .award_sale(&manager_id, input.amount)
        .await?;
    state.response_cache.invalidate_all();
    Ok(Json(award))
}

/// GET /managers/leaderboard?metric=sales|revenue|xp&limit=10
///
/// Unknown metrics rank by sales.
#[tracing::instrument(name = "GET /managers/leaderboard", skip(state))]
pub async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Value>, ApiError> {
    let metric = query
        .metric
        .as_deref()
        .map(LeaderboardMetric::parse_or_default)
        .unwrap_or_default();
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LEADERBOARD_LIMIT)
        .min(MAX_LEADERBOARD_LIMIT);

    let cache_key = format!("leaderboard:{}:{}", metric, limit);
    if let Some(cached) = state.response_cache.get(&cache_key) {
        return Ok(Json(cached));
    }

    let entries = state
        .services
        .progression
        .leaderboard(metric, limit)
        .await?;
    let value = serde_json::to_value(&entries)?;
    state.response_cache.insert(cache_key, value.clone());
    Ok(Json(value))
}
