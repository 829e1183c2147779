use crate::error::ApiError;
use crate::state::AppState;
use adslot::competition::Standings;
use adslot::model::Competition;
use axum::extract::{Path, Query, State};
use axum::{
    Json, Router,
    routing::{get, post},
};
use serde::Deserialize;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/monthly", post(create_monthly))
        .route("/{competition_id}", get(get_competition))
        .route("/{competition_id}/standings", get(standings))
        .route("/{competition_id}/finish", post(finish))
}

#[derive(Debug, Deserialize)]
pub struct StandingsQuery {
    pub limit: Option<usize>,
}

/// Opens a competition over the current calendar month
#[tracing::instrument(name = "POST /competitions/monthly", skip(state))]
pub async fn create_monthly(State(state): State<AppState>) -> Result<Json<Competition>, ApiError> {
    let competition = state
        .services
        .progression
        .create_period_competition()
        .await?;
    Ok(Json(competition))
}

#[tracing::instrument(name = "GET /competitions/{competition_id}", skip(state))]
pub async fn get_competition(
    State(state): State<AppState>,
    Path(competition_id): Path<String>,
) -> Result<Json<Competition>, ApiError> {
    Ok(Json(state.services.competitions.get(&competition_id).await?))
}

#[tracing::instrument(name = "GET /competitions/{competition_id}/standings", skip(state))]
pub async fn standings(
    State(state): State<AppState>,
    Path(competition_id): Path<String>,
    Query(query): Query<StandingsQuery>,
) -> Result<Json<Standings>, ApiError> {
    let standings = state
        .services
        .competitions
        .standings(&competition_id, query.limit.unwrap_or(10).min(100))
        .await?;
    Ok(Json(standings))
}

#[tracing::instrument(name = "POST /competitions/{competition_id}/finish", skip(state))]
pub async fn finish(
    State(state): State<AppState>,
    Path(competition_id): Path<String>,
) -> Result<Json<Competition>, ApiError> {
    Ok(Json(state.services.competitions.finish(&competition_id).await?))
}
