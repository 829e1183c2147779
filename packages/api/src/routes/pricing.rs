use crate::error::ApiError;
use crate::state::AppState;
use adslot::pricing::{PriceRequest, recommend};
use axum::extract::{Query, State};
use axum::{Json, Router, routing::get};
use serde::{Deserialize, Serialize};

pub fn routes() -> Router<AppState> {
    Router::new().route("/recommend", get(recommend_price))
}

#[derive(Debug, Deserialize)]
pub struct RecommendQuery {
    pub reach: i64,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub err_percent: f64,
    #[serde(default = "default_format")]
    pub format: String,
    pub cpm: Option<i64>,
}

fn default_format() -> String {
    "1/24".to_string()
}

#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub price: i64,
    pub cpm: i64,
    pub format: String,
}

/// GET /pricing/recommend?reach=..&category=..&err_percent=..&format=..&cpm=..
#[tracing::instrument(name = "GET /pricing/recommend", skip(state))]
pub async fn recommend_price(
    State(state): State<AppState>,
    Query(query): Query<RecommendQuery>,
) -> Result<Json<RecommendResponse>, ApiError> {
    let price = recommend(
        &PriceRequest {
            reach: query.reach,
            category: &query.category,
            err_percent: query.err_percent,
            format: &query.format,
            cpm_override: query.cpm,
        },
        &state.services.categories,
    )?;

    Ok(Json(RecommendResponse {
        price,
        cpm: query
            .cpm
            .unwrap_or_else(|| state.services.categories.cpm_for(&query.category)),
        format: query.format,
    }))
}
