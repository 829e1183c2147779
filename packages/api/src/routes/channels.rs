//! Channel registration, schedules, price tables and analytics refresh

use crate::error::ApiError;
use crate::state::AppState;
use adslot::directory::NewChannel;
use adslot::model::{Channel, FormatPrices, PlacementFormat, Slot};
use axum::extract::{Path, Query, State};
use axum::{
    Json, Router,
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_channel))
        .route("/{channel_id}", get(get_channel))
        .route("/{channel_id}/prices", put(set_prices))
        .route("/{channel_id}/slots", get(upcoming_slots))
        .route("/{channel_id}/recommended-price", get(recommended_price))
        .route("/{channel_id}/analytics/refresh", post(refresh_analytics))
}

#[derive(Debug, Deserialize)]
pub struct CreateChannelInput {
    pub external_id: String,
    pub title: String,
    pub username: Option<String>,
    pub category: String,
    #[serde(default)]
    pub prices: FormatPrices,
}

#[tracing::instrument(name = "POST /channels", skip(state, input))]
pub async fn create_channel(
    State(state): State<AppState>,
    Json(input): Json<CreateChannelInput>,
) -> Result<Json<Channel>, ApiError> {
    if input.title.trim().is_empty() {
        return Err(ApiError::bad_request("Channel title must not be empty"));
    }
    let channel = state
        .services
        .directory
        .register_channel(NewChannel {
            external_id: input.external_id,
            title: input.title,
            username: input.username,
            category: input.category,
            prices: input.prices,
        })
        .await?;
    Ok(Json(channel))
}

#[tracing::instrument(name = "GET /channels/{channel_id}", skip(state))]
pub async fn get_channel(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> Result<Json<Channel>, ApiError> {
    Ok(Json(state.services.directory.channel(&channel_id).await?))
}

#[tracing::instrument(name = "PUT /channels/{channel_id}/prices", skip(state, prices))]
pub async fn set_prices(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
    Json(prices): Json<FormatPrices>,
) -> Result<Json<Channel>, ApiError> {
    let channel = state
        .services
        .directory
        .set_prices(&channel_id, prices)
        .await?;
    Ok(Json(channel))
}

#[tracing::instrument(name = "GET /channels/{channel_id}/slots", skip(state))]
pub async fn upcoming_slots(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> Result<Json<Vec<Slot>>, ApiError> {
    Ok(Json(state.services.ledger.upcoming(&channel_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct RecommendedPriceQuery {
    pub format: Option<String>,
    pub cpm: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct RecommendedPrice {
    pub format: PlacementFormat,
    pub price: i64,
}

/// Recommendation per format from the channel's own analytics snapshot
#[tracing::instrument(name = "GET /channels/{channel_id}/recommended-price", skip(state))]
pub async fn recommended_price(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
    Query(query): Query<RecommendedPriceQuery>,
) -> Result<Json<Vec<RecommendedPrice>>, ApiError> {
    let channel = state.services.directory.channel(&channel_id).await?;
    let formats = match query.format.as_deref() {
        Some(raw) => vec![raw.parse::<PlacementFormat>().map_err(ApiError::bad_request)?],
        None => PlacementFormat::ALL.to_vec(),
    };

    let mut prices = Vec::with_capacity(formats.len());
    for format in formats {
        let price = channel.recommended_price(format, &state.services.categories, query.cpm)?;
        prices.push(RecommendedPrice { format, price });
    }
    Ok(Json(prices))
}

/// Pulls fresh statistics from the analytics provider. A provider miss
/// leaves the stored snapshot untouched.
#[tracing::instrument(name = "POST /channels/{channel_id}/analytics/refresh", skip(state))]
pub async fn refresh_analytics(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> Result<Json<Channel>, ApiError> {
    let analytics = state
        .analytics
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Analytics provider not configured"))?;

    let channel = state.services.directory.channel(&channel_id).await?;
    let lookup = channel
        .username
        .as_deref()
        .map(|u| format!("@{}", u.trim_start_matches('@')))
        .unwrap_or_else(|| channel.external_id.clone());

    let stats = analytics
        .channel_stats(&lookup)
        .await
        .map_err(|e| ApiError::service_unavailable(e.to_string()))?;

    match stats {
        Some(stats) => {
            let channel = state
                .services
                .directory
                .apply_analytics(&channel_id, stats.into())
                .await?;
            tracing::info!(channel_id, "Analytics refreshed");
            Ok(Json(channel))
        }
        None => Ok(Json(channel)),
    }
}
