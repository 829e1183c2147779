use std::sync::Arc;

use axum::{Router, routing::get};
use state::State;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, decompression::RequestDecompressionLayer,
    trace::TraceLayer,
};

pub mod entity;
mod routes;

pub mod error;
pub mod state;
pub mod store;

pub use axum;
pub use sea_orm;

pub fn construct_router(state: Arc<State>) -> Router {
    let router = Router::new()
        .nest("/health", routes::health::routes())
        .nest("/pricing", routes::pricing::routes())
        .nest("/channels", routes::channels::routes())
        .nest("/slots", routes::slots::routes())
        .nest("/clients", routes::clients::routes())
        .nest("/orders", routes::orders::routes())
        .nest("/managers", routes::managers::routes())
        .nest("/competitions", routes::competitions::routes())
        .nest("/payouts", routes::payouts::routes())
        .nest("/assistant", routes::assistant::routes())
        .with_state(state)
        .route("/version", get(|| async { env!("CARGO_PKG_VERSION") }))
        .layer(CorsLayer::permissive())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestDecompressionLayer::new())
                .layer(CompressionLayer::new()),
        );

    Router::new().nest("/api/v1", router)
}
