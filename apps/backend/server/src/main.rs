#[cfg(not(any(all(target_os = "macos", target_arch = "aarch64"), target_os = "ios")))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::sync::Arc;

use adslot::config::AppConfig;
use adslot_api::state::State;
use adslot_api::store::create_store;
use adslot_providers::{AiClient, AnalyticsClient, ConversationStore};
use dotenv::dotenv;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod sweeper;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting adslot server");

    let config = config::Config::from_env()?;
    tracing::info!(
        "Loaded configuration: port={}, store={:?}, reservation_ttl={}s, sweep_interval={}s",
        config.port,
        config.store_backend,
        config.reservation_ttl.as_secs(),
        config.sweep_interval.as_secs()
    );

    let app_config = match &config.config_path {
        Some(path) => AppConfig::load(path)?,
        None => State::default_config()?,
    };

    let store = create_store(config.store_backend, config.database_url.as_deref()).await?;

    let analytics = AnalyticsClient::from_env();
    if analytics.is_none() {
        tracing::warn!("ANALYTICS_API_URL/ANALYTICS_API_TOKEN not set, analytics refresh disabled");
    }
    let assistant = AiClient::from_env(ConversationStore::default());
    if assistant.is_none() {
        tracing::warn!("OPENAI_ENDPOINT/OPENAI_API_KEY not set, assistant disabled");
    }

    let reservation_ttl = chrono::Duration::from_std(config.reservation_ttl)?;
    let state = State::new(store, app_config)
        .with_reservation_ttl(reservation_ttl)
        .with_analytics(analytics)
        .with_assistant(assistant);
    let state = Arc::new(state);

    tokio::spawn(sweeper::run(
        state.services.ledger.clone(),
        config.sweep_interval,
    ));

    let app = adslot_api::construct_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
