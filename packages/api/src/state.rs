use std::sync::Arc;
use std::time::Duration;

use adslot::Services;
use adslot::clock::{Clock, SystemClock};
use adslot::config::{AppConfig, ConfigError};
use adslot::posting::{LoggingPostScheduler, PostScheduler};
use adslot::store::BookingStore;
use adslot_providers::{AiClient, AnalyticsClient};
use serde_json::Value;

pub type AppState = Arc<State>;

const CONFIG: &str = include_str!("../../../adslot.config.json");

/// Hold length when nothing else is configured
pub const DEFAULT_RESERVATION_TTL_SECS: i64 = 300;

pub struct State {
    pub config: AppConfig,
    pub services: Services,
    pub reservation_ttl: chrono::Duration,
    pub analytics: Option<AnalyticsClient>,
    pub assistant: Option<AiClient>,
    /// Short-lived cache for leaderboard reads, flushed whenever a sale lands
    pub response_cache: moka::sync::Cache<String, Value>,
}

impl State {
    /// The configuration bundled with the crate
    pub fn default_config() -> Result<AppConfig, ConfigError> {
        AppConfig::from_json(CONFIG)
    }

    pub fn new(store: Arc<dyn BookingStore>, config: AppConfig) -> Self {
        Self::with_parts(
            store,
            config,
            Arc::new(SystemClock),
            Arc::new(LoggingPostScheduler),
        )
    }

    pub fn with_parts(
        store: Arc<dyn BookingStore>,
        config: AppConfig,
        clock: Arc<dyn Clock>,
        posting: Arc<dyn PostScheduler>,
    ) -> Self {
        let services = Services::new(store, clock, config.clone(), posting);

        let response_cache = moka::sync::Cache::builder()
            .max_capacity(1024)
            .time_to_live(Duration::from_secs(30))
            .build();

        Self {
            config,
            services,
            reservation_ttl: chrono::Duration::seconds(DEFAULT_RESERVATION_TTL_SECS),
            analytics: None,
            assistant: None,
            response_cache,
        }
    }

    pub fn with_reservation_ttl(mut self, ttl: chrono::Duration) -> Self {
        self.reservation_ttl = ttl;
        self
    }

    pub fn with_analytics(mut self, analytics: Option<AnalyticsClient>) -> Self {
        self.analytics = analytics;
        self
    }

    pub fn with_assistant(mut self, assistant: Option<AiClient>) -> Self {
        self.assistant = assistant;
        self
    }
}
