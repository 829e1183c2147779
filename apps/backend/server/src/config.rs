use std::env;
use std::time::Duration;

use adslot_api::store::StoreBackend;

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    /// How long a reservation holds a slot
    pub reservation_ttl: Duration,
    pub sweep_interval: Duration,
    /// Business configuration file; the bundled one is used when unset
    pub config_path: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for: {0}")]
    InvalidValue(String),
}

fn parse_secs(var: &str, default: u64) -> Result<Duration, ConfigError> {
    let secs: u64 = match env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(var.to_string()))?,
        Err(_) => default,
    };
    if secs == 0 {
        return Err(ConfigError::InvalidValue(var.to_string()));
    }
    Ok(Duration::from_secs(secs))
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let store_backend = match env::var("STORE_BACKEND") {
            Ok(raw) => StoreBackend::parse(&raw)
                .map_err(|_| ConfigError::InvalidValue("STORE_BACKEND".to_string()))?,
            Err(_) => StoreBackend::Postgres,
        };

        let database_url = env::var("DATABASE_URL").ok();
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::MissingVar("DATABASE_URL".to_string()));
        }

        Ok(Config {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("PORT".to_string()))?,
            store_backend,
            database_url,
            reservation_ttl: parse_secs("RESERVATION_TTL_SECS", 300)?,
            sweep_interval: parse_secs("SWEEP_INTERVAL_SECS", 60)?,
            config_path: env::var("CONFIG_PATH").ok(),
        })
    }
}
