//! Store construction for the HTTP service
//!
//! `STORE_BACKEND` picks the backend. PostgreSQL is the default; the memory
//! backend keeps everything in-process and is meant for local runs.

mod postgres;

pub use postgres::PostgresBookingStore;

use std::sync::Arc;
use std::time::Duration;

use adslot::store::{BookingStore, InMemoryStore, StoreError, StoreResult};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl StoreBackend {
    pub fn parse(raw: &str) -> StoreResult<Self> {
        match raw.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(StoreError::Configuration(format!(
                "Unknown STORE_BACKEND '{}', expected 'postgres' or 'memory'",
                other
            ))),
        }
    }

    pub fn from_env() -> StoreResult<Self> {
        match std::env::var("STORE_BACKEND") {
            Ok(raw) => Self::parse(&raw),
            Err(_) => Ok(Self::Postgres),
        }
    }
}

pub async fn connect(database_url: &str, log_statements: bool) -> StoreResult<DatabaseConnection> {
    let mut opt = ConnectOptions::new(database_url.to_owned());
    opt.max_connections(10)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(8))
        .sqlx_logging(log_statements);

    Database::connect(opt)
        .await
        .map_err(|e| StoreError::Database(format!("Failed to connect to database: {}", e)))
}

pub async fn create_store(
    backend: StoreBackend,
    database_url: Option<&str>,
) -> StoreResult<Arc<dyn BookingStore>> {
    let store: Arc<dyn BookingStore> = match backend {
        StoreBackend::Memory => Arc::new(InMemoryStore::new()),
        StoreBackend::Postgres => {
            let url = database_url.ok_or_else(|| {
                StoreError::Configuration("DATABASE_URL must be set for postgres".to_string())
            })?;
            let db = connect(url, false).await?;
            Arc::new(PostgresBookingStore::new(db))
        }
    };
    tracing::info!(backend = store.backend_name(), "Booking store ready");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_parse() {
        assert_eq!(StoreBackend::parse("Postgres").unwrap(), StoreBackend::Postgres);
        assert_eq!(StoreBackend::parse(" memory ").unwrap(), StoreBackend::Memory);
        assert!(matches!(
            StoreBackend::parse("redis"),
            Err(StoreError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_postgres_requires_url() {
        let err = create_store(StoreBackend::Postgres, None).await.unwrap_err();
        assert!(matches!(err, StoreError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_memory_backend() {
        let store = create_store(StoreBackend::Memory, None).await.unwrap();
        assert_eq!(store.backend_name(), "memory");
    }
}
