//! Business configuration: category CPM table and the level ladder.
//!
//! Loaded from `adslot.config.json`. Missing sections fall back to defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::pricing::CategoryCpm;
use crate::progression::{ProgressionConfig, ProgressionError};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Progression(#[from] ProgressionError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingConfig {
    #[serde(default)]
    pub categories: CategoryCpm,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub progression: ProgressionConfig,
}

impl AppConfig {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = serde_json::from_str(raw)?;
        config.progression.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AppConfig::from_json("{}").unwrap();
        assert!(config.pricing.categories.is_empty());
        assert_eq!(config.progression, ProgressionConfig::default());
    }

    #[test]
    fn test_parses_sections() {
        let config = AppConfig::from_json(
            r#"{
                "pricing": { "categories": { "crypto": 2500, "news": 1000 } },
                "progression": { "levels": [
                    { "level": 1, "name": "Rookie", "min_xp": 0, "commission_rate": 5 },
                    { "level": 2, "name": "Closer", "min_xp": 100, "commission_rate": 8 }
                ] }
            }"#,
        )
        .unwrap();
        assert_eq!(config.pricing.categories.cpm_for("crypto"), 2500);
        assert_eq!(config.progression.level_for(150), 2);
    }

    #[test]
    fn test_rejects_broken_ladder() {
        let err = AppConfig::from_json(
            r#"{ "progression": { "levels": [
                { "level": 1, "name": "Rookie", "min_xp": 10, "commission_rate": 5 }
            ] } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Progression(_)));
    }
}
