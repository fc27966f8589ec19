//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section. Every section has defaults, so an empty file is valid.

pub mod api;
pub mod cache;
pub mod catalog;
pub mod guard;
pub mod logging;
pub mod storage;
pub mod sync;

use serde::{Deserialize, Serialize};
use validator::Validate;

use self::api::ApiConfig;
use self::cache::CacheConfig;
use self::catalog::CatalogConfig;
use self::guard::GuardConfig;
use self::logging::LoggingConfig;
use self::storage::StorageConfig;
use self::sync::SyncConfig;

use crate::error::AppError;

/// Environment variable prefix for overrides (`VOCAB__SYNC__BASE_DELAY_MS=500`).
pub const ENV_PREFIX: &str = "VOCAB";

/// Root application configuration.
///
/// Top-level deserialization target for the merged configuration
/// (default.toml + environment overlay + `VOCAB__*` variables).
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    /// Backend REST API settings.
    #[serde(default)]
    #[validate(nested)]
    pub api: ApiConfig,
    /// Permission cache settings.
    #[serde(default)]
    #[validate(nested)]
    pub cache: CacheConfig,
    /// Menu sync (WebSocket) settings.
    #[serde(default)]
    #[validate(nested)]
    pub sync: SyncConfig,
    /// Route guard settings.
    #[serde(default)]
    #[validate(nested)]
    pub guard: GuardConfig,
    /// Local persisted state settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Permission catalog source.
    #[serde(default)]
    pub catalog: CatalogConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration for an environment name.
    ///
    /// Merges `config/default`, `config/{env}` and environment variables
    /// prefixed with `VOCAB__`, then validates the result.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false));
        Self::finish(builder)
    }

    /// Load configuration from an explicit file path plus environment overrides.
    pub fn load_from(path: &str) -> Result<Self, AppError> {
        let builder =
            config::Config::builder().add_source(config::File::with_name(path).required(false));
        Self::finish(builder)
    }

    fn finish(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, AppError> {
        let config = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let parsed: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        parsed.validate()?;
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sync.max_reconnect_attempts, 10);
        assert_eq!(config.guard.login_grace_ms, 300);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_from("does/not/exist").expect("defaults");
        assert_eq!(config.cache.max_capacity, 1000);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut config = AppConfig::default();
        config.cache.max_capacity = 0;
        assert!(config.validate().is_err());
    }
}
