//! Permission cache configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// In-memory permission cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CacheConfig {
    /// When false every query goes straight to the evaluator.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Maximum number of entries held at once.
    #[serde(default = "default_max_capacity")]
    #[validate(range(min = 1))]
    pub max_capacity: usize,
    /// Default TTL for entries in seconds.
    #[serde(default = "default_ttl")]
    #[validate(range(min = 1))]
    pub default_ttl_seconds: u64,
    /// Persist a snapshot to local storage on shutdown and restore it on start.
    #[serde(default = "default_true")]
    pub persist_snapshot: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_capacity: default_max_capacity(),
            default_ttl_seconds: default_ttl(),
            persist_snapshot: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_capacity() -> usize {
    1000
}

fn default_ttl() -> u64 {
    300
}
