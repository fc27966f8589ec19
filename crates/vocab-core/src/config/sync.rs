//! Menu sync (WebSocket) client configuration.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Reconnect, heartbeat and menu settings for the sync client.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SyncConfig {
    /// Whether the agent opens the push channel at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// First reconnect delay in milliseconds (doubled per attempt).
    #[serde(default = "default_base_delay")]
    #[validate(range(min = 1))]
    pub base_delay_ms: u64,
    /// Upper bound on a single reconnect delay, before jitter.
    #[serde(default = "default_max_delay")]
    #[validate(range(min = 1))]
    pub max_reconnect_interval_ms: u64,
    /// Consecutive failed attempts before giving up.
    #[serde(default = "default_max_attempts")]
    #[validate(range(min = 1))]
    pub max_reconnect_attempts: u32,
    /// Jitter ratio applied to each delay (0.25 = ±25%).
    #[serde(default = "default_jitter")]
    #[validate(range(min = 0.0, max = 1.0), custom(function = "finite_ratio"))]
    pub jitter_ratio: f64,
    /// Connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout")]
    #[validate(range(min = 1))]
    pub connect_timeout_ms: u64,
    /// Interval between client pings in seconds.
    #[serde(default = "default_heartbeat_interval")]
    #[validate(range(min = 1))]
    pub heartbeat_interval_seconds: u64,
    /// Unanswered pings tolerated before the connection is treated as dead.
    #[serde(default = "default_max_missed_pongs")]
    #[validate(range(min = 1))]
    pub max_missed_pongs: u32,
    /// Menu positions refetched after every (re)connect.
    #[serde(default = "default_positions")]
    pub menu_positions: Vec<String>,
    /// Capacity of the client event broadcast channel.
    #[serde(default = "default_event_buffer")]
    #[validate(range(min = 1))]
    pub event_buffer_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_delay_ms: default_base_delay(),
            max_reconnect_interval_ms: default_max_delay(),
            max_reconnect_attempts: default_max_attempts(),
            jitter_ratio: default_jitter(),
            connect_timeout_ms: default_connect_timeout(),
            heartbeat_interval_seconds: default_heartbeat_interval(),
            max_missed_pongs: default_max_missed_pongs(),
            menu_positions: default_positions(),
            event_buffer_size: default_event_buffer(),
        }
    }
}

/// NaN slips through range checks, so reject it explicitly.
fn finite_ratio(value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::new("non_finite"))
    }
}

fn default_true() -> bool {
    true
}

fn default_base_delay() -> u64 {
    1000
}

fn default_max_delay() -> u64 {
    30_000
}

fn default_max_attempts() -> u32 {
    10
}

fn default_jitter() -> f64 {
    0.25
}

fn default_connect_timeout() -> u64 {
    10_000
}

fn default_heartbeat_interval() -> u64 {
    30
}

fn default_max_missed_pongs() -> u32 {
    3
}

fn default_positions() -> Vec<String> {
    vec!["sidebar".to_string()]
}

fn default_event_buffer() -> usize {
    64
}
