//! Push-channel connection events.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of the sync client's connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Not connected. Initial state, after a clean close, or after giving up.
    Disconnected,
    /// A transport connect is in flight.
    Connecting,
    /// The channel is open.
    Connected,
    /// Waiting out a backoff delay before the next attempt.
    Reconnecting,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Reconnecting => write!(f, "reconnecting"),
        }
    }
}

/// Events related to the push channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ConnectionEvent {
    /// The connection state changed.
    StateChanged {
        /// Previous state.
        from: ConnectionState,
        /// New state.
        to: ConnectionState,
        /// Reconnect attempt counter at the time of the change.
        attempt: u32,
    },
    /// Retries are exhausted; the client now serves last-known-good state.
    Degraded {
        /// Attempts made before giving up.
        attempts: u32,
        /// Last failure reason.
        reason: String,
    },
    /// Unanswered pings forced a reconnect.
    HeartbeatTimeout {
        /// Consecutive missed pongs.
        missed: u32,
    },
    /// A ping round trip completed.
    LatencySample {
        /// Round-trip time in milliseconds.
        rtt_ms: i64,
    },
}
