//! Sync client counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Counters updated by the sync client.
#[derive(Debug, Default)]
pub struct SyncMetrics {
    /// Frames received.
    pub messages_received: AtomicU64,
    /// Frames dropped as malformed.
    pub messages_dropped: AtomicU64,
    /// Frames sent.
    pub messages_sent: AtomicU64,
    /// Successful opens, first connect included.
    pub connections_opened: AtomicU64,
    /// Scheduled reconnect attempts.
    pub reconnect_attempts: AtomicU64,
    /// Full menu refetches attempted.
    pub refetches: AtomicU64,
    /// Incremental menu updates applied.
    pub patches_applied: AtomicU64,
    /// Most recent ping round trip in milliseconds.
    pub last_rtt_ms: AtomicU64,
}

impl SyncMetrics {
    /// Zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one to `counter`.
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters.
    pub fn snapshot(&self) -> SyncMetricsSnapshot {
        SyncMetricsSnapshot {
            messages_received: self.messages_received.load(Ordering::Relaxed),
            messages_dropped: self.messages_dropped.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            connections_opened: self.connections_opened.load(Ordering::Relaxed),
            reconnect_attempts: self.reconnect_attempts.load(Ordering::Relaxed),
            refetches: self.refetches.load(Ordering::Relaxed),
            patches_applied: self.patches_applied.load(Ordering::Relaxed),
            last_rtt_ms: self.last_rtt_ms.load(Ordering::Relaxed),
        }
    }
}

/// Serializable copy of [`SyncMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncMetricsSnapshot {
    /// Frames received.
    pub messages_received: u64,
    /// Frames dropped as malformed.
    pub messages_dropped: u64,
    /// Frames sent.
    pub messages_sent: u64,
    /// Successful opens.
    pub connections_opened: u64,
    /// Scheduled reconnect attempts.
    pub reconnect_attempts: u64,
    /// Full menu refetches attempted.
    pub refetches: u64,
    /// Incremental menu updates applied.
    pub patches_applied: u64,
    /// Most recent ping round trip in milliseconds.
    pub last_rtt_ms: u64,
}
