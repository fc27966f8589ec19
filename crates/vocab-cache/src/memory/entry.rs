//! Cache entry bookkeeping.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Eviction priority. Lower priorities are evicted first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePriority {
    /// Cheap to recompute.
    Low,
    /// Default.
    #[default]
    Normal,
    /// Role closures and other results reused on every render.
    High,
}

/// A cached value with its lifetime and access history.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// Cached value.
    pub value: V,
    /// When the value was stored.
    pub inserted_at: DateTime<Utc>,
    /// Last successful read (or the insert time).
    pub last_access_at: DateTime<Utc>,
    /// Successful reads since insert.
    pub access_count: u64,
    /// Lifetime measured from `inserted_at`.
    pub ttl: Duration,
    /// Eviction priority.
    pub priority: CachePriority,
    pub(crate) access_seq: u64,
}

impl<V> CacheEntry<V> {
    pub(crate) fn new(
        value: V,
        now: DateTime<Utc>,
        ttl: Duration,
        priority: CachePriority,
        seq: u64,
    ) -> Self {
        Self {
            value,
            inserted_at: now,
            last_access_at: now,
            access_count: 0,
            ttl,
            priority,
            access_seq: seq,
        }
    }

    /// Expired once strictly more than `ttl` has elapsed since insert.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.remaining(now).is_none()
    }

    /// Lifetime left at `now`; `None` once expired.
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        let elapsed = (now - self.inserted_at).to_std().unwrap_or(Duration::ZERO);
        if elapsed > self.ttl {
            None
        } else {
            Some(self.ttl - elapsed)
        }
    }

    pub(crate) fn touch(&mut self, now: DateTime<Utc>, seq: u64) {
        self.last_access_at = now;
        self.access_count += 1;
        self.access_seq = seq;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_order() {
        assert!(CachePriority::Low < CachePriority::Normal);
        assert!(CachePriority::Normal < CachePriority::High);
        assert_eq!(CachePriority::default(), CachePriority::Normal);
    }

    #[test]
    fn test_remaining_counts_down() {
        let start = Utc::now();
        let entry = CacheEntry::new((), start, Duration::from_secs(10), CachePriority::Low, 1);
        let later = start + chrono::Duration::seconds(4);
        assert_eq!(entry.remaining(later), Some(Duration::from_secs(6)));
        assert!(entry.is_expired(start + chrono::Duration::seconds(11)));
    }
}
