//! Bounded in-memory store with per-entry TTL and priority-aware LRU eviction.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use vocab_core::config::cache::CacheConfig;
use vocab_core::traits::{Clock, SystemClock};

use crate::keys::{CacheKey, KeyPattern};
use crate::metrics::{CacheMetrics, MetricsSnapshot};

use super::entry::{CacheEntry, CachePriority};

/// Memoises evaluator results with bounded size and staleness.
///
/// Operations never fail: a miss, an expired entry, or a poisoned lock all
/// degrade to "recompute". When the store is full, the entry with the
/// lowest priority is evicted; ties go to the least recently accessed.
#[derive(Debug)]
pub struct MemoryStore<V> {
    inner: Mutex<StoreInner<V>>,
    clock: Arc<dyn Clock>,
    max_capacity: usize,
    default_ttl: Duration,
    metrics: CacheMetrics,
}

#[derive(Debug)]
struct StoreInner<V> {
    entries: HashMap<CacheKey, CacheEntry<V>>,
    /// Monotonic access counter; orders entries for LRU independent of clock resolution.
    access_seq: u64,
}

impl<V> StoreInner<V> {
    fn next_seq(&mut self) -> u64 {
        self.access_seq += 1;
        self.access_seq
    }
}

impl<V: Clone> MemoryStore<V> {
    /// Create a store from configuration using the system clock.
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a store with an explicit clock.
    pub fn with_clock(config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self::with_limits(
            config.max_capacity,
            Duration::from_secs(config.default_ttl_seconds),
            clock,
        )
    }

    /// Create a store from raw limits. A capacity of zero is raised to one.
    pub fn with_limits(max_capacity: usize, default_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                entries: HashMap::new(),
                access_seq: 0,
            }),
            clock,
            max_capacity: max_capacity.max(1),
            default_ttl,
            metrics: CacheMetrics::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner<V>> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Returns the cached value if present and not expired.
    ///
    /// An expired entry is removed as a side effect and reported as a miss.
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        let now = self.clock.now();
        let mut inner = self.lock();
        let seq = inner.next_seq();

        match inner.entries.get_mut(key) {
            None => {
                self.metrics.record_miss();
                return None;
            }
            Some(entry) if !entry.is_expired(now) => {
                entry.touch(now, seq);
                self.metrics.record_hit();
                return Some(entry.value.clone());
            }
            Some(_) => {}
        }

        inner.entries.remove(key);
        self.metrics.record_expiration();
        self.metrics.record_miss();
        debug!(key = %key, "Cache entry expired");
        None
    }

    /// Inserts with the default TTL and normal priority.
    pub fn set(&self, key: CacheKey, value: V) {
        self.set_with(key, value, None, None);
    }

    /// Inserts or overwrites an entry.
    ///
    /// Overwriting never evicts. Inserting a new key into a full store first
    /// drops expired entries, and evicts one live entry only if that freed
    /// nothing.
    pub fn set_with(
        &self,
        key: CacheKey,
        value: V,
        ttl: Option<Duration>,
        priority: Option<CachePriority>,
    ) {
        let now = self.clock.now();
        let ttl = ttl.unwrap_or(self.default_ttl);
        let priority = priority.unwrap_or_default();
        let mut inner = self.lock();
        let seq = inner.next_seq();

        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.max_capacity {
            self.drop_expired(&mut inner.entries, now);
        }
        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.max_capacity {
            if let Some(victim) = Self::pick_victim(&inner.entries) {
                inner.entries.remove(&victim);
                self.metrics.record_eviction();
                debug!(key = %victim, "Evicted cache entry");
            }
        }

        inner
            .entries
            .insert(key, CacheEntry::new(value, now, ttl, priority, seq));
        self.metrics.record_insert();
    }

    fn drop_expired(
        &self,
        entries: &mut HashMap<CacheKey, CacheEntry<V>>,
        now: DateTime<Utc>,
    ) -> usize {
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - entries.len();
        for _ in 0..removed {
            self.metrics.record_expiration();
        }
        removed
    }

    /// Lowest priority first, then least recently accessed.
    fn pick_victim(entries: &HashMap<CacheKey, CacheEntry<V>>) -> Option<CacheKey> {
        entries
            .iter()
            .min_by_key(|(_, entry)| (entry.priority, entry.access_seq))
            .map(|(key, _)| key.clone())
    }

    /// Removes one entry. Returns whether it existed.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        let removed = self.lock().entries.remove(key).is_some();
        if removed {
            self.metrics.record_invalidations(1);
        }
        removed
    }

    /// Removes every entry whose key matches `pattern`. Returns the count.
    pub fn invalidate_pattern(&self, pattern: &KeyPattern) -> usize {
        let mut inner = self.lock();
        let before = inner.entries.len();
        inner.entries.retain(|key, _| !pattern.matches(key.as_str()));
        let removed = before - inner.entries.len();
        drop(inner);

        self.metrics.record_invalidations(removed as u64);
        debug!(pattern = %pattern, removed, "Invalidated cache entries by pattern");
        removed
    }

    /// Drops every entry.
    pub fn clear(&self) {
        let mut inner = self.lock();
        let removed = inner.entries.len();
        inner.entries.clear();
        drop(inner);
        self.metrics.record_invalidations(removed as u64);
    }

    /// Removes all expired entries. Returns the count.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut inner = self.lock();
        self.drop_expired(&mut inner.entries, now)
    }

    /// Number of entries currently held (expired ones included until touched).
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.max_capacity
    }

    /// Counter snapshot including the current size.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot(self.len())
    }

    /// Copies every live entry together with its remaining TTL.
    pub fn snapshot(&self) -> CacheSnapshot<V> {
        let now = self.clock.now();
        let inner = self.lock();
        let entries = inner
            .entries
            .iter()
            .filter_map(|(key, entry)| {
                entry.remaining(now).map(|remaining| SnapshotEntry {
                    key: key.as_str().to_string(),
                    value: entry.value.clone(),
                    remaining_ttl_ms: remaining.as_millis() as u64,
                    priority: entry.priority,
                })
            })
            .collect();

        CacheSnapshot {
            taken_at: now,
            entries,
        }
    }

    /// Loads entries from a snapshot.
    ///
    /// Time elapsed since the snapshot was taken is charged against each
    /// entry's remaining TTL. Entries with invalid keys or no lifetime left
    /// are skipped. Returns the number restored.
    pub fn restore(&self, snapshot: CacheSnapshot<V>) -> usize {
        let age_ms = (self.clock.now() - snapshot.taken_at)
            .num_milliseconds()
            .max(0) as u64;
        let mut restored = 0;
        for item in snapshot.entries {
            let remaining_ms = item.remaining_ttl_ms.saturating_sub(age_ms);
            if remaining_ms == 0 {
                continue;
            }
            let Ok(key) = CacheKey::parse(item.key) else {
                continue;
            };
            self.set_with(
                key,
                item.value,
                Some(Duration::from_millis(remaining_ms)),
                Some(item.priority),
            );
            restored += 1;
        }
        restored
    }
}

/// Serializable copy of the live cache contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSnapshot<V> {
    /// When the snapshot was taken.
    pub taken_at: DateTime<Utc>,
    /// Live entries.
    pub entries: Vec<SnapshotEntry<V>>,
}

/// One entry of a [`CacheSnapshot`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotEntry<V> {
    /// Key text.
    pub key: String,
    /// Cached value.
    pub value: V,
    /// Lifetime left when the snapshot was taken.
    pub remaining_ttl_ms: u64,
    /// Eviction priority.
    pub priority: CachePriority,
}
