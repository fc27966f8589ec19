//! # vocab-cache
//!
//! Caching for the access client:
//!
//! - **memory**: bounded TTL store with priority-aware LRU eviction that
//!   memoises permission evaluations
//! - **local**: persisted key/value stores (in-memory or JSON file) that
//!   stand in for browser storage
//! - **keys**: every cache and storage key the client uses
//!
//! The local store is selected at runtime based on configuration.

pub mod keys;
pub mod local;
pub mod memory;
pub mod metrics;
pub mod provider;

pub use keys::{CacheKey, KeyPattern, StorageKeys};
pub use memory::{CachePriority, CacheSnapshot, MemoryStore};
pub use metrics::MetricsSnapshot;
pub use provider::open_local_store;
