//! In-process permission cache.

pub mod entry;
pub mod store;

pub use entry::{CacheEntry, CachePriority};
pub use store::{CacheSnapshot, MemoryStore, SnapshotEntry};
