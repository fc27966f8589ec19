//! # vocab-sync
//!
//! Keeps the client's menus and cached permissions consistent with the
//! backend. Provides:
//!
//! - A push-channel client with exponential reconnect backoff and heartbeats
//! - Incremental menu patching with full-refetch fallback
//! - Degraded mode serving last-known-good menus from local storage

pub mod client;
pub mod connection;
pub mod menu;
pub mod message;
pub mod metrics;

pub use client::{SyncClient, SyncDependencies, SyncSession};
pub use connection::{ReconnectPolicy, Transport, WsTransport};
pub use menu::{MenuEntry, MenuId, MenuNode, MenuSource, MenuTree};
pub use metrics::SyncMetricsSnapshot;
