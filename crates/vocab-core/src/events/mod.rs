//! Client events published by the access client.
//!
//! Events go out on a broadcast channel and are consumed by whatever hosts
//! the client (menu renderers, status indicators, logs).

pub mod connection;
pub mod menu;
pub mod permission;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::EventId;

pub use connection::{ConnectionEvent, ConnectionState};
pub use menu::MenuEvent;
pub use permission::PermissionEvent;

/// Wrapper for all client events with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientEvent {
    /// Unique event ID.
    pub id: EventId,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// The event payload.
    pub payload: EventPayload,
}

/// Union of all client event types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event")]
pub enum EventPayload {
    /// Push-channel lifecycle.
    Connection(ConnectionEvent),
    /// Permission cache changes.
    Permission(PermissionEvent),
    /// Menu state changes.
    Menu(MenuEvent),
}

impl ClientEvent {
    /// Create a new client event.
    pub fn new(payload: EventPayload) -> Self {
        Self {
            id: EventId::new(),
            timestamp: Utc::now(),
            payload,
        }
    }
}

impl From<ConnectionEvent> for ClientEvent {
    fn from(event: ConnectionEvent) -> Self {
        Self::new(EventPayload::Connection(event))
    }
}

impl From<PermissionEvent> for ClientEvent {
    fn from(event: PermissionEvent) -> Self {
        Self::new(EventPayload::Permission(event))
    }
}

impl From<MenuEvent> for ClientEvent {
    fn from(event: MenuEvent) -> Self {
        Self::new(EventPayload::Menu(event))
    }
}
