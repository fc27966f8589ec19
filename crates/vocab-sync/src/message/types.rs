//! Push-channel message shapes.
//!
//! Every frame on the wire is a JSON object `{type, data?, timestamp?}`.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use vocab_core::types::SubjectId;

use crate::menu::{MenuEntry, MenuId};

/// A frame as it arrives, before dispatch on `type`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawMessage {
    /// Message type.
    #[serde(rename = "type")]
    pub kind: String,
    /// Type-specific payload.
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    /// Sender timestamp, epoch seconds or milliseconds.
    #[serde(default)]
    pub timestamp: Option<f64>,
}

/// Messages sent by the server to the client.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Permissions changed server-side. `None` means the connected user.
    PermissionChanged {
        /// Affected user.
        user_id: Option<SubjectId>,
    },
    /// A menu changed server-side.
    MenuUpdated(MenuUpdate),
    /// Server ping; answered with a pong.
    Ping {
        /// Sender timestamp, echoed back.
        timestamp: Option<f64>,
    },
    /// Answer to a client ping.
    Pong {
        /// Sender timestamp.
        timestamp: Option<f64>,
    },
    /// Unsolicited server keepalive.
    Heartbeat {
        /// Sender timestamp.
        timestamp: Option<f64>,
    },
    /// A type this client does not handle.
    Unknown {
        /// The unrecognised type.
        kind: String,
    },
}

impl InboundMessage {
    /// Wire name of the message type.
    pub fn kind(&self) -> &str {
        match self {
            Self::PermissionChanged { .. } => "permission_changed",
            Self::MenuUpdated(_) => "menu_updated",
            Self::Ping { .. } => "ping",
            Self::Pong { .. } => "pong",
            Self::Heartbeat { .. } => "heartbeat",
            Self::Unknown { kind } => kind,
        }
    }
}

/// Payload of `menu_updated`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MenuUpdate {
    /// Affected position; `None` means every position.
    #[serde(default)]
    pub position: Option<String>,
    /// Menu version after the update.
    #[serde(default)]
    pub version: Option<u64>,
    /// Incremental operations. Empty means "refetch".
    #[serde(default)]
    pub operations: Vec<MenuOperation>,
}

impl MenuUpdate {
    /// Whether the update carries no operations and needs a full refetch.
    pub fn is_refetch(&self) -> bool {
        self.operations.is_empty()
    }
}

/// One incremental change to a menu, keyed by entry id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum MenuOperation {
    /// Insert an entry.
    Create {
        /// The new entry.
        #[serde(default)]
        entry: Option<MenuEntry>,
    },
    /// Replace an entry.
    Update {
        /// The replacement entry.
        #[serde(default)]
        entry: Option<MenuEntry>,
    },
    /// Remove an entry and its descendants.
    Delete {
        /// Removed entry.
        id: MenuId,
    },
}

impl MenuOperation {
    /// Operation name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
        }
    }
}

/// Messages sent by the client to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Client ping, epoch milliseconds.
    Ping {
        /// Send time.
        timestamp: i64,
    },
    /// Answer to a server ping.
    Pong {
        /// Echoed server timestamp.
        #[serde(skip_serializing_if = "Option::is_none")]
        timestamp: Option<f64>,
    },
}

impl OutboundMessage {
    /// A ping stamped with `now`.
    pub fn ping(now: DateTime<Utc>) -> Self {
        Self::Ping {
            timestamp: now.timestamp_millis(),
        }
    }
}

/// Interpret a wire timestamp.
///
/// Values below 10^11 are epoch seconds, larger ones epoch milliseconds.
pub fn timestamp_to_datetime(raw: f64) -> Option<DateTime<Utc>> {
    if !raw.is_finite() || raw < 0.0 {
        return None;
    }
    let millis = if raw < 1e11 { raw * 1000.0 } else { raw };
    Utc.timestamp_millis_opt(millis as i64).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_wire_shape() {
        let json = serde_json::to_value(OutboundMessage::Ping { timestamp: 1700 }).unwrap();
        assert_eq!(json, serde_json::json!({"type": "ping", "timestamp": 1700}));

        let pong = serde_json::to_value(OutboundMessage::Pong { timestamp: None }).unwrap();
        assert_eq!(pong, serde_json::json!({"type": "pong"}));
    }

    #[test]
    fn test_operation_tags() {
        let op: MenuOperation = serde_json::from_str(r#"{"op": "delete", "id": 4}"#).unwrap();
        assert_eq!(op, MenuOperation::Delete { id: MenuId::from(4) });

        let op: MenuOperation = serde_json::from_str(r#"{"op": "create"}"#).unwrap();
        assert_eq!(op, MenuOperation::Create { entry: None });
    }

    #[test]
    fn test_timestamp_units() {
        let seconds = timestamp_to_datetime(1_700_000_000.5).unwrap();
        let millis = timestamp_to_datetime(1_700_000_000_500.0).unwrap();
        assert_eq!(seconds, millis);
        assert!(timestamp_to_datetime(f64::NAN).is_none());
    }
}
