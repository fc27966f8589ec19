//! Text frame ⇄ message conversion.

use serde::de::DeserializeOwned;
use tracing::debug;

use vocab_core::error::{AppError, ErrorKind};
use vocab_core::result::AppResult;
use vocab_core::types::SubjectId;

use super::types::{InboundMessage, MenuUpdate, OutboundMessage, RawMessage};
use super::validator::{validate_inbound, validate_kind};

/// Parse one text frame.
///
/// Oversized, blank, non-JSON, or badly shaped frames are errors; the
/// caller logs and drops them. Unrecognised types parse to
/// [`InboundMessage::Unknown`].
pub fn parse_inbound(raw: &str) -> AppResult<InboundMessage> {
    validate_inbound(raw)?;

    let message: RawMessage = serde_json::from_str(raw).map_err(|e| {
        AppError::with_source(ErrorKind::Serialization, "Malformed push message", e)
    })?;
    validate_kind(&message.kind)?;

    let timestamp = message.timestamp;
    let parsed = match message.kind.as_str() {
        "permission_changed" => InboundMessage::PermissionChanged {
            user_id: affected_user(message.data.as_ref())?,
        },
        "menu_updated" => InboundMessage::MenuUpdated(decode_data::<MenuUpdate>(
            "menu_updated",
            message.data,
        )?),
        "ping" => InboundMessage::Ping { timestamp },
        "pong" => InboundMessage::Pong { timestamp },
        "heartbeat" => InboundMessage::Heartbeat { timestamp },
        _ => InboundMessage::Unknown { kind: message.kind },
    };
    debug!(kind = parsed.kind(), "Parsed push message");
    Ok(parsed)
}

/// Serialize an outbound message to a text frame.
pub fn encode_outbound(message: &OutboundMessage) -> AppResult<String> {
    serde_json::to_string(message).map_err(|e| {
        AppError::with_source(ErrorKind::Serialization, "Failed to encode push message", e)
    })
}

/// `data.user_id` (or `data.userId`), given as a string or number.
fn affected_user(data: Option<&serde_json::Value>) -> AppResult<Option<SubjectId>> {
    let Some(value) = data.and_then(|d| d.get("user_id").or_else(|| d.get("userId"))) else {
        return Ok(None);
    };
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::String(s) => SubjectId::new(s.as_str()).map(Some),
        serde_json::Value::Number(n) => SubjectId::new(n.to_string()).map(Some),
        other => Err(AppError::validation(format!(
            "permission_changed carries an invalid user id: {other}"
        ))),
    }
}

/// Decode `data`, treating a missing payload as the type's default.
fn decode_data<T: DeserializeOwned + Default>(
    kind: &str,
    data: Option<serde_json::Value>,
) -> AppResult<T> {
    match data {
        None | Some(serde_json::Value::Null) => Ok(T::default()),
        Some(value) => serde_json::from_value(value).map_err(|e| {
            AppError::with_source(
                ErrorKind::Serialization,
                format!("Malformed {kind} payload"),
                e,
            )
        }),
    }
}

#[cfg(test)]
mod tests {
    use crate::menu::MenuId;
    use crate::message::MenuOperation;

    use super::*;

    #[test]
    fn test_permission_changed_user_forms() {
        let numeric = parse_inbound(r#"{"type": "permission_changed", "data": {"user_id": 42}}"#);
        let string = parse_inbound(r#"{"type": "permission_changed", "data": {"userId": "42"}}"#);
        let expected = InboundMessage::PermissionChanged {
            user_id: Some(SubjectId::new("42").unwrap()),
        };
        assert_eq!(numeric.unwrap(), expected);
        assert_eq!(string.unwrap(), expected);

        let bare = parse_inbound(r#"{"type": "permission_changed"}"#).unwrap();
        assert_eq!(bare, InboundMessage::PermissionChanged { user_id: None });
    }

    #[test]
    fn test_menu_updated_payload() {
        let message = parse_inbound(
            r#"{"type": "menu_updated", "timestamp": 1700000000,
                "data": {"position": "sidebar", "version": 3,
                         "operations": [{"op": "delete", "id": 9}]}}"#,
        )
        .unwrap();
        let InboundMessage::MenuUpdated(update) = message else {
            panic!("expected menu_updated");
        };
        assert_eq!(update.position.as_deref(), Some("sidebar"));
        assert_eq!(update.version, Some(3));
        assert_eq!(update.operations, vec![MenuOperation::Delete { id: MenuId::from(9) }]);

        let InboundMessage::MenuUpdated(bare) = parse_inbound(r#"{"type": "menu_updated"}"#).unwrap()
        else {
            panic!("expected menu_updated");
        };
        assert!(bare.is_refetch());
    }

    #[test]
    fn test_unknown_and_malformed() {
        assert_eq!(
            parse_inbound(r#"{"type": "tool_flags_changed", "data": {}}"#).unwrap(),
            InboundMessage::Unknown {
                kind: "tool_flags_changed".to_string()
            }
        );
        let err = parse_inbound("{not json").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Serialization);
        assert!(parse_inbound(r#"{"data": {}}"#).is_err());
        assert!(parse_inbound(r#"{"type": "menu_updated", "data": {"operations": 5}}"#).is_err());
    }

    #[test]
    fn test_ping_keeps_timestamp() {
        assert_eq!(
            parse_inbound(r#"{"type": "ping", "timestamp": 12.5}"#).unwrap(),
            InboundMessage::Ping {
                timestamp: Some(12.5)
            }
        );
    }
}
