//! Identifier types.
//!
//! Client-generated identifiers wrap [`uuid::Uuid`]; subjects wrap the
//! backend's user id string because the backend owns that namespace.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Macro to define a newtype ID wrapper around `Uuid`.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new time-ordered identifier.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner UUID value.
            pub fn into_uuid(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

define_id!(
    /// Identifier of one sync-client connection attempt.
    ConnectionId
);

define_id!(
    /// Identifier of a published client event.
    EventId
);

/// Literal used for the subject of a signed-out client.
pub const ANONYMOUS_SUBJECT: &str = "anonymous";

/// The user a permission query is about.
///
/// Holds the backend user id verbatim, or `anonymous`. Only characters that
/// are safe inside cache keys and URL path segments are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubjectId(String);

impl SubjectId {
    /// Validate and wrap a backend user id.
    pub fn new(raw: impl Into<String>) -> Result<Self, AppError> {
        let raw = raw.into();
        if raw.is_empty() || raw.len() > 128 {
            return Err(AppError::validation("Subject id must be 1-128 characters"));
        }
        if !raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        {
            return Err(AppError::validation(format!(
                "Subject id '{raw}' contains invalid characters"
            )));
        }
        Ok(Self(raw))
    }

    /// The signed-out subject.
    pub fn anonymous() -> Self {
        Self(ANONYMOUS_SUBJECT.to_string())
    }

    /// Whether this is the signed-out subject.
    pub fn is_anonymous(&self) -> bool {
        self.0 == ANONYMOUS_SUBJECT
    }

    /// Borrow the raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SubjectId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for SubjectId {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SubjectId> for String {
    fn from(id: SubjectId) -> String {
        id.0
    }
}

/// Serde helper accepting a subject id written as a JSON string or number.
///
/// The backend emits numeric primary keys in some payloads and strings in
/// others; use with `#[serde(deserialize_with = "lenient_subject::deserialize")]`.
pub mod lenient_subject {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer};

    use super::SubjectId;

    /// Deserialize a [`SubjectId`] from a string or integer.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<SubjectId, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(s) => s,
            serde_json::Value::Number(n) => n.to_string(),
            other => {
                return Err(D::Error::custom(format!(
                    "expected string or number subject id, got {other}"
                )));
            }
        };
        SubjectId::new(raw).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_ids_are_unique() {
        assert_ne!(ConnectionId::new(), ConnectionId::new());
    }

    #[test]
    fn test_subject_rejects_pattern_characters() {
        assert!(SubjectId::new("42").is_ok());
        assert!(SubjectId::new("user_7.alt").is_ok());
        assert!(SubjectId::new("").is_err());
        assert!(SubjectId::new("4*2").is_err());
        assert!(SubjectId::new("a:b").is_err());
    }

    #[test]
    fn test_subject_deserialize_validates() {
        let ok: SubjectId = serde_json::from_str("\"42\"").expect("valid");
        assert_eq!(ok.as_str(), "42");
        assert!(serde_json::from_str::<SubjectId>("\"a b\"").is_err());
    }

    #[test]
    fn test_lenient_subject_accepts_numbers() {
        #[derive(Deserialize)]
        struct Payload {
            #[serde(deserialize_with = "lenient_subject::deserialize")]
            user_id: SubjectId,
        }

        let numeric: Payload = serde_json::from_str(r#"{"user_id": 42}"#).expect("number");
        assert_eq!(numeric.user_id.as_str(), "42");
        let text: Payload = serde_json::from_str(r#"{"user_id": "42"}"#).expect("string");
        assert_eq!(text.user_id, numeric.user_id);
        assert!(serde_json::from_str::<Payload>(r#"{"user_id": null}"#).is_err());
    }

    #[test]
    fn test_anonymous() {
        assert!(SubjectId::anonymous().is_anonymous());
        assert_eq!(SubjectId::anonymous().to_string(), "anonymous");
    }
}
