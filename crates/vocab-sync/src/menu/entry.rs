//! Menu entries as delivered by the backend.

use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use vocab_auth::{Permission, PermissionSet};

/// Identifier of a menu entry.
///
/// The backend sends numeric primary keys; strings are accepted too.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct MenuId(String);

impl MenuId {
    /// Wrap a raw id.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Borrow the raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MenuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MenuId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<u64> for MenuId {
    fn from(raw: u64) -> Self {
        Self(raw.to_string())
    }
}

impl<'de> Deserialize<'de> for MenuId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(s) if !s.is_empty() => Ok(Self(s)),
            serde_json::Value::Number(n) => Ok(Self(n.to_string())),
            other => Err(D::Error::custom(format!(
                "expected non-empty string or number menu id, got {other}"
            ))),
        }
    }
}

/// One node of a positioned menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuEntry {
    /// Entry id, unique within a position.
    pub id: MenuId,
    /// Parent entry; `None` for top-level entries.
    #[serde(default)]
    pub parent_id: Option<MenuId>,
    /// Label shown to the user.
    pub title: String,
    /// Route opened by the entry; groups have none.
    #[serde(default)]
    pub path: Option<String>,
    /// Icon name.
    #[serde(default)]
    pub icon: Option<String>,
    /// Sibling sort key.
    #[serde(default)]
    pub order: i32,
    /// Permission keys; holding any one of them shows the entry.
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl MenuEntry {
    /// Whether `granted` may see this entry.
    ///
    /// An entry without permission keys is public. Keys outside the
    /// catalog can only be satisfied by the wildcard grant.
    pub fn is_visible_to(&self, granted: &PermissionSet) -> bool {
        if self.permissions.is_empty() || granted.is_wildcard() {
            return true;
        }
        self.permissions.iter().any(|key| match key.parse::<Permission>() {
            Ok(permission) => granted.contains(permission),
            Err(_) => {
                debug!(entry = %self.id, key = %key, "Menu entry names unknown permission");
                false
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(permissions: &[&str]) -> MenuEntry {
        MenuEntry {
            id: MenuId::from(1),
            parent_id: None,
            title: "Entry".to_string(),
            path: Some("/x".to_string()),
            icon: None,
            order: 0,
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn test_menu_id_accepts_numbers_and_strings() {
        let from_number: MenuId = serde_json::from_str("12").unwrap();
        let from_string: MenuId = serde_json::from_str("\"12\"").unwrap();
        assert_eq!(from_number, from_string);
        assert!(serde_json::from_str::<MenuId>("\"\"").is_err());
        assert!(serde_json::from_str::<MenuId>("null").is_err());
    }

    #[test]
    fn test_visibility_uses_any_semantics() {
        let granted: PermissionSet = [Permission::Flashcards].into_iter().collect();
        assert!(entry(&[]).is_visible_to(&granted));
        assert!(entry(&["learning.flashcards", "advanced.dev_tools"]).is_visible_to(&granted));
        assert!(!entry(&["advanced.dev_tools"]).is_visible_to(&granted));
    }

    #[test]
    fn test_unknown_keys_need_wildcard() {
        let entry = entry(&["beta.secret_lab"]);
        assert!(!entry.is_visible_to(&PermissionSet::new()));
        assert!(entry.is_visible_to(&PermissionSet::wildcard()));
    }

    #[test]
    fn test_entry_deserializes_backend_shape() {
        let entry: MenuEntry = serde_json::from_str(
            r#"{"id": 7, "parent_id": 3, "title": "Flashcards", "path": "/flashcards",
                "permissions": ["learning.flashcards"], "extra": true}"#,
        )
        .unwrap();
        assert_eq!(entry.id.as_str(), "7");
        assert_eq!(entry.parent_id, Some(MenuId::from(3)));
        assert_eq!(entry.order, 0);
    }
}
