//! Permission catalog source configuration.

use serde::{Deserialize, Serialize};

/// Where the role/permission catalog comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Optional path to a catalog file (TOML or JSON). The built-in catalog
    /// is used when unset.
    #[serde(default)]
    pub path: Option<String>,
    /// Decision for routes missing from the page map: `"allow"` or `"deny"`.
    #[serde(default = "default_unknown_page")]
    pub unknown_page: String,
}

fn default_unknown_page() -> String {
    "allow".to_string()
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: None,
            unknown_page: default_unknown_page(),
        }
    }
}
