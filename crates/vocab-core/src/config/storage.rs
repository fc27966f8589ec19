//! Local persisted state configuration.

use serde::{Deserialize, Serialize};

/// Local key/value storage (the native stand-in for browser storage).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// `"memory"` or `"file"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// JSON document used by the file provider.
    #[serde(default = "default_path")]
    pub path: String,
    /// Prefix applied to every stored key.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            path: default_path(),
            key_prefix: default_key_prefix(),
        }
    }
}

fn default_provider() -> String {
    "file".to_string()
}

fn default_path() -> String {
    "data/local_store.json".to_string()
}

fn default_key_prefix() -> String {
    "vocab".to_string()
}
