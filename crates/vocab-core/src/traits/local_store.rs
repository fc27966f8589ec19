//! Local persisted state trait.
//!
//! The native stand-in for browser `localStorage`: string values under
//! namespaced keys. Always a cache, never the system of record.

use async_trait::async_trait;

use crate::result::AppResult;

/// Key/value store for auth tokens, cached user objects, menu snapshots,
/// and permission-cache snapshots.
#[async_trait]
pub trait LocalStore: Send + Sync + std::fmt::Debug + 'static {
    /// Get a value by key.
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Store a value, replacing any previous one.
    async fn set(&self, key: &str, value: &str) -> AppResult<()>;

    /// Remove a key. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> AppResult<()>;

    /// List keys starting with `prefix`.
    async fn keys_with_prefix(&self, prefix: &str) -> AppResult<Vec<String>>;
}

impl dyn LocalStore {
    /// Get a typed value by deserializing from JSON.
    ///
    /// Unparseable contents are reported as `None` so a corrupt entry reads
    /// like an empty one.
    pub async fn get_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        match self.get(key).await? {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(value) => Ok(Some(value)),
                Err(e) => {
                    tracing::warn!(key, error = %e, "Discarding unreadable local store entry");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    /// Set a typed value by serializing to JSON.
    pub async fn set_json<T: serde::Serialize + Sync>(&self, key: &str, value: &T) -> AppResult<()> {
        let json = serde_json::to_string(value)?;
        self.set(key, &json).await
    }
}
