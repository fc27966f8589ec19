//! In-process local store backed by a concurrent map.

use async_trait::async_trait;
use dashmap::DashMap;

use vocab_core::result::AppResult;
use vocab_core::traits::LocalStore;

/// Local store that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryLocalStore {
    values: DashMap<String, String>,
}

impl MemoryLocalStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LocalStore for MemoryLocalStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.values.get(key).map(|v| v.value().clone()))
    }

    async fn set(&self, key: &str, value: &str) -> AppResult<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> AppResult<()> {
        self.values.remove(key);
        Ok(())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> AppResult<Vec<String>> {
        let mut keys: Vec<String> = self
            .values
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_remove() {
        let store = MemoryLocalStore::new();
        store.set("vocab:auth_token", "abc").await.unwrap();
        assert_eq!(
            store.get("vocab:auth_token").await.unwrap(),
            Some("abc".to_string())
        );
        store.remove("vocab:auth_token").await.unwrap();
        assert_eq!(store.get("vocab:auth_token").await.unwrap(), None);
        store.remove("vocab:auth_token").await.unwrap();
    }

    #[tokio::test]
    async fn test_prefix_listing() {
        let store = MemoryLocalStore::new();
        store.set("vocab:42:menu:student:sidebar", "[]").await.unwrap();
        store.set("vocab:42:cache_snapshot", "{}").await.unwrap();
        store.set("vocab:7:cache_snapshot", "{}").await.unwrap();
        let keys = store.keys_with_prefix("vocab:42:").await.unwrap();
        assert_eq!(keys.len(), 2);
    }

    #[tokio::test]
    async fn test_json_helpers_tolerate_corruption() {
        let store: std::sync::Arc<dyn LocalStore> = std::sync::Arc::new(MemoryLocalStore::new());
        store.set_json("k", &vec![1, 2, 3]).await.unwrap();
        let parsed: Option<Vec<u32>> = store.get_json("k").await.unwrap();
        assert_eq!(parsed, Some(vec![1, 2, 3]));

        store.set("k", "not json").await.unwrap();
        let parsed: Option<Vec<u32>> = store.get_json("k").await.unwrap();
        assert_eq!(parsed, None);
    }
}
