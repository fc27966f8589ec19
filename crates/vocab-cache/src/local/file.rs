//! Local store persisted as a single JSON document.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use vocab_core::error::AppError;
use vocab_core::result::AppResult;
use vocab_core::traits::LocalStore;

/// Local store that survives restarts.
///
/// Reads are served from memory; every write rewrites the document through a
/// temporary file and rename so a crash never leaves a half-written file.
#[derive(Debug)]
pub struct FileLocalStore {
    path: PathBuf,
    values: DashMap<String, String>,
    write_lock: Mutex<()>,
}

impl FileLocalStore {
    /// Open (or lazily create) the document at `path`.
    ///
    /// A missing file is an empty store. An unreadable or corrupt file is
    /// logged and treated as empty, because the contents are only a cache.
    pub async fn open(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref().to_path_buf();
        let values = DashMap::new();

        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => match serde_json::from_str::<BTreeMap<String, String>>(&raw) {
                Ok(map) => {
                    for (k, v) in map {
                        values.insert(k, v);
                    }
                    debug!(path = %path.display(), entries = values.len(), "Loaded local store");
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Local store is corrupt, starting empty");
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Local store unreadable, starting empty");
            }
        }

        Ok(Self {
            path,
            values,
            write_lock: Mutex::new(()),
        })
    }

    async fn flush(&self) -> AppResult<()> {
        let _guard = self.write_lock.lock().await;

        let ordered: BTreeMap<String, String> = self
            .values
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        let json = serde_json::to_string_pretty(&ordered)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await.map_err(|e| {
            AppError::with_source(
                vocab_core::error::ErrorKind::Storage,
                format!("Failed to write {}", tmp.display()),
                e,
            )
        })?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl LocalStore for FileLocalStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.values.get(key).map(|v| v.value().clone()))
    }

    async fn set(&self, key: &str, value: &str) -> AppResult<()> {
        self.values.insert(key.to_string(), value.to_string());
        self.flush().await
    }

    async fn remove(&self, key: &str) -> AppResult<()> {
        if self.values.remove(key).is_some() {
            self.flush().await?;
        }
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
