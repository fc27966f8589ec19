//! Selects the local store implementation from configuration.

use std::sync::Arc;

use tracing::info;

use vocab_core::config::storage::StorageConfig;
use vocab_core::error::AppError;
use vocab_core::result::AppResult;
use vocab_core::traits::LocalStore;

use crate::local::{FileLocalStore, MemoryLocalStore};

/// Open the local store named by `config.provider`.
pub async fn open_local_store(config: &StorageConfig) -> AppResult<Arc<dyn LocalStore>> {
    let store: Arc<dyn LocalStore> = match config.provider.as_str() {
        "memory" => {
            info!("Initializing in-memory local store");
            Arc::new(MemoryLocalStore::new())
        }
        "file" => {
            info!(path = %config.path, "Initializing file-backed local store");
            Arc::new(FileLocalStore::open(&config.path).await?)
        }
        other => {
            return Err(AppError::configuration(format!(
                "Unknown storage provider: '{other}'. Supported: memory, file"
            )));
        }
    };

    Ok(store)
}
