use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::{file_store::FileStore, memory_store::MemoryStore};
use crate::config::StorageConfig;

/// The TokenStore trait abstracts where the access token is kept (read, write, delete).
/// Each store holds exactly one token under the key it was created with.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get_token(&self) -> Result<Option<String>, String>;
    async fn set_token(&self, token: &str) -> Result<(), String>;
    async fn remove_token(&self) -> Result<(), String>;
    fn describe(&self) -> String;
}

/// Creates a concrete store implementation based on the StorageConfig.
pub fn create_store(config: &StorageConfig) -> Arc<dyn TokenStore> {
    let key = config.key();
    let store: Arc<dyn TokenStore> = match config {
        StorageConfig::Memory { .. } => Arc::new(MemoryStore::new(key)),
        StorageConfig::File { path, .. } => Arc::new(FileStore::new(path, key)),
    };
    info!("Using token store: {}", store.describe());
    store
}
