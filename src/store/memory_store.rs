use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::TokenStore;

/// A process-lifetime store. Clones share the same underlying map, so several
/// stores with different keys can sit on one map like keys in browser storage.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    key: String,
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new(key: &str) -> Self {
        MemoryStore {
            key: key.to_string(),
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// A store for `key` sharing this store's map.
    pub fn with_key(&self, key: &str) -> Self {
        MemoryStore {
            key: key.to_string(),
            entries: self.entries.clone(),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(&crate::config::default_token_key())
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn get_token(&self) -> Result<Option<String>, String> {
        Ok(self.entries.read().await.get(&self.key).cloned())
    }

    async fn set_token(&self, token: &str) -> Result<(), String> {
        self.entries
            .write()
            .await
            .insert(self.key.clone(), token.to_string());
        Ok(())
    }

    async fn remove_token(&self) -> Result<(), String> {
        self.entries.write().await.remove(&self.key);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("memory (key '{}')", self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_remove() {
        let store = MemoryStore::new("userToken");
        assert_eq!(store.get_token().await.unwrap(), None);

        store.set_token("T1").await.unwrap();
        assert_eq!(store.get_token().await.unwrap().as_deref(), Some("T1"));

        store.set_token("T2").await.unwrap();
        assert_eq!(store.get_token().await.unwrap().as_deref(), Some("T2"));

        store.remove_token().await.unwrap();
        assert_eq!(store.get_token().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_keys_do_not_collide() {
        let store = MemoryStore::new("userToken");
        let other = store.with_key("adminToken");

        store.set_token("user").await.unwrap();
        other.set_token("admin").await.unwrap();
        other.remove_token().await.unwrap();

        assert_eq!(store.get_token().await.unwrap().as_deref(), Some("user"));
        assert_eq!(other.get_token().await.unwrap(), None);
    }
}
