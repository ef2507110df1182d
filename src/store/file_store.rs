use std::collections::{BTreeMap, HashMap};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::TokenStore;

type Document = BTreeMap<String, String>;

static PATH_LOCKS: OnceLock<std::sync::Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();

/// The lock shared by every `FileStore` in this process that points at `path`.
fn lock_for(path: &Path) -> Arc<Mutex<()>> {
    let key = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    let mut locks = PATH_LOCKS
        .get_or_init(|| std::sync::Mutex::new(HashMap::new()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    locks.entry(key).or_default().clone()
}

/// A store backed by a small JSON document on disk (`{"userToken": "..."}`),
/// so the session survives restarts of the process.
///
/// Several stores may share one document under different keys. Writes go to a
/// uniquely named sibling temp file that is then renamed over the document.
pub struct FileStore {
    path: PathBuf,
    key: String,
    // Serializes read-modify-write cycles on this path within this process.
    lock: Arc<Mutex<()>>,
}

impl FileStore {
    pub fn new(path: impl AsRef<Path>, key: &str) -> Self {
        FileStore {
            path: path.as_ref().to_path_buf(),
            key: key.to_string(),
            lock: lock_for(path.as_ref()),
        }
    }

    async fn read_document(&self) -> Result<Document, String> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(Document::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                format!(
                    "Token file '{}' is not a JSON object: {}",
                    self.path.display(),
                    e
                )
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Document::new()),
            Err(e) => Err(format!(
                "Failed to read token file '{}': {}",
                self.path.display(),
                e
            )),
        }
    }

    async fn write_document(&self, document: &Document) -> Result<(), String> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| format!("Failed to create '{}': {}", dir.display(), e))?;

        let serialized = serde_json::to_vec_pretty(document)
            .map_err(|e| format!("Failed to serialize token document: {}", e))?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || -> Result<(), String> {
            let mut tmp = NamedTempFile::new_in(&dir)
                .map_err(|e| format!("Failed to create temp file in '{}': {}", dir.display(), e))?;
            tmp.write_all(&serialized)
                .map_err(|e| format!("Failed to write '{}': {}", tmp.path().display(), e))?;
            tmp.persist(&path)
                .map(|_| ())
                .map_err(|e| format!("Failed to replace '{}': {}", path.display(), e))
        })
        .await
        .map_err(|e| format!("Token file write did not complete: {}", e))?
    }
}

#[async_trait]
impl TokenStore for FileStore {
    async fn get_token(&self) -> Result<Option<String>, String> {
        let _guard = self.lock.lock().await;
        Ok(self.read_document().await?.remove(&self.key))
    }

    async fn set_token(&self, token: &str) -> Result<(), String> {
        let _guard = self.lock.lock().await;
        let mut document = self.read_document().await?;
        document.insert(self.key.clone(), token.to_string());
        self.write_document(&document).await?;
        debug!("Stored access token in '{}'", self.path.display());
        Ok(())
    }

    async fn remove_token(&self) -> Result<(), String> {
        let _guard = self.lock.lock().await;
        let document = match self.read_document().await {
            Ok(mut document) => {
                if document.remove(&self.key).is_none() {
                    return Ok(());
                }
                document
            }
            Err(e) => {
                // An unreadable document cannot hold a usable token; start over.
                warn!("{}; discarding it", e);
                Document::new()
            }
        };
        self.write_document(&document).await
    }

    fn describe(&self) -> String {
        format!("file '{}' (key '{}')", self.path.display(), self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_token_survives_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        FileStore::new(&path, "userToken")
            .set_token("T1")
            .await
            .unwrap();

        let reopened = FileStore::new(&path, "userToken");
        assert_eq!(reopened.get_token().await.unwrap().as_deref(), Some("T1"));
    }

    #[tokio::test]
    async fn test_missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("absent.json"), "userToken");
        assert_eq!(store.get_token().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_remove_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");
        let user = FileStore::new(&path, "userToken");
        let locale = FileStore::new(&path, "locale");

        user.set_token("T1").await.unwrap();
        locale.set_token("en-GB").await.unwrap();
        user.remove_token().await.unwrap();

        assert_eq!(user.get_token().await.unwrap(), None);
        assert_eq!(locale.get_token().await.unwrap().as_deref(), Some("en-GB"));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error_until_cleared() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();
        let store = FileStore::new(&path, "userToken");

        assert!(store.get_token().await.is_err());
        store.remove_token().await.unwrap();
        assert_eq!(store.get_token().await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_on_one_file_keep_both_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let user = Arc::new(FileStore::new(&path, "userToken"));
        let locale = Arc::new(FileStore::new(&path, "locale"));

        for round in 0..50 {
            let (u, l) = {
                let user = user.clone();
                let locale = locale.clone();
                let token = format!("T{}", round);
                let lang = format!("lang-{}", round);
                tokio::join!(
                    tokio::spawn(async move { user.set_token(&token).await }),
                    tokio::spawn(async move { locale.set_token(&lang).await }),
                )
            };
            u.unwrap().unwrap();
            l.unwrap().unwrap();

            assert_eq!(
                user.get_token().await.unwrap(),
                Some(format!("T{}", round))
            );
            assert_eq!(
                locale.get_token().await.unwrap(),
                Some(format!("lang-{}", round))
            );
        }
    }
}
