use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::StorageError;

pub const TOKEN_KEY: &str = "token";
pub const FCM_TOKEN_KEY: &str = "fcm_token";

/// Small persistent string map (auth token, device token, ...).
///
/// File-backed stores write atomically through `<file>.json.tmp`; on load a
/// corrupted main file falls back to the temp copy.
#[derive(Debug, Clone)]
pub struct KeyValueStore {
    inner: Arc<RwLock<BTreeMap<String, String>>>,
    path: Option<PathBuf>,
}

impl KeyValueStore {
    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(RwLock::new(BTreeMap::new())),
            path: None,
        }
    }

    pub async fn load_from(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let data = read_with_tmp_fallback(&path).await;
        Self {
            inner: Arc::new(RwLock::new(data)),
            path: Some(path),
        }
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        self.inner.read().await.get(key).cloned()
    }

    pub async fn set(&self, key: &str, value: impl Into<String>) -> Result<(), StorageError> {
        let mut inner = self.inner.write().await;
        inner.insert(key.to_owned(), value.into());
        self.persist(&inner).await
    }

    pub async fn remove(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut inner = self.inner.write().await;
        let removed = inner.remove(key);
        if removed.is_some() {
            self.persist(&inner).await?;
        }
        Ok(removed)
    }

    pub async fn token(&self) -> Option<String> {
        self.get(TOKEN_KEY).await.filter(|t| !t.is_empty())
    }

    /// Logout: drop every stored credential.
    pub async fn clear(&self) -> Result<(), StorageError> {
        let mut inner = self.inner.write().await;
        inner.clear();
        self.persist(&inner).await
    }

    // Callers hold the write lock, so only one writer touches the tmp file.
    async fn persist(&self, data: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let Some(path) = &self.path else {
            debug!("key-value store is in-memory only; skipping persist");
            return Ok(());
        };
        let bytes = serde_json::to_vec_pretty(data)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

async fn read_with_tmp_fallback(path: &Path) -> BTreeMap<String, String> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(_) => return BTreeMap::new(),
    };
    match serde_json::from_slice(&bytes) {
        Ok(map) => map,
        Err(e) => {
            warn!(error = %e, path = %path.display(), "failed to parse store, trying tmp fallback");
            let tmp = path.with_extension("json.tmp");
            match tokio::fs::read(&tmp).await {
                Ok(tmp_bytes) => serde_json::from_slice(&tmp_bytes).unwrap_or_default(),
                Err(_) => BTreeMap::new(),
            }
        }
    }
}
