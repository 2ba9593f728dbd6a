//! Local key/value string storage used for snapshot persistence

use crate::error::{CacheError, CacheResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::fs;
use tracing::debug;

/// Persistent string store keyed by name
#[async_trait]
pub trait Storage: Send + Sync {
    /// Read a value, `None` if the key was never written
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Write a value, replacing any previous one
    async fn set(&self, key: &str, value: &str) -> CacheResult<()>;

    /// Remove a value if present
    async fn remove(&self, key: &str) -> CacheResult<()>;
}

/// File-backed storage, one `<key>.json` file per key
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Create storage rooted at `dir`, creating it if needed
    pub async fn new(dir: impl Into<PathBuf>) -> CacheResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| CacheError::io(format!("creating storage dir {}", dir.display()), e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o700);
            std::fs::set_permissions(&dir, perms)
                .map_err(|e| CacheError::io("setting storage dir permissions", e))?;
        }

        Ok(Self { dir })
    }

    /// File backing a key
    pub fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let path = self.key_path(key);

        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| CacheError::io(format!("reading storage file {}", path.display()), e))?;

        Ok(Some(content))
    }

    async fn set(&self, key: &str, value: &str) -> CacheResult<()> {
        let path = self.key_path(key);

        fs::write(&path, value)
            .await
            .map_err(|e| CacheError::io(format!("writing storage file {}", path.display()), e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&path, perms)
                .map_err(|e| CacheError::io("setting storage file permissions", e))?;
        }

        debug!("Stored {} ({} bytes)", key, value.len());
        Ok(())
    }

    async fn remove(&self, key: &str) -> CacheResult<()> {
        let path = self.key_path(key);
        if path.exists() {
            fs::remove_file(&path).await.map_err(|e| {
                CacheError::io(format!("removing storage file {}", path.display()), e)
            })?;
        }
        Ok(())
    }
}

/// In-process storage, mostly for tests and ephemeral stores
#[derive(Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> CacheResult<()> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> CacheResult<()> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.remove(key);
        Ok(())
    }
}
