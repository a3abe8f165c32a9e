//! Local filesystem object store.
//!
//! Objects are content-addressed and fanned out by the first two
//! characters of the key: `<root>/ab/abcdef…`.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use treevault_core::error::{AppError, ErrorKind};
use treevault_core::result::AppResult;
use treevault_core::traits::ObjectStore;

use super::validate_key;

/// Object store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    /// Create the store, creating the root directory if needed.
    pub async fn new(root_path: &str) -> AppResult<Self> {
        let root = PathBuf::from(root_path);
        fs::create_dir_all(&root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create storage root: {}", root.display()),
                e,
            )
        })?;
        Ok(Self { root })
    }

    /// On-disk location of an object.
    pub fn object_path(&self, key: &str) -> AppResult<PathBuf> {
        validate_key(key)?;
        let shard = key.get(..2).unwrap_or(key);
        Ok(self.root.join(shard).join(key))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    fn provider_type(&self) -> &str {
        "local"
    }

    async fn delete_object(&self, key: &str) -> AppResult<()> {
        let path = self.object_path(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(key, "Deleted object");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(key, "Object already absent");
                Ok(())
            }
            Err(e) => Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to delete object {key}"),
                e,
            )),
        }
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(fs::metadata(&self.root)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false))
    }
}
