//! Filesystem [`BlobStore`]: one file per upload under a flat directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use doc_ingest_core::store::{new_blob_key, BlobStore};
use doc_ingest_core::{Error, Result};

/// Stores each blob as `<documents_dir>/<key>`.
///
/// Keys are produced by [`new_blob_key`]; on read and delete any key that
/// could escape the directory is rejected.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the storage directory if needed and return the store.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let store = Self::new(root);
        tokio::fs::create_dir_all(&store.root).await.map_err(|e| {
            Error::storage(format!(
                "cannot create storage directory {}: {}",
                store.root.display(),
                e
            ))
        })?;
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key == "." || key == ".." || key.contains(['/', '\\']) {
            return Err(Error::storage(format!("invalid storage key: {}", key)));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn save(&self, original_filename: &str, bytes: &[u8]) -> Result<String> {
        let key = new_blob_key(original_filename);
        let path = self.path_for(&key)?;
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| Error::storage(format!("{}: {}", self.root.display(), e)))?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| Error::storage(format!("write {}: {}", path.display(), e)))?;
        Ok(key)
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(Error::not_found(format!("blob {}", key)))
            }
            Err(e) => Err(Error::storage(format!("read {}: {}", path.display(), e))),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::storage(format!("delete {}: {}", path.display(), e))),
        }
    }
}
