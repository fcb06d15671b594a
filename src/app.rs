//! Wiring: build a [`DocumentService`] backed by SQLite and the filesystem.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::blob::FsBlobStore;
use crate::config::Config;
use crate::service::DocumentService;
use crate::sqlite_store::SqliteCatalog;
use crate::{db, migrate};

/// Connect to the catalog (creating the schema if needed), open the blob
/// directory, and return a fully configured service.
pub async fn open_service(config: &Config) -> Result<DocumentService> {
    let pool = db::connect(config)
        .await
        .with_context(|| format!("Failed to open database {}", config.db.path.display()))?;
    migrate::apply_schema(&pool).await?;

    let blobs = FsBlobStore::open(&config.storage.documents_dir).await?;
    let chunker = config.chunking.chunker()?;

    let catalog = Arc::new(SqliteCatalog::new(pool));
    Ok(DocumentService::new(catalog.clone(), Arc::new(blobs), chunker).with_chunk_catalog(catalog))
}
