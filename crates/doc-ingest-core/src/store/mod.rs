//! Collaborator contracts for the processing coordinator.
//!
//! The coordinator never talks to SQLite or the filesystem directly. It is
//! written against three narrow traits:
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`DocumentCatalog`] | Document rows: create, read, list, delete, status and chunk-count updates, blob key lookup |
//! | [`ChunkCatalog`] | Chunk rows keyed by document: create, list by position, bulk delete |
//! | [`BlobStore`] | Raw uploaded bytes keyed by an opaque storage key |
//!
//! Implementations must be `Send + Sync` and provide per-call atomicity; no
//! multi-call transaction is assumed. [`memory`] contains in-memory
//! implementations of all three.

pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Chunk, Document, DocumentStatus};

/// Relational record store for documents.
#[async_trait]
pub trait DocumentCatalog: Send + Sync {
    /// Insert a new document together with the key of its stored blob.
    async fn create_document(&self, document: &Document, blob_key: &str) -> Result<()>;

    async fn get_document(&self, id: &str) -> Result<Option<Document>>;

    /// One page of documents, newest first, plus the total document count.
    async fn list_documents(&self, limit: u32, offset: u32) -> Result<(Vec<Document>, u64)>;

    /// Returns `true` if a row was removed.
    async fn delete_document(&self, id: &str) -> Result<bool>;

    /// Set the status and refresh `updated_at`.
    async fn update_status(&self, id: &str, status: DocumentStatus) -> Result<()>;

    /// Set the cached chunk count and refresh `updated_at`.
    async fn update_chunk_count(&self, id: &str, count: u64) -> Result<()>;

    /// Storage key of the document's blob, if the document exists.
    async fn blob_key(&self, id: &str) -> Result<Option<String>>;
}

/// Relational record store for chunks.
#[async_trait]
pub trait ChunkCatalog: Send + Sync {
    async fn create_chunk(&self, chunk: &Chunk) -> Result<()>;

    /// All chunks of a document in ascending position order.
    async fn chunks_for_document(&self, document_id: &str) -> Result<Vec<Chunk>>;

    /// Remove every chunk of a document. Returns `true` iff at least one row
    /// was removed.
    async fn delete_chunks(&self, document_id: &str) -> Result<bool>;
}

/// Keyed byte storage for uploaded file bodies.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` and return a new collision-resistant key derived from
    /// `original_filename`.
    async fn save(&self, original_filename: &str, bytes: &[u8]) -> Result<String>;

    /// Fails with [`Error::NotFound`](crate::Error::NotFound) if the key is
    /// absent.
    async fn read(&self, key: &str) -> Result<Vec<u8>>;

    /// Removing an absent key is a no-op.
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Reduce an uploaded filename to a safe final path component.
///
/// Directory parts are dropped (both `/` and `\` separators) and an empty
/// or dot-only result becomes `unnamed`.
pub fn sanitize_filename(original: &str) -> String {
    let base = original
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .trim();
    if base.is_empty() || base.chars().all(|c| c == '.') {
        "unnamed".to_string()
    } else {
        base.to_string()
    }
}

/// Build a storage key of the form `<uuid v4>_<sanitized filename>`.
pub fn new_blob_key(original_filename: &str) -> String {
    format!(
        "{}_{}",
        uuid::Uuid::new_v4(),
        sanitize_filename(original_filename)
    )
}
