//! In-memory collaborators for tests and embedding.
//!
//! [`InMemoryCatalog`] implements both [`DocumentCatalog`] and
//! [`ChunkCatalog`] with the same ordering semantics as the SQLite catalog.
//! [`InMemoryBlobStore`] keeps blobs in a `HashMap`. Both use
//! `std::sync::RwLock` and never hold a lock across an await point.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::{now_millis, Chunk, Document, DocumentStatus};

use super::{new_blob_key, BlobStore, ChunkCatalog, DocumentCatalog};

struct StoredDoc {
    doc: Document,
    blob_key: String,
    /// Insertion sequence, breaks ties between equal `created_at`.
    seq: u64,
}

#[derive(Default)]
struct CatalogState {
    docs: HashMap<String, StoredDoc>,
    chunks: Vec<Chunk>,
    next_seq: u64,
}

/// In-memory document and chunk catalog.
#[derive(Default)]
pub struct InMemoryCatalog {
    state: RwLock<CatalogState>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of chunk rows currently stored for `document_id`.
    pub fn chunk_rows(&self, document_id: &str) -> usize {
        self.read()
            .map(|s| {
                s.chunks
                    .iter()
                    .filter(|c| c.document_id == document_id)
                    .count()
            })
            .unwrap_or(0)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, CatalogState>> {
        self.state
            .read()
            .map_err(|_| Error::unexpected("in-memory catalog lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, CatalogState>> {
        self.state
            .write()
            .map_err(|_| Error::unexpected("in-memory catalog lock poisoned"))
    }
}

#[async_trait]
impl DocumentCatalog for InMemoryCatalog {
    async fn create_document(&self, document: &Document, blob_key: &str) -> Result<()> {
        let mut state = self.write()?;
        if state.docs.contains_key(&document.id) {
            return Err(Error::unexpected(format!(
                "document already exists: {}",
                document.id
            )));
        }
        let seq = state.next_seq;
        state.next_seq += 1;
        state.docs.insert(
            document.id.clone(),
            StoredDoc {
                doc: document.clone(),
                blob_key: blob_key.to_string(),
                seq,
            },
        );
        Ok(())
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        Ok(self.read()?.docs.get(id).map(|s| s.doc.clone()))
    }

    async fn list_documents(&self, limit: u32, offset: u32) -> Result<(Vec<Document>, u64)> {
        let state = self.read()?;
        let mut stored: Vec<&StoredDoc> = state.docs.values().collect();
        stored.sort_by(|a, b| {
            b.doc
                .created_at
                .cmp(&a.doc.created_at)
                .then(b.seq.cmp(&a.seq))
        });
        let page = stored
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|s| s.doc.clone())
            .collect();
        Ok((page, state.docs.len() as u64))
    }

    async fn delete_document(&self, id: &str) -> Result<bool> {
        let mut state = self.write()?;
        let removed = state.docs.remove(id).is_some();
        if removed {
            // Mirrors the ON DELETE CASCADE of the SQLite schema.
            state.chunks.retain(|c| c.document_id != id);
        }
        Ok(removed)
    }

    async fn update_status(&self, id: &str, status: DocumentStatus) -> Result<()> {
        if let Some(stored) = self.write()?.docs.get_mut(id) {
            stored.doc.status = status;
            stored.doc.updated_at = now_millis();
        }
        Ok(())
    }

    async fn update_chunk_count(&self, id: &str, count: u64) -> Result<()> {
        if let Some(stored) = self.write()?.docs.get_mut(id) {
            stored.doc.chunk_count = count;
            stored.doc.updated_at = now_millis();
        }
        Ok(())
    }

    async fn blob_key(&self, id: &str) -> Result<Option<String>> {
        Ok(self.read()?.docs.get(id).map(|s| s.blob_key.clone()))
    }
}

#[async_trait]
impl ChunkCatalog for InMemoryCatalog {
    async fn create_chunk(&self, chunk: &Chunk) -> Result<()> {
        let mut state = self.write()?;
        if !state.docs.contains_key(&chunk.document_id) {
            return Err(Error::unexpected(format!(
                "chunk {} references unknown document {}",
                chunk.id, chunk.document_id
            )));
        }
        if state.chunks.iter().any(|c| {
            c.id == chunk.id
                || (c.document_id == chunk.document_id && c.position == chunk.position)
        }) {
            return Err(Error::unexpected(format!(
                "duplicate chunk {} at position {}",
                chunk.id, chunk.position
            )));
        }
        state.chunks.push(chunk.clone());
        Ok(())
    }

    async fn chunks_for_document(&self, document_id: &str) -> Result<Vec<Chunk>> {
        let mut chunks: Vec<Chunk> = self
            .read()?
            .chunks
            .iter()
            .filter(|c| c.document_id == document_id)
            .cloned()
            .collect();
        chunks.sort_by_key(|c| c.position);
        Ok(chunks)
    }

    async fn delete_chunks(&self, document_id: &str) -> Result<bool> {
        let mut state = self.write()?;
        let before = state.chunks.len();
        state.chunks.retain(|c| c.document_id != document_id);
        Ok(state.chunks.len() < before)
    }
}

/// In-memory blob store.
#[derive(Default)]
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.blobs
            .read()
            .map(|b| b.contains_key(key))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.blobs.read().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn save(&self, original_filename: &str, bytes: &[u8]) -> Result<String> {
        let key = new_blob_key(original_filename);
        self.blobs
            .write()
            .map_err(|_| Error::storage("in-memory blob store lock poisoned"))?
            .insert(key.clone(), bytes.to_vec());
        Ok(key)
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>> {
        self.blobs
            .read()
            .map_err(|_| Error::storage("in-memory blob store lock poisoned"))?
            .get(key)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("blob {}", key)))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.blobs
            .write()
            .map_err(|_| Error::storage("in-memory blob store lock poisoned"))?
            .remove(key);
        Ok(())
    }
}
