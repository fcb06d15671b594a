//! Document service: upload, listing, the processing pipeline, and
//! cascading delete.
//!
//! [`DocumentService`] owns no storage itself. It is wired to a
//! [`DocumentCatalog`], an optional [`ChunkCatalog`], and a [`BlobStore`],
//! and serializes `process` and `delete` per document id with
//! [`DocumentLocks`].
//!
//! # Processing pipeline
//!
//! ```text
//! pending ──► processing ──► completed
//!                  │
//!                  └──────► failed
//! ```
//!
//! A failed run leaves whatever chunks were already written; the next
//! successful run deletes them before writing its own set.

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use doc_ingest_core::chunk::Chunker;
use doc_ingest_core::models::{ChunkList, Document, DocumentMetadata, DocumentPage, DocumentStatus};
use doc_ingest_core::store::{BlobStore, ChunkCatalog, DocumentCatalog};
use doc_ingest_core::{Error, Result};

use crate::locks::DocumentLocks;

/// Result of a successful `process` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessOutcome {
    pub document_id: String,
    pub chunk_count: u64,
}

/// What happened to one dependent resource during a delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "reason")]
pub enum CleanupStatus {
    Removed,
    NothingToRemove,
    /// The collaborator is not configured.
    Skipped,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    pub document_removed: bool,
    pub chunks: CleanupStatus,
    pub blob: CleanupStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    NotFound,
    Deleted(DeleteReport),
}

impl DeleteOutcome {
    /// `true` when the document row was removed.
    pub fn is_deleted(&self) -> bool {
        matches!(self, DeleteOutcome::Deleted(r) if r.document_removed)
    }
}

#[derive(Clone)]
pub struct DocumentService {
    documents: Arc<dyn DocumentCatalog>,
    chunks: Option<Arc<dyn ChunkCatalog>>,
    blobs: Arc<dyn BlobStore>,
    chunker: Chunker,
    locks: DocumentLocks,
}

impl DocumentService {
    /// A service without a chunk catalog. `process` and `get_chunks` fail
    /// with [`Error::Misconfigured`] until one is attached with
    /// [`with_chunk_catalog`](Self::with_chunk_catalog).
    pub fn new(
        documents: Arc<dyn DocumentCatalog>,
        blobs: Arc<dyn BlobStore>,
        chunker: Chunker,
    ) -> Self {
        Self {
            documents,
            chunks: None,
            blobs,
            chunker,
            locks: DocumentLocks::new(),
        }
    }

    pub fn with_chunk_catalog(mut self, chunks: Arc<dyn ChunkCatalog>) -> Self {
        self.chunks = Some(chunks);
        self
    }

    pub fn chunker(&self) -> &Chunker {
        &self.chunker
    }

    /// Store the bytes and register a new `pending` document.
    pub async fn upload(
        &self,
        filename: &str,
        bytes: &[u8],
        metadata: Option<DocumentMetadata>,
    ) -> Result<Document> {
        let filename = match filename.trim() {
            "" => "unnamed",
            name => name,
        };
        let blob_key = self.blobs.save(filename, bytes).await?;
        let document = Document::new_pending(filename, metadata);

        if let Err(err) = self.documents.create_document(&document, &blob_key).await {
            if let Err(cleanup) = self.blobs.delete(&blob_key).await {
                warn!(
                    "failed to remove blob {} after catalog error: {}",
                    blob_key, cleanup
                );
            }
            return Err(err);
        }

        info!(
            document_id = %document.id,
            filename = %document.filename,
            bytes = bytes.len(),
            "document uploaded"
        );
        Ok(document)
    }

    pub async fn get(&self, document_id: &str) -> Result<Option<Document>> {
        self.documents.get_document(document_id).await
    }

    /// One page of documents, newest first.
    pub async fn list(&self, limit: u32, offset: u32) -> Result<DocumentPage> {
        let (documents, total) = self.documents.list_documents(limit, offset).await?;
        Ok(DocumentPage { documents, total })
    }

    /// Chunk the document's stored bytes, replacing any previous chunk set.
    pub async fn process(&self, document_id: &str) -> Result<ProcessOutcome> {
        let _guard = self.locks.acquire(document_id).await;

        if self.documents.get_document(document_id).await?.is_none() {
            return Err(Error::not_found(format!("document {}", document_id)));
        }
        let chunks = self.chunk_catalog()?;

        info!(document_id, "processing started");
        let chunk_count = match self.run_pipeline(document_id, chunks).await {
            Ok(count) => count,
            Err(err) => {
                error!(document_id, error = %err, "processing failed");
                if let Err(mark_err) = self
                    .documents
                    .update_status(document_id, DocumentStatus::Failed)
                    .await
                {
                    warn!(
                        document_id,
                        error = %mark_err,
                        "could not record failed status"
                    );
                }
                return Err(err);
            }
        };

        self.documents
            .update_status(document_id, DocumentStatus::Completed)
            .await?;
        info!(document_id, chunk_count, "processing completed");

        Ok(ProcessOutcome {
            document_id: document_id.to_string(),
            chunk_count,
        })
    }

    async fn run_pipeline(&self, document_id: &str, chunks: &dyn ChunkCatalog) -> Result<u64> {
        self.documents
            .update_status(document_id, DocumentStatus::Processing)
            .await?;

        let blob_key = self
            .documents
            .blob_key(document_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("blob for document {}", document_id)))?;
        let bytes = self.blobs.read(&blob_key).await?;
        let text = String::from_utf8_lossy(&bytes);

        chunks.delete_chunks(document_id).await?;

        let produced = self.chunker.chunk(document_id, &text);
        for chunk in &produced {
            chunks.create_chunk(chunk).await?;
        }

        let count = produced.len() as u64;
        self.documents
            .update_chunk_count(document_id, count)
            .await?;
        Ok(count)
    }

    /// All chunks of a document in position order. Empty if the document
    /// was never processed.
    pub async fn get_chunks(&self, document_id: &str) -> Result<ChunkList> {
        if self.documents.get_document(document_id).await?.is_none() {
            return Err(Error::not_found(format!("document {}", document_id)));
        }
        let chunks = self.chunk_catalog()?;
        Ok(chunks.chunks_for_document(document_id).await?.into())
    }

    /// Remove a document with its chunks and blob.
    ///
    /// Chunk and blob cleanup are best-effort and reported, not raised.
    /// Only a failure to delete the document row itself is an error.
    pub async fn delete(&self, document_id: &str) -> Result<DeleteOutcome> {
        let _guard = self.locks.acquire(document_id).await;

        if self.documents.get_document(document_id).await?.is_none() {
            return Ok(DeleteOutcome::NotFound);
        }

        let chunks = match &self.chunks {
            None => CleanupStatus::Skipped,
            Some(catalog) => match catalog.delete_chunks(document_id).await {
                Ok(true) => CleanupStatus::Removed,
                Ok(false) => CleanupStatus::NothingToRemove,
                Err(err) => {
                    warn!(document_id, error = %err, "chunk cleanup failed");
                    CleanupStatus::Failed(err.to_string())
                }
            },
        };

        let blob = match self.documents.blob_key(document_id).await {
            Ok(Some(key)) => match self.blobs.delete(&key).await {
                Ok(()) => CleanupStatus::Removed,
                Err(err) => {
                    warn!(document_id, blob_key = %key, error = %err, "blob cleanup failed");
                    CleanupStatus::Failed(err.to_string())
                }
            },
            Ok(None) => CleanupStatus::NothingToRemove,
            Err(err) => {
                warn!(document_id, error = %err, "blob key lookup failed");
                CleanupStatus::Failed(err.to_string())
            }
        };

        let document_removed = self.documents.delete_document(document_id).await?;
        info!(document_id, document_removed, "document deleted");

        Ok(DeleteOutcome::Deleted(DeleteReport {
            document_removed,
            chunks,
            blob,
        }))
    }

    fn chunk_catalog(&self) -> Result<&dyn ChunkCatalog> {
        self.chunks
            .as_deref()
            .ok_or_else(|| Error::misconfigured("no chunk catalog configured"))
    }
}
