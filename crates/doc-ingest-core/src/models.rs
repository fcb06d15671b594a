//! Core data models: documents, chunks, and their metadata.
//!
//! These types are what the catalog persists and what the HTTP layer
//! serializes. The blob storage key of a document is deliberately not part
//! of [`Document`]; it is looked up through the catalog.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

/// Processing state of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Pending => "pending",
            DocumentStatus::Processing => "processing",
            DocumentStatus::Completed => "completed",
            DocumentStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DocumentStatus::Pending),
            "processing" => Ok(DocumentStatus::Processing),
            "completed" => Ok(DocumentStatus::Completed),
            "failed" => Ok(DocumentStatus::Failed),
            other => Err(Error::unexpected(format!(
                "unknown document status: '{}'",
                other
            ))),
        }
    }
}

/// Optional user-supplied metadata attached at upload time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl DocumentMetadata {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.tags.is_none()
    }
}

/// An uploaded document as recorded in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub filename: String,
    pub status: DocumentStatus,
    pub metadata: Option<DocumentMetadata>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Cached number of chunk rows; 0 until the first successful processing.
    pub chunk_count: u64,
}

impl Document {
    /// A fresh `pending` document with a generated id and no chunks.
    pub fn new_pending(filename: impl Into<String>, metadata: Option<DocumentMetadata>) -> Self {
        let now = now_millis();
        Self {
            id: new_document_id(),
            filename: filename.into(),
            status: DocumentStatus::Pending,
            metadata: metadata.filter(|m| !m.is_empty()),
            created_at: now,
            updated_at: now,
            chunk_count: 0,
        }
    }
}

/// Current time truncated to whole milliseconds, the precision timestamps
/// are persisted with.
pub fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

/// Optional per-chunk metadata. The basic chunker never fills it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub section: Option<String>,
}

/// A contiguous slice of a document's decoded text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub content: String,
    /// Zero-based, contiguous per document.
    pub position: u32,
    pub metadata: Option<ChunkMetadata>,
}

/// One page of a document listing plus the overall document count.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentPage {
    pub documents: Vec<Document>,
    pub total: u64,
}

/// All chunks of a document, ordered by position.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkList {
    pub chunks: Vec<Chunk>,
    pub total: usize,
}

impl From<Vec<Chunk>> for ChunkList {
    fn from(chunks: Vec<Chunk>) -> Self {
        let total = chunks.len();
        Self { chunks, total }
    }
}

/// Generate a document id of the form `doc_<12 hex chars>`.
pub fn new_document_id() -> String {
    format!("doc_{}", short_hex())
}

/// Generate a chunk id of the form `chunk_<12 hex chars>`.
pub fn new_chunk_id() -> String {
    format!("chunk_{}", short_hex())
}

fn short_hex() -> String {
    let mut hex = Uuid::new_v4().simple().to_string();
    hex.truncate(12);
    hex
}
