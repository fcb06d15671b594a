//! SQLite-backed [`DocumentCatalog`] and [`ChunkCatalog`].
//!
//! Each trait method is one statement against the schema created by
//! [`crate::migrate`]. Deleting a document relies on `ON DELETE CASCADE`
//! to drop its chunks, so the pool must have foreign keys enabled
//! (see [`crate::db::connect`]).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use doc_ingest_core::models::{Chunk, ChunkMetadata, Document, DocumentMetadata, DocumentStatus};
use doc_ingest_core::store::{ChunkCatalog, DocumentCatalog};
use doc_ingest_core::{Error, Result};

/// SQLite implementation of both catalog traits.
#[derive(Clone)]
pub struct SqliteCatalog {
    pool: SqlitePool,
}

impl SqliteCatalog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn db_err(err: sqlx::Error) -> Error {
    Error::unexpected(format!("database: {}", err))
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| Error::unexpected(format!("timestamp out of range: {}", ms)))
}

fn document_from_row(row: &SqliteRow) -> Result<Document> {
    let status: String = row.try_get("status").map_err(db_err)?;
    let title: Option<String> = row.try_get("metadata_title").map_err(db_err)?;
    let description: Option<String> = row.try_get("metadata_description").map_err(db_err)?;
    let tags_json: Option<String> = row.try_get("metadata_tags").map_err(db_err)?;
    let tags = match tags_json {
        Some(json) => Some(serde_json::from_str::<Vec<String>>(&json)?),
        None => None,
    };
    let metadata = DocumentMetadata {
        title,
        description,
        tags,
    };
    let chunk_count: i64 = row.try_get("chunk_count").map_err(db_err)?;

    Ok(Document {
        id: row.try_get("id").map_err(db_err)?,
        filename: row.try_get("filename").map_err(db_err)?,
        status: status.parse::<DocumentStatus>()?,
        metadata: (!metadata.is_empty()).then_some(metadata),
        created_at: from_millis(row.try_get("created_at").map_err(db_err)?)?,
        updated_at: from_millis(row.try_get("updated_at").map_err(db_err)?)?,
        chunk_count: chunk_count.max(0) as u64,
    })
}

fn chunk_from_row(row: &SqliteRow) -> Result<Chunk> {
    let page: Option<i64> = row.try_get("metadata_page").map_err(db_err)?;
    let section: Option<String> = row.try_get("metadata_section").map_err(db_err)?;
    let position: i64 = row.try_get("position").map_err(db_err)?;

    Ok(Chunk {
        id: row.try_get("id").map_err(db_err)?,
        document_id: row.try_get("document_id").map_err(db_err)?,
        content: row.try_get("content").map_err(db_err)?,
        position: u32::try_from(position)
            .map_err(|_| Error::unexpected(format!("invalid chunk position: {}", position)))?,
        metadata: (page.is_some() || section.is_some())
            .then_some(ChunkMetadata { page, section }),
    })
}

const DOCUMENT_COLUMNS: &str = "id, filename, status, metadata_title, metadata_description, \
     metadata_tags, created_at, updated_at, chunk_count";

#[async_trait]
impl DocumentCatalog for SqliteCatalog {
    async fn create_document(&self, document: &Document, blob_key: &str) -> Result<()> {
        let meta = document.metadata.clone().unwrap_or_default();
        let tags_json = match &meta.tags {
            Some(tags) => Some(serde_json::to_string(tags)?),
            None => None,
        };

        sqlx::query(
            r#"
            INSERT INTO documents (id, filename, storage_path, status, metadata_title,
                                   metadata_description, metadata_tags, created_at,
                                   updated_at, chunk_count)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&document.id)
        .bind(&document.filename)
        .bind(blob_key)
        .bind(document.status.as_str())
        .bind(&meta.title)
        .bind(&meta.description)
        .bind(&tags_json)
        .bind(document.created_at.timestamp_millis())
        .bind(document.updated_at.timestamp_millis())
        .bind(document.chunk_count as i64)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM documents WHERE id = ?",
            DOCUMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(document_from_row).transpose()
    }

    async fn list_documents(&self, limit: u32, offset: u32) -> Result<(Vec<Document>, u64)> {
        let total: i64 = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

        let rows = sqlx::query(&format!(
            "SELECT {} FROM documents ORDER BY created_at DESC, rowid DESC LIMIT ? OFFSET ?",
            DOCUMENT_COLUMNS
        ))
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let documents = rows
            .iter()
            .map(document_from_row)
            .collect::<Result<Vec<_>>>()?;
        Ok((documents, total.max(0) as u64))
    }

    async fn delete_document(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_status(&self, id: &str, status: DocumentStatus) -> Result<()> {
        sqlx::query("UPDATE documents SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(Utc::now().timestamp_millis())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn update_chunk_count(&self, id: &str, count: u64) -> Result<()> {
        let count = i64::try_from(count)
            .map_err(|_| Error::unexpected(format!("chunk count too large: {}", count)))?;
        sqlx::query("UPDATE documents SET chunk_count = ?, updated_at = ? WHERE id = ?")
            .bind(count)
            .bind(Utc::now().timestamp_millis())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn blob_key(&self, id: &str) -> Result<Option<String>> {
        sqlx::query_scalar::<_, String>("SELECT storage_path FROM documents WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }
}

#[async_trait]
impl ChunkCatalog for SqliteCatalog {
    async fn create_chunk(&self, chunk: &Chunk) -> Result<()> {
        let meta = chunk.metadata.clone().unwrap_or_default();
        sqlx::query(
            r#"
            INSERT INTO chunks (id, document_id, content, position, metadata_page,
                                metadata_section, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&chunk.id)
        .bind(&chunk.document_id)
        .bind(&chunk.content)
        .bind(i64::from(chunk.position))
        .bind(meta.page)
        .bind(&meta.section)
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn chunks_for_document(&self, document_id: &str) -> Result<Vec<Chunk>> {
        let rows = sqlx::query(
            r#"
            SELECT id, document_id, content, position, metadata_page, metadata_section
            FROM chunks
            WHERE document_id = ?
            ORDER BY position ASC
            "#,
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(chunk_from_row).collect()
    }

    async fn delete_chunks(&self, document_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM chunks WHERE document_id = ?")
            .bind(document_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::{db, migrate};
    use chrono::Duration;
    use doc_ingest_core::chunk::Chunker;

    async fn setup() -> (tempfile::TempDir, SqliteCatalog) {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = Config::from_env();
        config.db.path = tmp.path().join("data").join("catalog.sqlite");
        config.storage.documents_dir = tmp.path().join("docs");
        let pool = db::connect(&config).await.unwrap();
        migrate::apply_schema(&pool).await.unwrap();
        (tmp, SqliteCatalog::new(pool))
    }

    #[tokio::test]
    async fn test_document_roundtrip_with_metadata() {
        let (_tmp, catalog) = setup().await;
        let meta = DocumentMetadata {
            title: Some("Quarterly".into()),
            description: None,
            tags: Some(vec!["finance".into(), "q3".into()]),
        };
        let doc = Document::new_pending("report.txt", Some(meta.clone()));
        catalog.create_document(&doc, "abc_report.txt").await.unwrap();

        let stored = catalog.get_document(&doc.id).await.unwrap().unwrap();
        assert_eq!(stored.id, doc.id);
        assert_eq!(stored.filename, "report.txt");
        assert_eq!(stored.status, DocumentStatus::Pending);
        assert_eq!(stored.metadata, Some(meta));
        assert_eq!(
            stored.created_at.timestamp_millis(),
            doc.created_at.timestamp_millis()
        );
        assert_eq!(
            catalog.blob_key(&doc.id).await.unwrap().as_deref(),
            Some("abc_report.txt")
        );
        assert!(catalog.get_document("doc_nope").await.unwrap().is_none());
        assert!(catalog.blob_key("doc_nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_ordering_and_total() {
        let (_tmp, catalog) = setup().await;
        let base = Utc::now();
        let mut ids = Vec::new();
        for i in 0..3 {
            let mut doc = Document::new_pending(format!("f{}.txt", i), None);
            doc.created_at = base + Duration::seconds(i);
            doc.updated_at = doc.created_at;
            catalog.create_document(&doc, "k").await.unwrap();
            ids.push(doc.id);
        }
        // Same timestamp as the newest one; inserted later, so listed first.
        let mut tie = Document::new_pending("tie.txt", None);
        tie.created_at = base + Duration::seconds(2);
        tie.updated_at = tie.created_at;
        catalog.create_document(&tie, "k").await.unwrap();

        let (page, total) = catalog.list_documents(3, 0).await.unwrap();
        assert_eq!(total, 4);
        let got: Vec<&str> = page.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(got, vec![tie.id.as_str(), ids[2].as_str(), ids[1].as_str()]);

        let (page, total) = catalog.list_documents(3, 3).await.unwrap();
        assert_eq!(total, 4);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, ids[0]);
    }

    #[tokio::test]
    async fn test_chunks_and_cascade() {
        let (_tmp, catalog) = setup().await;
        let doc = Document::new_pending("a.txt", None);
        catalog.create_document(&doc, "k").await.unwrap();

        let chunks = Chunker::new(10, 3).unwrap().chunk(&doc.id, &"z".repeat(40));
        for c in chunks.iter().rev() {
            catalog.create_chunk(c).await.unwrap();
        }
        let stored = catalog.chunks_for_document(&doc.id).await.unwrap();
        assert_eq!(stored, chunks);

        // UNIQUE(document_id, position)
        let mut dup = chunks[0].clone();
        dup.id = "chunk_dup".into();
        assert!(catalog.create_chunk(&dup).await.is_err());

        assert!(catalog.delete_document(&doc.id).await.unwrap());
        assert!(catalog.chunks_for_document(&doc.id).await.unwrap().is_empty());
        assert!(!catalog.delete_document(&doc.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_chunk_requires_document() {
        let (_tmp, catalog) = setup().await;
        let chunks = Chunker::default().chunk("doc_ghost", "orphan");
        assert!(catalog.create_chunk(&chunks[0]).await.is_err());
    }

    #[tokio::test]
    async fn test_status_count_and_delete_chunks() {
        let (_tmp, catalog) = setup().await;
        let doc = Document::new_pending("a.txt", None);
        catalog.create_document(&doc, "k").await.unwrap();

        assert!(!catalog.delete_chunks(&doc.id).await.unwrap());
        for c in Chunker::new(4, 1).unwrap().chunk(&doc.id, "abcdefghij") {
            catalog.create_chunk(&c).await.unwrap();
        }
        assert!(catalog.delete_chunks(&doc.id).await.unwrap());

        catalog
            .update_status(&doc.id, DocumentStatus::Failed)
            .await
            .unwrap();
        catalog.update_chunk_count(&doc.id, 12).await.unwrap();
        let stored = catalog.get_document(&doc.id).await.unwrap().unwrap();
        assert_eq!(stored.status, DocumentStatus::Failed);
        assert_eq!(stored.chunk_count, 12);
        assert!(stored.updated_at >= stored.created_at);
    }
}
