//! CLI command implementations. Each `run_*` opens the service from the
//! config, performs one operation, and prints a human-readable result to
//! stdout.

use std::path::Path;

use anyhow::{bail, Context, Result};

use doc_ingest_core::models::{Document, DocumentMetadata};

use crate::app;
use crate::config::Config;
use crate::service::{CleanupStatus, DeleteOutcome};

pub async fn run_upload(
    config: &Config,
    path: &Path,
    title: Option<String>,
    description: Option<String>,
    tags: Vec<String>,
) -> Result<()> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let metadata = DocumentMetadata {
        title,
        description,
        tags: (!tags.is_empty()).then_some(tags),
    };

    let service = app::open_service(config).await?;
    let doc = service.upload(&filename, &bytes, Some(metadata)).await?;

    println!("Uploaded {} ({} bytes)", doc.filename, bytes.len());
    print_document(&doc);
    Ok(())
}

pub async fn run_list(config: &Config, limit: u32, offset: u32) -> Result<()> {
    if !(1..=100).contains(&limit) {
        bail!("--limit must be between 1 and 100");
    }
    let service = app::open_service(config).await?;
    let page = service.list(limit, offset).await?;

    if page.documents.is_empty() {
        println!("No documents (total {}).", page.total);
        return Ok(());
    }

    println!(
        "{:<18} {:<11} {:>6}  {:<20}  FILENAME",
        "ID", "STATUS", "CHUNKS", "CREATED"
    );
    for doc in &page.documents {
        println!(
            "{:<18} {:<11} {:>6}  {:<20}  {}",
            doc.id,
            doc.status.as_str(),
            doc.chunk_count,
            doc.created_at.format("%Y-%m-%dT%H:%M:%SZ"),
            doc.filename
        );
    }
    println!(
        "\nShowing {} of {} (offset {})",
        page.documents.len(),
        page.total,
        offset
    );
    Ok(())
}

pub async fn run_get(config: &Config, id: &str) -> Result<()> {
    let service = app::open_service(config).await?;
    match service.get(id).await? {
        Some(doc) => {
            print_document(&doc);
            Ok(())
        }
        None => bail!("document not found: {}", id),
    }
}

pub async fn run_process(config: &Config, id: &str) -> Result<()> {
    let service = app::open_service(config).await?;
    let outcome = service.process(id).await?;
    println!(
        "Processed {}: {} chunks",
        outcome.document_id, outcome.chunk_count
    );
    Ok(())
}

pub async fn run_chunks(config: &Config, id: &str) -> Result<()> {
    let service = app::open_service(config).await?;
    let list = service.get_chunks(id).await?;

    println!("--- Chunks ({}) ---", list.total);
    for chunk in &list.chunks {
        println!("[chunk {}] {}", chunk.position, chunk.id);
        println!("{}", chunk.content);
        println!();
    }
    Ok(())
}

pub async fn run_delete(config: &Config, id: &str) -> Result<()> {
    let service = app::open_service(config).await?;
    match service.delete(id).await? {
        DeleteOutcome::NotFound => bail!("document not found: {}", id),
        DeleteOutcome::Deleted(report) => {
            if !report.document_removed {
                bail!("document {} was not removed", id);
            }
            println!("Deleted {}", id);
            println!("  chunks: {}", describe(&report.chunks));
            println!("  blob:   {}", describe(&report.blob));
            Ok(())
        }
    }
}

fn describe(status: &CleanupStatus) -> String {
    match status {
        CleanupStatus::Removed => "removed".to_string(),
        CleanupStatus::NothingToRemove => "nothing to remove".to_string(),
        CleanupStatus::Skipped => "skipped".to_string(),
        CleanupStatus::Failed(reason) => format!("failed ({})", reason),
    }
}

fn print_document(doc: &Document) {
    println!("id:           {}", doc.id);
    println!("filename:     {}", doc.filename);
    println!("status:       {}", doc.status);
    println!("chunk_count:  {}", doc.chunk_count);
    println!(
        "created_at:   {}",
        doc.created_at.format("%Y-%m-%dT%H:%M:%SZ")
    );
    println!(
        "updated_at:   {}",
        doc.updated_at.format("%Y-%m-%dT%H:%M:%SZ")
    );
    if let Some(meta) = &doc.metadata {
        if let Some(title) = &meta.title {
            println!("title:        {}", title);
        }
        if let Some(description) = &meta.description {
            println!("description:  {}", description);
        }
        if let Some(tags) = &meta.tags {
            println!("tags:         {}", tags.join(", "));
        }
    }
}
