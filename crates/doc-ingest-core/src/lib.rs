//! # doc-ingest core
//!
//! Runtime-agnostic logic shared by the `doc-ingest` service: the document
//! and chunk data model, the overlapping-window chunker, the error taxonomy,
//! and the collaborator traits (catalog and blob store) the processing
//! coordinator is written against.
//!
//! This crate contains no tokio, sqlx, or filesystem I/O. The in-memory
//! collaborators in [`store::memory`] make it usable on its own for tests
//! and embedding.

pub mod chunk;
pub mod error;
pub mod models;
pub mod store;

pub use error::{Error, Result};
