//! # doc-ingest
//!
//! A local document ingestion service. Files are uploaded, stored as blobs,
//! registered in a SQLite catalog, and on request split into overlapping
//! fixed-size text chunks that can be listed back in order.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐  ┌──────────┐
//! │    CLI    │  │   HTTP   │
//! │(docingest)│  │  (axum)  │
//! └─────┬─────┘  └────┬─────┘
//!       └──────┬──────┘
//!             ▼
//!     ┌───────────────┐     ┌────────────┐
//!     │DocumentService│────▶│  Chunker   │
//!     └───────┬───────┘     └────────────┘
//!        ┌────┴─────┐
//!        ▼          ▼
//!   ┌─────────┐ ┌─────────┐
//!   │ SQLite  │ │  Blob   │
//!   │ catalog │ │  dir    │
//!   └─────────┘ └─────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! docingest init
//! docingest upload ./notes.txt --title "Notes" --tag draft
//! docingest process doc_1a2b3c4d5e6f
//! docingest chunks doc_1a2b3c4d5e6f
//! docingest serve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Document and chunk types |
//! | [`chunk`] | Overlapping-window chunker |
//! | [`service`] | Upload, processing pipeline, cascading delete |
//! | [`locks`] | Per-document mutual exclusion |
//! | [`sqlite_store`] | SQLite catalog |
//! | [`blob`] | Filesystem blob store |
//! | [`server`] | REST API |
//! | [`commands`] | CLI command implementations |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod app;
pub mod blob;
pub mod chunk;
pub mod commands;
pub mod config;
pub mod db;
pub mod locks;
pub mod migrate;
pub mod models;
pub mod server;
pub mod service;
pub mod sqlite_store;

pub use doc_ingest_core::{Error, Result};
