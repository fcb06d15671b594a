//! Document and chunk models, re-exported from `doc-ingest-core`.

pub use doc_ingest_core::models::*;
