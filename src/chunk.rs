//! Overlapping fixed-window chunker, re-exported from `doc-ingest-core`.
//!
//! # Example
//!
//! ```rust
//! use doc_ingest::chunk::Chunker;
//!
//! let chunker = Chunker::new(100, 10).unwrap();
//! let chunks = chunker.chunk("doc_123", &"A".repeat(250));
//! let lens: Vec<usize> = chunks.iter().map(|c| c.content.len()).collect();
//! assert_eq!(lens, vec![100, 100, 70]);
//! ```

pub use doc_ingest_core::chunk::*;
