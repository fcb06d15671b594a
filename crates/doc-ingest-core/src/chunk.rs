//! Fixed-size overlapping-window text chunker.
//!
//! Splits decoded document text into [`Chunk`]s of at most `chunk_size`
//! characters, where consecutive chunks share `overlap` characters. The
//! walk is purely positional: there is no sentence or paragraph awareness.
//!
//! # Algorithm
//!
//! 1. Empty or whitespace-only text produces no chunks.
//! 2. Starting at offset 0, take the window `[start, start + chunk_size)`,
//!    clipped to the end of the text, and emit it at the next position.
//! 3. Stop once a window reaches the end of the text; otherwise advance
//!    `start` by `chunk_size - overlap`.
//!
//! The final chunk may be shorter than `chunk_size` and is never padded.
//! Sizes and offsets count Unicode scalar values, so a window never cuts a
//! multi-byte character in half.
//!
//! # Example
//!
//! ```rust
//! use doc_ingest_core::chunk::Chunker;
//!
//! let chunker = Chunker::new(100, 10).unwrap();
//! let chunks = chunker.chunk("doc_123", &"A".repeat(250));
//! let lengths: Vec<usize> = chunks.iter().map(|c| c.content.len()).collect();
//! assert_eq!(lengths, vec![100, 100, 70]);
//! ```

use std::iter;

use crate::error::{Error, Result};
use crate::models::{new_chunk_id, Chunk};

/// Default window size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Default number of characters shared by consecutive windows.
pub const DEFAULT_OVERLAP: usize = 50;

/// A validated chunking configuration.
///
/// Construction rejects `chunk_size == 0` and `overlap >= chunk_size`, so a
/// `Chunker` always advances and [`Chunker::chunk`] cannot fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Chunker {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::invalid_config("chunk_size must be > 0"));
        }
        if overlap >= chunk_size {
            return Err(Error::invalid_config(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Distance between the starts of consecutive windows.
    pub fn stride(&self) -> usize {
        self.chunk_size - self.overlap
    }

    /// Split `text` into overlapping windows belonging to `document_id`.
    ///
    /// Every chunk gets a fresh id; positions run `0..N-1`.
    pub fn chunk(&self, document_id: &str, text: &str) -> Vec<Chunk> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        // Byte offset of every character, plus the end of the string, so
        // character index `i` maps to `offsets[i]`.
        let offsets: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(iter::once(text.len()))
            .collect();
        let char_len = offsets.len() - 1;

        let mut chunks = Vec::with_capacity(char_len / self.stride() + 1);
        let mut start = 0usize;
        let mut position = 0u32;

        while start < char_len {
            let end = (start + self.chunk_size).min(char_len);
            chunks.push(make_chunk(
                document_id,
                position,
                &text[offsets[start]..offsets[end]],
            ));

            if start + self.chunk_size >= char_len {
                break;
            }

            start += self.stride();
            position += 1;
        }

        chunks
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

/// One-shot form of [`Chunker::chunk`] that validates the configuration
/// first.
pub fn chunk_text(
    document_id: &str,
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<Chunk>> {
    Ok(Chunker::new(chunk_size, overlap)?.chunk(document_id, text))
}

fn make_chunk(document_id: &str, position: u32, content: &str) -> Chunk {
    Chunk {
        id: new_chunk_id(),
        document_id: document_id.to_string(),
        content: content.to_string(),
        position,
        metadata: None,
    }
}
