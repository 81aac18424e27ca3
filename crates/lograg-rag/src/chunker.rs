//! Line-overlap text chunking

use tracing::warn;

use lograg_core::{Chunk, Document, Error, Result};

/// Splits text into chunks of whole lines, with consecutive chunks sharing
/// `overlap` lines.
///
/// An overlap of `lines_per_chunk` or more would never move the cursor
/// forward, so in that case each step falls back to no overlap. Splitting
/// stops at the first chunk that reaches the last line, so no chunk is ever a
/// pure suffix of the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChunker {
    lines_per_chunk: usize,
    overlap: usize,
}

impl TextChunker {
    /// Create a chunker; `lines_per_chunk` must be at least one
    pub fn new(lines_per_chunk: usize, overlap: usize) -> Result<Self> {
        if lines_per_chunk == 0 {
            return Err(Error::Configuration(
                "lines_per_chunk must be greater than zero".to_string(),
            ));
        }

        if overlap >= lines_per_chunk {
            warn!(
                lines_per_chunk,
                overlap, "overlap is not smaller than lines_per_chunk; chunks will not overlap"
            );
        }

        Ok(Self {
            lines_per_chunk,
            overlap,
        })
    }

    pub fn lines_per_chunk(&self) -> usize {
        self.lines_per_chunk
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split `text` into newline-joined chunks, in input order
    pub fn split(&self, text: &str) -> Vec<String> {
        let lines: Vec<&str> = text.lines().collect();
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < lines.len() {
            let end = start + self.lines_per_chunk;
            chunks.push(lines[start..end.min(lines.len())].join("\n"));
            if end >= lines.len() {
                break;
            }

            start = match end.checked_sub(self.overlap) {
                Some(next_start) if next_start > start => next_start,
                _ => end,
            };
        }

        chunks
    }

    /// Split a document into chunks that carry its metadata
    ///
    /// Chunk ids hash the document source, the chunk index and the text, so
    /// splitting the same file again yields the same ids.
    pub fn chunk_document(&self, document: &Document) -> Vec<Chunk> {
        let source = document.source().unwrap_or_default();

        self.split(&document.content)
            .into_iter()
            .enumerate()
            .map(|(index, text)| {
                let mut metadata = document.metadata.clone();
                metadata.insert("chunk_index".to_string(), index.to_string());

                let digest = md5::compute(format!("{}\u{0}{}\u{0}{}", source, index, text));
                Chunk {
                    id: format!("{:x}", digest),
                    text,
                    metadata,
                }
            })
            .collect()
    }
}
