//! Overlapping line-window chunker.
//!
//! Splits text into windows of `window_size` lines. Consecutive windows
//! share `overlap` lines, so chunk `i` covers lines
//! `[i * stride, i * stride + window_size)` with
//! `stride = window_size - overlap`.
//!
//! # Guarantees
//!
//! - Empty or whitespace-only text yields no chunks.
//! - Text of at most `window_size` lines yields exactly one chunk.
//! - Windowing stops at the first window that reaches the last line, so
//!   no chunk consists solely of the previous chunk's overlap.
//! - The same input and parameters always yield the same chunks.
//! - `overlap >= window_size` is rejected instead of looping forever.
//!
//! # Example
//!
//! ```rust
//! use repo_rag_core::chunk::{chunk_lines, ChunkParams};
//!
//! let text = (0..250).map(|i| format!("line {}", i)).collect::<Vec<_>>().join("\n");
//! let chunks = chunk_lines(&text, ChunkParams::new(200, 50).unwrap());
//! assert_eq!(chunks.len(), 2);
//! assert!(chunks[1].starts_with("line 150"));
//! ```

use crate::error::{RagError, Result};

/// Window size and overlap, validated so that the stride is positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkParams {
    window_size: usize,
    overlap: usize,
}

impl ChunkParams {
    pub const DEFAULT_WINDOW: usize = 200;
    pub const DEFAULT_OVERLAP: usize = 50;

    /// Validate and build chunking parameters.
    ///
    /// # Errors
    ///
    /// [`RagError::InvalidConfiguration`] when `window_size` is zero or
    /// `overlap >= window_size`.
    pub fn new(window_size: usize, overlap: usize) -> Result<Self> {
        if window_size == 0 {
            return Err(RagError::InvalidConfiguration(
                "chunk window size must be > 0".to_string(),
            ));
        }
        if overlap >= window_size {
            return Err(RagError::InvalidConfiguration(format!(
                "chunk overlap ({}) must be smaller than window size ({})",
                overlap, window_size
            )));
        }
        Ok(Self {
            window_size,
            overlap,
        })
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    pub fn stride(&self) -> usize {
        self.window_size - self.overlap
    }
}

impl Default for ChunkParams {
    fn default() -> Self {
        Self {
            window_size: Self::DEFAULT_WINDOW,
            overlap: Self::DEFAULT_OVERLAP,
        }
    }
}

/// Split `text` into overlapping line windows.
///
/// Windows are joined with `\n`; line terminators (`\n` or `\r\n`) are
/// not preserved at the window edges.
pub fn chunk_lines(text: &str, params: ChunkParams) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let lines: Vec<&str> = text.lines().collect();
    let stride = params.stride();
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < lines.len() {
        let end = (start + params.window_size).min(lines.len());
        chunks.push(lines[start..end].join("\n"));
        if end == lines.len() {
            break;
        }
        start += stride;
    }

    chunks
}

/// Validate `window_size`/`overlap` and chunk in one step.
///
/// # Errors
///
/// See [`ChunkParams::new`].
pub fn chunk(text: &str, window_size: usize, overlap: usize) -> Result<Vec<String>> {
    Ok(chunk_lines(text, ChunkParams::new(window_size, overlap)?))
}

/// Number of chunks [`chunk_lines`] produces for `line_count` lines.
pub fn expected_chunk_count(line_count: usize, params: ChunkParams) -> usize {
    if line_count == 0 {
        return 0;
    }
    line_count
        .saturating_sub(params.overlap)
        .max(1)
        .div_ceil(params.stride())
}
