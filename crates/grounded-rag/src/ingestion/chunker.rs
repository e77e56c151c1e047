//! Word-window chunking with page tracking

use crate::config::ChunkingConfig;
use crate::error::{Error, Result};
use crate::types::{ExtractedPage, Passage};

/// Splits text into overlapping fixed-size word windows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordChunker {
    /// Window size in words
    window_size: usize,
    /// Words shared by consecutive windows
    overlap: usize,
}

impl Default for WordChunker {
    fn default() -> Self {
        Self {
            window_size: 500,
            overlap: 50,
        }
    }
}

impl WordChunker {
    /// Create a new chunker; `overlap` must be smaller than `window_size`
    pub fn new(window_size: usize, overlap: usize) -> Result<Self> {
        if overlap >= window_size {
            return Err(Error::Config(format!(
                "chunk overlap ({}) must be smaller than window size ({})",
                overlap, window_size
            )));
        }
        Ok(Self {
            window_size,
            overlap,
        })
    }

    /// Create from configuration
    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Self::new(config.window_size, config.overlap)
    }

    /// Distance between consecutive window starts
    pub fn step(&self) -> usize {
        self.window_size - self.overlap
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Chunk text into windows
    ///
    /// Emission stops with the first window that reaches the last word, so
    /// text shorter than one window yields exactly one passage.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        let mut windows = Vec::new();

        if words.is_empty() {
            return windows;
        }

        let step = self.step();
        let mut start = 0usize;

        loop {
            let end = (start + self.window_size).min(words.len());
            windows.push(words[start..end].join(" "));

            if end == words.len() {
                break;
            }
            start += step;
        }

        windows
    }

    /// Chunk every page in order, skipping pages without text
    pub fn chunk_pages(&self, pages: &[ExtractedPage]) -> Vec<Passage> {
        let mut passages = Vec::new();

        for page in pages {
            if page.text.trim().is_empty() {
                continue;
            }

            for (index, window) in self.chunk(&page.text).into_iter().enumerate() {
                passages.push(Passage::new(window, page.page, index as u32));
            }
        }

        passages
    }

    /// Number of windows `chunk` produces for `word_count` words
    pub fn expected_windows(&self, word_count: usize) -> usize {
        if word_count == 0 {
            return 0;
        }
        let span = word_count.saturating_sub(self.overlap).max(1);
        span.div_ceil(self.step())
    }
}
