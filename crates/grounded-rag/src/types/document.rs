//! Extracted document pages and the passages chunked from them

use serde::{Deserialize, Serialize};

/// A raster image embedded in a page, as bytes in a decodable container format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    /// Encoded image bytes
    pub bytes: Vec<u8>,
    /// File extension matching the encoding (`jpg`, `png`, ...)
    pub ext: String,
}

impl RawImage {
    /// Create a raw image
    pub fn new(bytes: Vec<u8>, ext: impl Into<String>) -> Self {
        Self {
            bytes,
            ext: ext.into(),
        }
    }
}

/// One page as returned by a document extractor
#[derive(Debug, Clone, Default)]
pub struct ExtractedPage {
    /// 1-based page number
    pub page: u32,
    /// Plain text of the page (may be empty)
    pub text: String,
    /// Embedded images in document order
    pub images: Vec<RawImage>,
    /// Embedded images the extractor could not turn into a decodable container
    pub skipped_images: usize,
}

impl ExtractedPage {
    /// Create a page with text and no images
    pub fn text(page: u32, text: impl Into<String>) -> Self {
        Self {
            page,
            text: text.into(),
            images: Vec::new(),
            skipped_images: 0,
        }
    }

    /// Attach an image
    pub fn with_image(mut self, image: RawImage) -> Self {
        self.images.push(image);
        self
    }
}

/// A retrievable window of words from one page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    /// Window text, words joined by single spaces
    pub text: String,
    /// Page the window was cut from
    pub page: u32,
    /// Position of the window within its page
    pub chunk_index: u32,
}

impl Passage {
    /// Create a passage
    pub fn new(text: impl Into<String>, page: u32, chunk_index: u32) -> Self {
        Self {
            text: text.into(),
            page,
            chunk_index,
        }
    }

    /// Stable identifier inside a session's vector index
    pub fn id(&self) -> String {
        format!("p{}-c{}", self.page, self.chunk_index)
    }

    /// Metadata stored alongside the passage vector
    pub fn to_index_metadata(&self) -> std::collections::HashMap<String, serde_json::Value> {
        let mut metadata = std::collections::HashMap::new();
        metadata.insert("text".to_string(), serde_json::json!(self.text));
        metadata.insert("page".to_string(), serde_json::json!(self.page));
        metadata.insert("chunk_index".to_string(), serde_json::json!(self.chunk_index));
        metadata
    }
}
