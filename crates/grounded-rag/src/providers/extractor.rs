//! Document extractor trait: bytes in, typed pages out

use crate::error::Result;
use crate::types::ExtractedPage;

/// Trait for turning a document into per-page text and images
///
/// Extraction is CPU-bound and synchronous; callers run it on a blocking
/// thread.
///
/// Implementations:
/// - `PdfExtractor`: lopdf-based PDF extraction
pub trait DocumentExtractor: Send + Sync {
    /// Extract pages in document order, numbered from 1
    ///
    /// Only an unreadable document is an error. A page that cannot be
    /// parsed comes back with empty text and no images.
    fn extract(&self, bytes: &[u8]) -> Result<Vec<ExtractedPage>>;

    /// Get extractor name for logging
    fn name(&self) -> &str;
}
