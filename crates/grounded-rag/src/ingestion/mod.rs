//! Document ingestion: extraction, chunking and figure deduplication

mod chunker;
mod dedup;
mod extractor;

pub use chunker::WordChunker;
pub use dedup::{AcceptedImage, DedupOutcome, DedupStats, Decision, FigureDeduplicator};
pub use extractor::PdfExtractor;
