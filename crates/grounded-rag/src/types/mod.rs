//! Core types for the grounding pipeline

pub mod document;
pub mod figure;
pub mod query;
pub mod response;

pub use document::{ExtractedPage, Passage, RawImage};
pub use figure::{Figure, MatchResult, PerceptualHash};
pub use query::{AskRequest, RetrieveRequest};
pub use response::{
    Answer, AskOutcome, FigureSummary, IngestReport, IngestStats, Retrieval, RetrievalHit,
};
