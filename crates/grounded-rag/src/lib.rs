//! grounded-rag: question answering over a single PDF with grounded confidence
//!
//! Pages are cut into overlapping word windows and indexed per document
//! session. Embedded images are filtered by entropy and deduplicated by
//! perceptual hash, so uploaded images can be matched back to the figures of
//! the document. Answers come with a lexical grounding score against the
//! passages they were generated from.

pub mod config;
pub mod engine;
pub mod error;
pub mod figures;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod scoring;
pub mod server;
pub mod session;
pub mod types;

pub use config::RagConfig;
pub use engine::{Providers, RagEngine};
pub use error::{Error, Result};
pub use session::{Session, SessionStore};
pub use types::{
    Answer, AskOutcome, Figure, IngestReport, MatchResult, Passage, PerceptualHash, Retrieval,
    RetrievalHit,
};
