//! Retrieval, answer and ingestion result types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::document::Passage;
use super::figure::Figure;
use crate::ingestion::DedupStats;

/// A passage returned for a query, best first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalHit {
    /// Passage text
    pub text: String,
    /// Page the passage came from
    pub page: u32,
    /// Window index within the page
    pub chunk_index: u32,
    /// Relevance score reported by the index (higher is better)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl RetrievalHit {
    /// Create a hit from a passage
    pub fn from_passage(passage: &Passage, score: Option<f32>) -> Self {
        Self {
            text: passage.text.clone(),
            page: passage.page,
            chunk_index: passage.chunk_index,
            score,
        }
    }

    /// Rebuild a hit from index metadata; `None` when required fields are missing
    pub fn from_metadata(
        metadata: &HashMap<String, serde_json::Value>,
        score: Option<f32>,
    ) -> Option<Self> {
        let text = metadata.get("text")?.as_str()?.to_string();
        let page = metadata
            .get("page")
            .and_then(|v| v.as_u64())
            .and_then(|p| u32::try_from(p).ok())
            .filter(|p| *p > 0)?;
        let chunk_index = metadata
            .get("chunk_index")
            .and_then(|v| v.as_u64())
            .and_then(|c| u32::try_from(c).ok())
            .unwrap_or(0);

        Some(Self {
            text,
            page,
            chunk_index,
            score,
        })
    }

    /// Source label used in answers
    pub fn source_label(&self) -> String {
        format!("Page {}", self.page)
    }
}

/// Result of a retrieval request
#[derive(Debug, Clone, PartialEq)]
pub enum Retrieval {
    /// The active session holds no passages at all
    EmptyCorpus,
    /// Ranked hits, possibly empty
    Hits(Vec<RetrievalHit>),
}

impl Retrieval {
    /// Hits, or an empty slice for an empty corpus
    pub fn hits(&self) -> &[RetrievalHit] {
        match self {
            Retrieval::EmptyCorpus => &[],
            Retrieval::Hits(hits) => hits,
        }
    }

    /// Whether the corpus was empty
    pub fn is_empty_corpus(&self) -> bool {
        matches!(self, Retrieval::EmptyCorpus)
    }
}

/// A grounded answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// Generated answer text
    pub answer: String,
    /// Lexical grounding score in [0, 1]
    pub confidence: f64,
    /// Unique "Page N" labels of the top hits, in rank order
    pub sources: Vec<String>,
    /// Figures on the source pages
    pub figures: Vec<Figure>,
    /// Evidence the answer was generated from
    pub hits: Vec<RetrievalHit>,
    /// Session the answer was computed against
    pub session_id: Uuid,
    /// Processing time
    pub processing_time_ms: u64,
}

/// Outcome of a question
#[derive(Debug, Clone)]
pub enum AskOutcome {
    /// No document has been ingested (or the last one had no text)
    NoDocument,
    /// An answer, possibly the "not found" sentinel
    Answered(Answer),
}

/// Counters collected while ingesting one document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestStats {
    /// Pages returned by the extractor
    pub pages: usize,
    /// Pages with non-blank text
    pub pages_with_text: usize,
    /// Passages produced by the chunker
    pub passages: usize,
    /// Images the extractor could not hand over
    pub extractor_skipped_images: usize,
    /// Figure deduplication counters
    pub figures: DedupStats,
}

/// Figure as reported to HTTP clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FigureSummary {
    /// Page number
    pub page: u32,
    /// Perceptual hash (hex)
    pub hash: String,
    /// Entropy at capture time
    pub entropy: f64,
    /// Public URL of the stored image
    pub url: String,
}

impl FigureSummary {
    /// Build from a figure and the base URL figures are served under
    pub fn from_figure(figure: &Figure, base_url: &str) -> Self {
        Self {
            page: figure.page,
            hash: figure.hash.to_hex(),
            entropy: figure.entropy,
            url: format!("{}/{}", base_url.trim_end_matches('/'), figure.path),
        }
    }
}

/// Result of ingesting a document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    /// New active session
    pub session_id: Uuid,
    /// Document name as uploaded
    pub document_name: String,
    /// SHA-256 of the document bytes
    pub content_hash: String,
    /// Number of passages indexed
    pub passages: usize,
    /// Accepted figures, page-then-insertion order
    pub figures: Vec<Figure>,
    /// Counters
    pub stats: IngestStats,
    /// Processing time
    pub processing_time_ms: u64,
}
