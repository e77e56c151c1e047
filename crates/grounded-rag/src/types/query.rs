//! Request types

use serde::{Deserialize, Serialize};

/// Question about the active document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    /// The question to answer
    pub question: String,

    /// Number of passages to ground the answer on (default: retrieval.answer_top_k)
    #[serde(default)]
    pub top_k: Option<usize>,

    /// Include the evidence passages in the response (default: false)
    #[serde(default)]
    pub include_hits: bool,
}

impl AskRequest {
    /// Create a request with defaults
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            top_k: None,
            include_hits: false,
        }
    }
}

/// Direct retrieval request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrieveRequest {
    /// Query text
    pub query: String,
    /// Number of hits (default: retrieval.default_top_k)
    #[serde(default)]
    pub top_k: Option<usize>,
}
