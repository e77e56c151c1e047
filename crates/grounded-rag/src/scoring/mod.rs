//! Lexical grounding confidence for generated answers

mod confidence;

pub use confidence::{ConfidenceScorer, NOT_FOUND_ANSWER};
