//! Confidence scoring by token overlap between an answer and its evidence

use regex::Regex;
use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::types::RetrievalHit;

/// Answer the generator is instructed to give when the document lacks one
pub const NOT_FOUND_ANSWER: &str = "Answer not found in the document.";

/// Overlap ratio at which a hit counts as supporting the answer
const SUPPORT_THRESHOLD: f64 = 0.15;
/// Supporting hits needed for full coverage
const FULL_COVERAGE_HITS: f64 = 5.0;
const GROUNDING_WEIGHT: f64 = 0.6;
const COVERAGE_WEIGHT: f64 = 0.4;

/// Scores how well an answer is grounded in the retrieved passages
///
/// Not a probability. The score depends only on the answer text and the
/// hit texts, so identical inputs always give identical scores.
pub struct ConfidenceScorer {
    token_pattern: Regex,
}

impl ConfidenceScorer {
    pub fn new() -> Result<Self> {
        let token_pattern =
            Regex::new(r"\w+").map_err(|e| Error::internal(format!("Invalid token pattern: {}", e)))?;
        Ok(Self { token_pattern })
    }

    /// Lowercase word set of a text
    pub fn tokens(&self, text: &str) -> HashSet<String> {
        self.token_pattern
            .find_iter(text)
            .map(|m| m.as_str().to_lowercase())
            .collect()
    }

    /// Score an answer against its evidence, in [0, 1] with two decimals
    pub fn score(&self, answer: &str, hits: &[RetrievalHit]) -> f64 {
        let answer = answer.trim();
        if answer.is_empty() || answer == NOT_FOUND_ANSWER {
            return 0.0;
        }

        let answer_tokens = self.tokens(answer);
        if answer_tokens.is_empty() {
            return 0.0;
        }

        let ratios: Vec<f64> = hits
            .iter()
            .map(|hit| self.tokens(&hit.text))
            .filter(|tokens| !tokens.is_empty())
            .map(|tokens| {
                let shared = answer_tokens.intersection(&tokens).count();
                shared as f64 / answer_tokens.len() as f64
            })
            .collect();

        if ratios.is_empty() {
            return 0.0;
        }

        let grounding = ratios.iter().copied().fold(0.0f64, f64::max);
        let support = ratios.iter().filter(|r| **r >= SUPPORT_THRESHOLD).count();
        let coverage = (support as f64 / FULL_COVERAGE_HITS).min(1.0);

        let confidence = (GROUNDING_WEIGHT * grounding + COVERAGE_WEIGHT * coverage).min(1.0);
        round_to_cents(confidence)
    }
}

/// Round to two decimals by the exact decimal value of `value`
///
/// `0.045` is stored slightly below the half and rounds down, where
/// scaling by 100 first would have rounded it up.
fn round_to_cents(value: f64) -> f64 {
    format!("{:.2}", value).parse().unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounding_uses_exact_decimal_value() {
        assert_eq!(round_to_cents(0.045), 0.04);
        assert_eq!(round_to_cents(0.675), 0.68);
        assert_eq!(round_to_cents(0.38), 0.38);
        assert_eq!(round_to_cents(1.0), 1.0);
        assert_eq!(round_to_cents(0.0), 0.0);
    }

    fn hit(text: &str) -> RetrievalHit {
        RetrievalHit {
            text: text.to_string(),
            page: 1,
            chunk_index: 0,
            score: None,
        }
    }

    fn scorer() -> ConfidenceScorer {
        ConfidenceScorer::new().unwrap()
    }

    #[test]
    fn test_empty_and_sentinel_answers_score_zero() {
        let hits = vec![hit("a stack is a lifo structure")];
        assert_eq!(scorer().score("", &hits), 0.0);
        assert_eq!(scorer().score("   ", &hits), 0.0);
        assert_eq!(scorer().score(NOT_FOUND_ANSWER, &hits), 0.0);
        assert_eq!(scorer().score(&format!("  {}\n", NOT_FOUND_ANSWER), &hits), 0.0);
    }

    #[test]
    fn test_answer_without_word_characters() {
        assert_eq!(scorer().score("?!. --", &[hit("anything")]), 0.0);
    }

    #[test]
    fn test_no_usable_hits() {
        assert_eq!(scorer().score("a b c", &[]), 0.0);
        assert_eq!(scorer().score("a b c", &[hit(""), hit("...")]), 0.0);
    }

    #[test]
    fn test_worked_example() {
        let hits = vec![hit("a b x"), hit("x"), hit("y"), hit("z"), hit("w")];
        assert_eq!(scorer().score("a b c d", &hits), 0.38);
    }

    #[test]
    fn test_empty_hits_do_not_count_toward_coverage() {
        // Same as the worked example with blank hits mixed in
        let hits = vec![hit(""), hit("a b x"), hit("  "), hit("x"), hit("y"), hit("z"), hit("w")];
        assert_eq!(scorer().score("a b c d", &hits), 0.38);
    }

    #[test]
    fn test_full_support_caps_at_one() {
        let hits: Vec<RetrievalHit> = (0..8).map(|_| hit("Stacks are LIFO")).collect();
        assert_eq!(scorer().score("stacks are lifo", &hits), 1.0);
    }

    #[test]
    fn test_tokens_are_case_insensitive_sets() {
        let tokens = scorer().tokens("The the THE stack_top, 42!");
        assert_eq!(tokens.len(), 3);
        assert!(tokens.contains("the"));
        assert!(tokens.contains("stack_top"));
        assert!(tokens.contains("42"));
    }

    #[test]
    fn test_deterministic() {
        let hits = vec![hit("queues are first in first out"), hit("stacks push and pop")];
        let answer = "Queues are first in, first out while stacks pop the newest item.";
        let first = scorer().score(answer, &hits);
        let second = scorer().score(answer, &hits);
        assert_eq!(first.to_bits(), second.to_bits());
        assert!(first > 0.0 && first <= 1.0);
    }
}
