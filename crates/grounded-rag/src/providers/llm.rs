//! Answer generator trait

use async_trait::async_trait;
use crate::error::Result;
use crate::types::RetrievalHit;

/// Trait for turning a question and its evidence into answer text
///
/// Implementations:
/// - `OllamaGenerator`: Local Ollama server (llama3.1, phi3, etc.)
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Generate an answer from ranked evidence passages
    async fn generate(&self, question: &str, evidence: &[RetrievalHit]) -> Result<String>;

    /// Check if the generator is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
