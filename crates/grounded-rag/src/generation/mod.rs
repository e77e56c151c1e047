//! Answer generation: question classification, prompt construction and the
//! Ollama client

pub mod classifier;
pub mod ollama;
pub mod prompt;

pub use classifier::QuestionKind;
pub use ollama::OllamaClient;
pub use prompt::PromptBuilder;
