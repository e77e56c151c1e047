//! Provider abstractions for the external collaborators of the pipeline
//!
//! Trait-based seams for extraction, embeddings, answer generation, vector
//! indexing and figure storage, with local and Ollama backends.

pub mod embedding;
pub mod extractor;
pub mod figure_store;
pub mod llm;
pub mod local;
pub mod ollama;
pub mod vector_index;

pub use embedding::EmbeddingProvider;
pub use extractor::DocumentExtractor;
pub use figure_store::{figure_location, FigureStore};
pub use llm::AnswerGenerator;
pub use local::{HashingEmbedder, InMemoryIndexFactory, InMemoryVectorIndex, LocalFigureStore};
pub use ollama::{OllamaEmbedder, OllamaGenerator};
pub use vector_index::{IndexFactory, IndexMatch, IndexMetadata, VectorIndex};
