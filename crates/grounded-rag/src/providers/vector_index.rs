//! Vector index trait for storing and searching passage embeddings

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::Result;

/// Metadata stored next to each vector
pub type IndexMetadata = HashMap<String, serde_json::Value>;

/// Ranked result from a vector index
#[derive(Debug, Clone)]
pub struct IndexMatch {
    /// Identifier the vector was added under
    pub id: String,
    /// Metadata stored with the vector
    pub metadata: IndexMetadata,
    /// Similarity score (higher is more similar)
    pub score: f32,
}

/// Trait for a session's vector index
///
/// Implementations:
/// - `InMemoryVectorIndex`: brute-force cosine similarity
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Add vectors; `ids`, `vectors` and `metadata` are parallel slices
    async fn add(&self, ids: &[String], vectors: &[Vec<f32>], metadata: &[IndexMetadata]) -> Result<()>;

    /// Delete vectors by id, returning how many were removed
    async fn delete(&self, ids: &[String]) -> Result<usize>;

    /// Top `k` matches, best first
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<IndexMatch>>;

    /// Number of stored vectors
    async fn count(&self) -> Result<usize>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

/// Creates one fresh index per document session
pub trait IndexFactory: Send + Sync {
    /// Create an empty index for a session
    fn create_index(&self, session_id: Uuid) -> Result<Arc<dyn VectorIndex>>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
