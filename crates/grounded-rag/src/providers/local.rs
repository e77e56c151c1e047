//! Local provider implementations: in-memory index, filesystem figures,
//! offline hashing embedder

use async_trait::async_trait;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Error, Result};

use super::embedding::EmbeddingProvider;
use super::figure_store::{figure_location, FigureStore};
use super::vector_index::{IndexFactory, IndexMatch, IndexMetadata, VectorIndex};

/// Compute cosine similarity between two vectors
///
/// Returns 0.0 if either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

struct StoredVector {
    id: String,
    vector: Vec<f32>,
    metadata: IndexMetadata,
}

/// Brute-force cosine index held in memory
///
/// Entries keep insertion order; equal scores rank in that order.
pub struct InMemoryVectorIndex {
    dimensions: usize,
    entries: RwLock<Vec<StoredVector>>,
}

impl InMemoryVectorIndex {
    /// Create an empty index for vectors of `dimensions` components
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            entries: RwLock::new(Vec::new()),
        }
    }

    fn check_dimensions(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimensions {
            return Err(Error::vector_index(format!(
                "Vector has {} dimensions, index expects {}",
                vector.len(),
                self.dimensions
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn add(&self, ids: &[String], vectors: &[Vec<f32>], metadata: &[IndexMetadata]) -> Result<()> {
        if ids.len() != vectors.len() || ids.len() != metadata.len() {
            return Err(Error::vector_index(format!(
                "Mismatched batch: {} ids, {} vectors, {} metadata",
                ids.len(),
                vectors.len(),
                metadata.len()
            )));
        }
        for vector in vectors {
            self.check_dimensions(vector)?;
        }

        let mut entries = self.entries.write();
        for ((id, vector), metadata) in ids.iter().zip(vectors).zip(metadata) {
            // Re-adding an id replaces the stored vector in place
            if let Some(existing) = entries.iter_mut().find(|e| &e.id == id) {
                existing.vector = vector.clone();
                existing.metadata = metadata.clone();
            } else {
                entries.push(StoredVector {
                    id: id.clone(),
                    vector: vector.clone(),
                    metadata: metadata.clone(),
                });
            }
        }
        Ok(())
    }

    async fn delete(&self, ids: &[String]) -> Result<usize> {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|e| !ids.contains(&e.id));
        Ok(before - entries.len())
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<IndexMatch>> {
        self.check_dimensions(vector)?;

        let entries = self.entries.read();
        let mut scored: Vec<IndexMatch> = entries
            .iter()
            .map(|entry| IndexMatch {
                id: entry.id.clone(),
                metadata: entry.metadata.clone(),
                score: cosine_similarity(&entry.vector, vector),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.entries.read().len())
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}

/// Creates a fresh `InMemoryVectorIndex` per session
pub struct InMemoryIndexFactory {
    dimensions: usize,
}

impl InMemoryIndexFactory {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

impl IndexFactory for InMemoryIndexFactory {
    fn create_index(&self, session_id: Uuid) -> Result<Arc<dyn VectorIndex>> {
        tracing::debug!("Creating in-memory index for session {}", session_id);
        Ok(Arc::new(InMemoryVectorIndex::new(self.dimensions)))
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}

/// Figure store on the local filesystem
///
/// Layout: `<root>/<session>/page<P>_<I>.<ext>`. Locations returned by
/// `put` are relative to the root so they can be served under a URL prefix.
pub struct LocalFigureStore {
    root: PathBuf,
}

impl LocalFigureStore {
    /// Create a new store, creating the root directory if needed
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .map_err(|e| Error::storage(format!("Failed to create {}: {}", root.display(), e)))?;
        Ok(Self { root })
    }

    /// Absolute path of a stored location
    pub fn resolve(&self, location: &str) -> PathBuf {
        self.root.join(location)
    }
}

#[async_trait]
impl FigureStore for LocalFigureStore {
    async fn put(&self, session_id: Uuid, page: u32, index: u32, ext: &str, bytes: &[u8]) -> Result<String> {
        let location = figure_location(session_id, page, index, ext);
        let path = self.resolve(&location);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::storage(format!("Failed to create {}: {}", parent.display(), e)))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| Error::storage(format!("Failed to write {}: {}", path.display(), e)))?;

        Ok(location)
    }

    async fn clear_session(&self, session_id: Uuid) -> Result<()> {
        let dir = self.root.join(session_id.to_string());
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::storage(format!("Failed to remove {}: {}", dir.display(), e))),
        }
    }

    fn name(&self) -> &str {
        "local-fs"
    }
}

/// Deterministic offline embedder using signed feature hashing
///
/// Each lowercase alphanumeric token is hashed with SHA-256 into one of
/// `dimensions` buckets; the result is L2-normalised.
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(Error::Config("Embedding dimensions must be > 0".to_string()));
        }
        Ok(Self { dimensions })
    }

    fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let digest = Sha256::digest(token.to_lowercase().as_bytes());
            let mut bucket = [0u8; 8];
            bucket.copy_from_slice(&digest[..8]);
            let index = (u64::from_le_bytes(bucket) % self.dimensions as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[index] += sign;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in vector.iter_mut() {
                *value /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "hashing"
    }
}
