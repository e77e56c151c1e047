//! Query embedding and ranked passage lookup

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::RetrievalConfig;
use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::session::Session;
use crate::types::{Retrieval, RetrievalHit};

/// Retrieves the passages of a session that best match a query
pub struct EvidenceRetriever {
    embedder: Arc<dyn EmbeddingProvider>,
    config: RetrievalConfig,
}

impl EvidenceRetriever {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, config: RetrievalConfig) -> Self {
        Self { embedder, config }
    }

    /// Clamp a requested hit count into `[1, max_top_k]`
    pub fn clamp_k(&self, k: usize) -> usize {
        k.clamp(1, self.config.max_top_k.max(1))
    }

    /// Retrieve up to `k` hits from `session`, best first
    ///
    /// An index without vectors yields `Retrieval::EmptyCorpus`; an index
    /// that simply returns nothing yields an empty hit list.
    pub async fn retrieve(&self, session: &Session, query: &str, k: usize) -> Result<Retrieval> {
        let timeout = Duration::from_secs(self.config.timeout_secs);
        tokio::time::timeout(timeout, self.retrieve_inner(session, query, k))
            .await
            .map_err(|_| Error::Timeout(format!("Retrieval exceeded {}s", self.config.timeout_secs)))?
    }

    async fn retrieve_inner(&self, session: &Session, query: &str, k: usize) -> Result<Retrieval> {
        let count = session.index.count().await.map_err(as_index_error)?;
        if count == 0 {
            debug!("Session {} has no passages", session.id);
            return Ok(Retrieval::EmptyCorpus);
        }

        let k = self.clamp_k(k);
        let vector = self.embedder.embed(query).await.map_err(|e| match e {
            Error::Embedding(_) | Error::Timeout(_) => e,
            other => Error::embedding(other.to_string()),
        })?;

        let matches = session.index.query(&vector, k).await.map_err(as_index_error)?;

        let hits: Vec<RetrievalHit> = matches
            .into_iter()
            .filter_map(|m| {
                let hit = RetrievalHit::from_metadata(&m.metadata, Some(m.score));
                if hit.is_none() {
                    warn!("Skipping index entry {} with malformed metadata", m.id);
                }
                hit
            })
            .collect();

        debug!(
            "Retrieved {} hits (k={}) from {} via {}",
            hits.len(),
            k,
            session.index.name(),
            self.embedder.name()
        );

        Ok(Retrieval::Hits(hits))
    }
}

fn as_index_error(e: Error) -> Error {
    match e {
        Error::VectorIndex(_) | Error::Timeout(_) => e,
        other => Error::vector_index(other.to_string()),
    }
}
