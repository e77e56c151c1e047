//! Application state for the HTTP server

use std::sync::Arc;

use crate::config::RagConfig;
use crate::engine::RagEngine;
use crate::error::Result;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Pipeline engine owning the active session
    engine: Arc<RagEngine>,
}

impl AppState {
    /// Create new application state with the default providers
    pub async fn new(config: RagConfig) -> Result<Self> {
        tracing::info!(
            "Initializing application state (embeddings: {:?}, figures under {})",
            config.embeddings.provider,
            config.storage.figures_dir.display()
        );
        let engine = Arc::new(RagEngine::from_config(config)?);
        Ok(Self::from_engine(engine))
    }

    /// Wrap an existing engine
    pub fn from_engine(engine: Arc<RagEngine>) -> Self {
        Self { engine }
    }

    /// Get the engine
    pub fn engine(&self) -> &Arc<RagEngine> {
        &self.engine
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        self.engine.config()
    }

    /// Base URL stored figures are served under
    pub fn figure_base_url(&self) -> String {
        format!(
            "{}{}",
            self.config().server.public_base_url.trim_end_matches('/'),
            super::FIGURES_ROUTE
        )
    }

    /// Ready when the engine's embedder and generator are reachable
    pub async fn is_ready(&self) -> bool {
        self.engine.providers_ready().await
    }
}
