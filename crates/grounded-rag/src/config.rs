//! Configuration for the grounding pipeline

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Environment variable naming a TOML configuration file
pub const CONFIG_ENV_VAR: &str = "GROUNDED_RAG_CONFIG";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RagConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Chunking configuration
    #[serde(default)]
    pub chunking: ChunkingConfig,
    /// Figure deduplication and matching
    #[serde(default)]
    pub figures: FigureConfig,
    /// Retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Embedding configuration
    #[serde(default)]
    pub embeddings: EmbeddingConfig,
    /// Ollama/LLM configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// Figure storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// Ingestion configuration
    #[serde(default)]
    pub ingestion: IngestionConfig,
}

impl RagConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config: {}", e)))
    }

    /// Read a configuration file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Load from the file named by `GROUNDED_RAG_CONFIG`, or use defaults
    pub fn load() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) => Self::from_toml_file(PathBuf::from(path)),
            None => Ok(Self::default()),
        }
    }

    /// Reject configurations the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;

        if self.retrieval.answer_top_k == 0 || self.retrieval.max_top_k == 0 {
            return Err(Error::Config("top_k limits must be positive".to_string()));
        }
        if self.retrieval.default_top_k > self.retrieval.max_top_k {
            return Err(Error::Config(format!(
                "default_top_k ({}) exceeds max_top_k ({})",
                self.retrieval.default_top_k, self.retrieval.max_top_k
            )));
        }
        if self.embeddings.dimensions == 0 {
            return Err(Error::Config("embedding dimensions must be positive".to_string()));
        }
        if self.embeddings.batch_size == 0 {
            return Err(Error::Config("embedding batch_size must be positive".to_string()));
        }
        if self.figures.max_images_per_page == 0 {
            return Err(Error::Config("max_images_per_page must be positive".to_string()));
        }
        if self.figures.decode_timeout_secs == 0 {
            return Err(Error::Config("figures.decode_timeout_secs must be positive".to_string()));
        }

        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum upload size in bytes (default: 100MB)
    pub max_upload_size: usize,
    /// Base URL used when building figure links
    pub public_base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            enable_cors: true,
            max_upload_size: 100 * 1024 * 1024, // 100MB
            public_base_url: "http://localhost:8000".to_string(),
        }
    }
}

/// Word-window chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Window size in words
    pub window_size: usize,
    /// Words shared by consecutive windows
    pub overlap: usize,
}

impl ChunkingConfig {
    /// Overlap must be strictly smaller than the window
    pub fn validate(&self) -> Result<()> {
        if self.overlap >= self.window_size {
            return Err(Error::Config(format!(
                "chunk overlap ({}) must be smaller than window size ({})",
                self.overlap, self.window_size
            )));
        }
        Ok(())
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            window_size: 500,
            overlap: 50,
        }
    }
}

/// Figure deduplication and matching thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FigureConfig {
    /// Images below this luma entropy are dropped (logos, watermarks)
    pub min_entropy: f64,
    /// Hamming distance at or below which two images are duplicates
    pub hash_distance_threshold: u32,
    /// Accepted figures per page before the rest of the page is skipped
    pub max_images_per_page: usize,
    /// Hamming distance at or below which a submitted image matches
    pub match_tolerance: u32,
    /// Upper bound on decoding and hashing a submitted image
    pub decode_timeout_secs: u64,
}

impl Default for FigureConfig {
    fn default() -> Self {
        Self {
            min_entropy: 4.0,
            hash_distance_threshold: 5,
            max_images_per_page: 3,
            match_tolerance: 6,
            decode_timeout_secs: 10,
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Hits returned when the caller does not ask for a number
    pub default_top_k: usize,
    /// Hits fetched for answer generation and scoring
    pub answer_top_k: usize,
    /// Upper bound on any request
    pub max_top_k: usize,
    /// Character budget for the generation context
    pub context_max_chars: usize,
    /// Number of top hits whose pages are reported as sources
    pub source_pages: usize,
    /// Timeout for embedding + index query
    pub timeout_secs: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_top_k: 5,
            answer_top_k: 20,
            max_top_k: 20,
            context_max_chars: 4000,
            source_pages: 5,
            timeout_secs: 30,
        }
    }
}

/// Embedding backend selection
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Ollama embedding endpoint
    #[default]
    Ollama,
    /// Offline feature hashing (no model required)
    Hashing,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Which embedder to use
    pub provider: EmbeddingBackend,
    /// Embedding dimensions (768 for nomic-embed-text)
    pub dimensions: usize,
    /// Passages embedded per batch during ingestion
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingBackend::Ollama,
            dimensions: 768,
            batch_size: 32,
        }
    }
}

/// LLM (Ollama) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Embedding model name
    pub embed_model: String,
    /// Generation model name
    pub generate_model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Maximum tokens generated per answer
    pub max_tokens: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            embed_model: "nomic-embed-text".to_string(),
            generate_model: "llama3.1:8b".to_string(),
            temperature: 0.1,  // Low for extractive answers
            max_tokens: 300,
            timeout_secs: 60,
        }
    }
}

/// Figure storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding accepted figure images, one subdirectory per session
    pub figures_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let figures_dir = dirs::data_local_dir()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/")))
            .join("grounded-rag")
            .join("figures");

        Self { figures_dir }
    }
}

/// Ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Timeout for ingesting one document
    pub timeout_secs: u64,
    /// Publish an empty session when ingestion fails instead of keeping
    /// the previous document
    pub clear_session_on_failure: bool,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 300, // 5 minutes
            clear_session_on_failure: false,
        }
    }
}
