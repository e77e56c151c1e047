//! Pipeline coordinator: ingestion, question answering and figure matching

use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::{EmbeddingBackend, RagConfig};
use crate::error::{Error, Result};
use crate::figures::FigureMatcher;
use crate::ingestion::{DedupOutcome, FigureDeduplicator, PdfExtractor, WordChunker};
use crate::providers::ollama::ollama_pair;
use crate::providers::{
    AnswerGenerator, DocumentExtractor, EmbeddingProvider, FigureStore, HashingEmbedder,
    IndexFactory, InMemoryIndexFactory, LocalFigureStore, OllamaGenerator, VectorIndex,
};
use crate::retrieval::EvidenceRetriever;
use crate::scoring::{ConfidenceScorer, NOT_FOUND_ANSWER};
use crate::session::{Session, SessionStore};
use crate::types::{
    Answer, AskOutcome, ExtractedPage, Figure, IngestReport, IngestStats, MatchResult, Passage,
    Retrieval, RetrievalHit,
};

/// External collaborators the engine delegates to
#[derive(Clone)]
pub struct Providers {
    pub extractor: Arc<dyn DocumentExtractor>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub index_factory: Arc<dyn IndexFactory>,
    pub generator: Arc<dyn AnswerGenerator>,
    pub figure_store: Arc<dyn FigureStore>,
}

impl Providers {
    /// Build the default local/Ollama providers for a configuration
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        let dimensions = config.embeddings.dimensions;
        let context_max_chars = config.retrieval.context_max_chars;

        let (embedder, generator): (Arc<dyn EmbeddingProvider>, Arc<dyn AnswerGenerator>) =
            match config.embeddings.provider {
                EmbeddingBackend::Ollama => {
                    let (embedder, generator) = ollama_pair(&config.llm, dimensions, context_max_chars)?;
                    (Arc::new(embedder), Arc::new(generator))
                }
                EmbeddingBackend::Hashing => (
                    Arc::new(HashingEmbedder::new(dimensions)?),
                    Arc::new(OllamaGenerator::new(&config.llm, context_max_chars)?),
                ),
            };

        Ok(Self {
            extractor: Arc::new(PdfExtractor::new()),
            embedder,
            index_factory: Arc::new(InMemoryIndexFactory::new(dimensions)),
            generator,
            figure_store: Arc::new(LocalFigureStore::new(&config.storage.figures_dir)?),
        })
    }
}

/// The grounding pipeline around one active document session
pub struct RagEngine {
    config: RagConfig,
    providers: Providers,
    chunker: WordChunker,
    retriever: EvidenceRetriever,
    matcher: FigureMatcher,
    scorer: ConfidenceScorer,
    sessions: SessionStore,
    /// Serialises ingestions; queries never take it
    ingest_lock: Mutex<()>,
}

impl RagEngine {
    /// Create an engine with an empty session
    pub fn new(config: RagConfig, providers: Providers) -> Result<Self> {
        config.validate()?;

        let chunker = WordChunker::from_config(&config.chunking)?;
        let retriever = EvidenceRetriever::new(Arc::clone(&providers.embedder), config.retrieval.clone());
        let matcher = FigureMatcher::new(config.figures.match_tolerance);
        let scorer = ConfidenceScorer::new()?;

        let initial_id = Uuid::new_v4();
        let initial = Session::empty(initial_id, providers.index_factory.create_index(initial_id)?);

        info!(
            "RAG engine ready (extractor: {}, embedder: {}, index: {}, generator: {}/{}, figures: {})",
            providers.extractor.name(),
            providers.embedder.name(),
            providers.index_factory.name(),
            providers.generator.name(),
            providers.generator.model(),
            providers.figure_store.name(),
        );

        Ok(Self {
            config,
            providers,
            chunker,
            retriever,
            matcher,
            scorer,
            sessions: SessionStore::new(initial),
            ingest_lock: Mutex::new(()),
        })
    }

    /// Create an engine with the default providers
    pub fn from_config(config: RagConfig) -> Result<Self> {
        let providers = Providers::from_config(&config)?;
        Self::new(config, providers)
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Snapshot of the active session
    pub fn session(&self) -> Arc<Session> {
        self.sessions.snapshot()
    }

    /// Passages of the active session
    pub fn current_passages(&self) -> Vec<Passage> {
        self.sessions.snapshot().passages.clone()
    }

    /// Ingest a document and make it the active session
    ///
    /// The new session is published only once fully built. On failure its
    /// staged figures are removed and the previous session stays active,
    /// unless `ingestion.clear_session_on_failure` is set.
    pub async fn ingest(&self, document_name: &str, bytes: Vec<u8>) -> Result<IngestReport> {
        let _guard = self.ingest_lock.lock().await;
        let start = Instant::now();
        let session_id = Uuid::new_v4();
        let content_hash = hex::encode(Sha256::digest(&bytes));

        info!(
            "Ingesting '{}' ({} bytes) as session {}",
            document_name,
            bytes.len(),
            session_id
        );

        let staged = StagedFigures::new(Arc::clone(&self.providers.figure_store), session_id);
        let session = match self.build_session(session_id, document_name, &content_hash, bytes).await {
            Ok(session) => session,
            Err(e) => {
                log_failure("Ingestion", document_name, &e);
                staged.commit();
                self.discard_figures(session_id).await;
                if self.config.ingestion.clear_session_on_failure {
                    self.publish_empty().await;
                }
                return Err(e);
            }
        };

        let report = IngestReport {
            session_id,
            document_name: document_name.to_string(),
            content_hash,
            passages: session.passages.len(),
            figures: session.figures.clone(),
            stats: session.stats.clone(),
            processing_time_ms: start.elapsed().as_millis() as u64,
        };

        // No await between commit and publication
        staged.commit();
        let previous = self.sessions.replace(session);
        self.discard_figures(previous.id).await;

        let stats = &report.stats;
        info!(
            "Ingested '{}': {} pages, {} passages, {} figures ({} undecodable, {} low entropy, {} duplicates, {} over page limit) in {}ms",
            document_name,
            stats.pages,
            stats.passages,
            stats.figures.accepted,
            stats.figures.decode_failures,
            stats.figures.low_entropy,
            stats.figures.duplicates,
            stats.figures.page_limited,
            report.processing_time_ms
        );

        Ok(report)
    }

    async fn build_session(
        &self,
        session_id: Uuid,
        document_name: &str,
        content_hash: &str,
        bytes: Vec<u8>,
    ) -> Result<Session> {
        let extractor = Arc::clone(&self.providers.extractor);
        let pages = tokio::task::spawn_blocking(move || extractor.extract(&bytes))
            .await
            .map_err(|e| Error::internal(format!("Task join error: {}", e)))?
            .map_err(|e| match e {
                Error::Extraction { message, .. } => Error::extraction(document_name, message),
                other => other,
            })?;

        let mut stats = IngestStats {
            pages: pages.len(),
            pages_with_text: pages.iter().filter(|p| !p.text.trim().is_empty()).count(),
            extractor_skipped_images: pages.iter().map(|p| p.skipped_images).sum(),
            ..IngestStats::default()
        };

        let passages = self.chunker.chunk_pages(&pages);
        stats.passages = passages.len();
        if passages.is_empty() {
            warn!("'{}' produced no text passages", document_name);
        }

        let index = self.providers.index_factory.create_index(session_id)?;
        self.index_passages(index.as_ref(), &passages).await?;

        let outcome = self.dedup_figures(pages).await?;
        stats.figures = outcome.stats.clone();
        let figures = self.persist_figures(session_id, outcome).await?;

        Ok(Session {
            id: session_id,
            document_name: Some(document_name.to_string()),
            content_hash: Some(content_hash.to_string()),
            created_at: chrono::Utc::now(),
            passages,
            figures,
            index,
            stats,
        })
    }

    /// Embed passages in batches and add them to the index
    async fn index_passages(&self, index: &dyn VectorIndex, passages: &[Passage]) -> Result<()> {
        let batch_size = self.config.embeddings.batch_size;

        for (batch_number, batch) in passages.chunks(batch_size).enumerate() {
            let texts: Vec<String> = batch.iter().map(|p| p.text.clone()).collect();
            let vectors = self.providers.embedder.embed_batch(&texts).await.map_err(|e| match e {
                Error::Embedding(_) | Error::Timeout(_) => e,
                other => Error::embedding(other.to_string()),
            })?;

            if vectors.len() != batch.len() {
                return Err(Error::embedding(format!(
                    "Embedder returned {} vectors for {} passages",
                    vectors.len(),
                    batch.len()
                )));
            }

            let ids: Vec<String> = batch.iter().map(Passage::id).collect();
            let metadata: Vec<_> = batch.iter().map(Passage::to_index_metadata).collect();
            index.add(&ids, &vectors, &metadata).await.map_err(|e| match e {
                Error::VectorIndex(_) => e,
                other => Error::vector_index(other.to_string()),
            })?;

            debug!("Indexed batch {} ({} passages)", batch_number + 1, batch.len());
        }

        Ok(())
    }

    async fn dedup_figures(&self, pages: Vec<ExtractedPage>) -> Result<DedupOutcome> {
        let figure_config = self.config.figures.clone();
        tokio::task::spawn_blocking(move || FigureDeduplicator::new(figure_config).run(&pages))
            .await
            .map_err(|e| Error::internal(format!("Task join error: {}", e)))
    }

    /// Store accepted images and turn them into figures, preserving order
    async fn persist_figures(&self, session_id: Uuid, outcome: DedupOutcome) -> Result<Vec<Figure>> {
        let mut figures = Vec::with_capacity(outcome.accepted.len());

        for accepted in outcome.accepted {
            let path = self
                .providers
                .figure_store
                .put(session_id, accepted.page, accepted.image_index, &accepted.ext, &accepted.bytes)
                .await?;

            figures.push(Figure {
                hash: accepted.hash,
                page: accepted.page,
                image_index: accepted.image_index,
                path,
                entropy: accepted.entropy,
            });
        }

        Ok(figures)
    }

    /// Remove a session's figures and wait for it
    ///
    /// The removal runs on its own task and completes even if the caller is
    /// cancelled while waiting.
    async fn discard_figures(&self, session_id: Uuid) {
        if let Some(task) = spawn_clear(Arc::clone(&self.providers.figure_store), session_id) {
            if let Err(e) = task.await {
                warn!("Figure cleanup for session {} did not finish: {}", session_id, e);
            }
        }
    }

    async fn publish_empty(&self) {
        let empty_id = Uuid::new_v4();
        match self.providers.index_factory.create_index(empty_id) {
            Ok(index) => {
                let previous = self.sessions.replace(Session::empty(empty_id, index));
                info!("Cleared session {} after failed ingestion", previous.id);
                self.discard_figures(previous.id).await;
            }
            Err(e) => warn!("Could not create an empty session: {}", e),
        }
    }

    /// Retrieve hits from the active session
    pub async fn retrieve(&self, query: &str, k: Option<usize>) -> Result<Retrieval> {
        let session = self.sessions.snapshot();
        let k = k.unwrap_or(self.config.retrieval.default_top_k);
        self.retriever.retrieve(&session, query, k).await
    }

    /// Answer a question from the active document
    pub async fn ask(&self, question: &str, top_k: Option<usize>) -> Result<AskOutcome> {
        let start = Instant::now();
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::invalid_request("Question must not be empty"));
        }

        // One snapshot for the whole request
        let session = self.sessions.snapshot();
        let k = top_k.unwrap_or(self.config.retrieval.answer_top_k);

        let hits = match self.retriever.retrieve(&session, question, k).await? {
            Retrieval::EmptyCorpus => return Ok(AskOutcome::NoDocument),
            Retrieval::Hits(hits) => hits,
        };

        if hits.is_empty() {
            debug!("No evidence for question, answering with the not-found sentinel");
            return Ok(AskOutcome::Answered(Answer {
                answer: NOT_FOUND_ANSWER.to_string(),
                confidence: 0.0,
                sources: Vec::new(),
                figures: Vec::new(),
                hits,
                session_id: session.id,
                processing_time_ms: start.elapsed().as_millis() as u64,
            }));
        }

        let timeout = Duration::from_secs(self.config.llm.timeout_secs);
        let answer = tokio::time::timeout(timeout, self.providers.generator.generate(question, &hits))
            .await
            .map_err(|_| Error::Timeout(format!("Answer generation exceeded {}s", self.config.llm.timeout_secs)))
            .and_then(|generated| generated)
            .map_err(|e| {
                log_failure("Answer generation", question, &e);
                e
            })?;
        let answer = answer.trim().to_string();

        let confidence = self.scorer.score(&answer, &hits);
        let source_pages = source_pages(&hits, self.config.retrieval.source_pages);
        let sources = source_pages.iter().map(|p| format!("Page {}", p)).collect();
        let figures = session.figures_on_pages(&source_pages);

        info!(
            "Answered from {} hits (confidence {:.2}, {} figures) in {}ms",
            hits.len(),
            confidence,
            figures.len(),
            start.elapsed().as_millis()
        );

        Ok(AskOutcome::Answered(Answer {
            answer,
            confidence,
            sources,
            figures,
            hits,
            session_id: session.id,
            processing_time_ms: start.elapsed().as_millis() as u64,
        }))
    }

    /// Match an encoded image against the active session's figures
    ///
    /// Decoding is bounded by `figures.decode_timeout_secs`.
    pub async fn match_figure(&self, bytes: Vec<u8>) -> Result<MatchResult> {
        let session = self.sessions.snapshot();
        let matcher = self.matcher;
        let limit = self.config.figures.decode_timeout_secs;

        let task = tokio::task::spawn_blocking(move || matcher.match_image(&bytes, &session.figures));
        tokio::time::timeout(Duration::from_secs(limit), task)
            .await
            .map_err(|_| Error::Timeout(format!("Image matching exceeded {}s", limit)))?
            .map_err(|e| Error::internal(format!("Task join error: {}", e)))?
    }

    /// Whether the embedder and the generator answer their health checks
    pub async fn providers_ready(&self) -> bool {
        let (embedder, generator) = tokio::join!(
            self.providers.embedder.health_check(),
            self.providers.generator.health_check()
        );

        match (embedder, generator) {
            (Ok(true), Ok(true)) => true,
            (embedder, generator) => {
                warn!(
                    "Providers not ready (embedder {}: {:?}, generator {}: {:?})",
                    self.providers.embedder.name(),
                    embedder,
                    self.providers.generator.name(),
                    generator
                );
                false
            }
        }
    }
}

/// Figures written for a session that is not published yet
///
/// Dropping it uncommitted (a failed or cancelled ingestion) removes them.
struct StagedFigures {
    store: Arc<dyn FigureStore>,
    session_id: Uuid,
    armed: bool,
}

impl StagedFigures {
    fn new(store: Arc<dyn FigureStore>, session_id: Uuid) -> Self {
        Self {
            store,
            session_id,
            armed: true,
        }
    }

    fn commit(mut self) {
        self.armed = false;
    }
}

impl Drop for StagedFigures {
    fn drop(&mut self) {
        if self.armed {
            debug!("Ingestion of session {} abandoned, removing staged figures", self.session_id);
            spawn_clear(Arc::clone(&self.store), self.session_id);
        }
    }
}

/// Clear a session's figures on a detached task
fn spawn_clear(store: Arc<dyn FigureStore>, session_id: Uuid) -> Option<JoinHandle<()>> {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => Some(handle.spawn(async move {
            if let Err(e) = store.clear_session(session_id).await {
                warn!("Failed to clear figures of session {}: {}", session_id, e);
            }
        })),
        Err(_) => {
            warn!("No runtime to clear figures of session {}", session_id);
            None
        }
    }
}

/// Collaborator outages are errors; bad input is only a warning
fn log_failure(operation: &str, subject: &str, e: &Error) {
    if e.is_collaborator_failure() {
        error!("{} for '{}' failed in a provider: {}", operation, subject, e);
    } else {
        warn!("{} for '{}' rejected: {}", operation, subject, e);
    }
}

/// Unique pages of the first `limit` hits, in rank order
fn source_pages(hits: &[RetrievalHit], limit: usize) -> Vec<u32> {
    let mut pages = Vec::new();
    for hit in hits.iter().take(limit) {
        if !pages.contains(&hit.page) {
            pages.push(hit.page);
        }
    }
    pages
}
