//! End-to-end pipeline behaviour with in-process providers

mod common;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use uuid::Uuid;

use common::*;
use grounded_rag::error::{Error, Result};
use grounded_rag::providers::{
    HashingEmbedder, IndexFactory, IndexMatch, IndexMetadata, LocalFigureStore, VectorIndex,
};
use grounded_rag::scoring::NOT_FOUND_ANSWER;
use grounded_rag::types::ExtractedPage;
use grounded_rag::{AskOutcome, MatchResult, Providers, RagEngine, Retrieval};

fn answered(outcome: AskOutcome) -> grounded_rag::Answer {
    match outcome {
        AskOutcome::Answered(answer) => answer,
        AskOutcome::NoDocument => panic!("expected an answer"),
    }
}

#[tokio::test]
async fn test_ask_before_ingest_reports_no_document() {
    let h = harness(StaticExtractor::default());

    let outcome = h.engine.ask("What is this about?", None).await.unwrap();
    assert!(matches!(outcome, AskOutcome::NoDocument));

    let retrieval = h.engine.retrieve("anything", None).await.unwrap();
    assert!(retrieval.is_empty_corpus());
    assert_eq!(h.generator.call_count(), 0);
}

#[tokio::test]
async fn test_ingest_builds_passages_and_figures() {
    let h = harness(StaticExtractor::default().with_document("solar", solar_document()));

    let report = h.engine.ingest("solar.pdf", b"solar".to_vec()).await.unwrap();

    assert_eq!(report.document_name, "solar.pdf");
    assert_eq!(report.content_hash, hex::encode(Sha256::digest(b"solar")));
    assert_eq!(report.passages, 2);
    assert_eq!(report.stats.pages, 3);
    assert_eq!(report.stats.pages_with_text, 2);

    let figures = &report.stats.figures;
    assert_eq!(figures.images_seen, 4);
    assert_eq!(figures.low_entropy, 1);
    assert_eq!(figures.duplicates, 1);
    assert_eq!(figures.accepted, 2);

    let pages: Vec<(u32, u32)> = report.figures.iter().map(|f| (f.page, f.image_index)).collect();
    assert_eq!(pages, vec![(1, 1), (2, 1)]);

    let session = h.engine.session();
    assert_eq!(session.id, report.session_id);
    assert_eq!(session.document_name.as_deref(), Some("solar.pdf"));
    assert!(session.has_document());

    for figure in &report.figures {
        let stored = h.figures_dir.path().join(&figure.path);
        assert!(stored.exists(), "missing {}", stored.display());
        assert!(figure.path.starts_with(&report.session_id.to_string()));
    }
}

#[tokio::test]
async fn test_ask_returns_scored_answer_with_sources_and_figures() {
    let h = harness(StaticExtractor::default().with_document("solar", solar_document()));
    h.engine.ingest("solar.pdf", b"solar".to_vec()).await.unwrap();

    let answer = answered(h.engine.ask("How do solar panels work?", None).await.unwrap());

    assert_eq!(h.generator.call_count(), 1);
    assert_eq!(answer.hits.len(), 2);
    assert_eq!(answer.answer, answer.hits[0].text);
    // Full overlap with the best hit, both hits supporting
    assert!((answer.confidence - 0.76).abs() < 1e-9, "confidence {}", answer.confidence);

    let mut sources = answer.sources.clone();
    sources.sort();
    assert_eq!(sources, vec!["Page 1".to_string(), "Page 2".to_string()]);
    assert_eq!(answer.figures.len(), 2);
    assert_eq!(answer.session_id, h.engine.session().id);
}

#[tokio::test]
async fn test_figures_follow_reported_source_pages() {
    let h = harness_with(
        StaticExtractor::default().with_document("solar", solar_document()),
        EchoGenerator::default(),
        |config| config.retrieval.source_pages = 1,
    );
    h.engine.ingest("solar.pdf", b"solar".to_vec()).await.unwrap();

    let answer = answered(h.engine.ask("How do solar panels work?", None).await.unwrap());

    let top_page = answer.hits[0].page;
    assert_eq!(answer.sources, vec![format!("Page {}", top_page)]);
    assert_eq!(answer.figures.len(), 1);
    assert_eq!(answer.figures[0].page, top_page);
}

#[tokio::test]
async fn test_empty_question_rejected() {
    let h = harness(StaticExtractor::default().with_document("solar", solar_document()));
    h.engine.ingest("solar.pdf", b"solar".to_vec()).await.unwrap();

    let result = h.engine.ask("   ", None).await;
    assert!(matches!(result, Err(Error::InvalidRequest(_))));
}

#[tokio::test]
async fn test_retrieve_clamps_requested_hits() {
    let document: Vec<ExtractedPage> = (1..=4)
        .map(|page| ExtractedPage::text(page, words("w", 40)))
        .collect();
    let h = harness_with(
        StaticExtractor::default().with_document("long", document),
        EchoGenerator::default(),
        |config| config.retrieval.max_top_k = 6,
    );
    let report = h.engine.ingest("long.pdf", b"long".to_vec()).await.unwrap();
    assert!(report.passages > 6);

    let hits = |r: Retrieval| r.hits().len();
    assert_eq!(hits(h.engine.retrieve("w3 w4", Some(0)).await.unwrap()), 1);
    assert_eq!(hits(h.engine.retrieve("w3 w4", Some(2)).await.unwrap()), 2);
    assert_eq!(hits(h.engine.retrieve("w3 w4", Some(100)).await.unwrap()), 6);
    assert_eq!(hits(h.engine.retrieve("w3 w4", None).await.unwrap()), 5);
}

#[tokio::test]
async fn test_providers_ready_follows_health_checks() {
    let healthy = harness(StaticExtractor::default());
    assert!(healthy.engine.providers_ready().await);

    let down = harness_with(StaticExtractor::default(), EchoGenerator::failing(), |_| {});
    assert!(!down.engine.providers_ready().await);
}

#[tokio::test]
async fn test_generator_failure_is_not_an_answer() {
    let h = harness_with(
        StaticExtractor::default().with_document("solar", solar_document()),
        EchoGenerator::failing(),
        |_| {},
    );
    h.engine.ingest("solar.pdf", b"solar".to_vec()).await.unwrap();

    let result = h.engine.ask("How do solar panels work?", None).await;
    assert!(matches!(result, Err(Error::Llm(_))));
}

#[tokio::test]
async fn test_match_figure_against_session() {
    let h = harness(StaticExtractor::default().with_document("solar", solar_document()));

    let before = h.engine.match_figure(noise_png(12)).await.unwrap();
    assert_eq!(before, MatchResult::NoMatch { best_distance: None });

    h.engine.ingest("solar.pdf", b"solar".to_vec()).await.unwrap();

    match h.engine.match_figure(noise_png(12)).await.unwrap() {
        MatchResult::Matched { figure, distance } => {
            assert_eq!(distance, 0);
            assert_eq!(figure.page, 2);
        }
        other => panic!("expected a match, got {:?}", other),
    }

    match h.engine.match_figure(noise_png(4242)).await.unwrap() {
        MatchResult::NoMatch { best_distance } => assert!(best_distance.unwrap() > 6),
        other => panic!("unexpected match {:?}", other),
    }

    let result = h.engine.match_figure(b"not an image".to_vec()).await;
    assert!(matches!(result, Err(Error::ImageDecode(_))));
}

#[tokio::test]
async fn test_document_without_text_has_figures_but_no_answers() {
    let document = vec![ExtractedPage::text(1, "  ").with_image(image(noise_png(5)))];
    let h = harness(StaticExtractor::default().with_document("scan", document));

    let report = h.engine.ingest("scan.pdf", b"scan".to_vec()).await.unwrap();
    assert_eq!(report.passages, 0);
    assert_eq!(report.figures.len(), 1);

    let outcome = h.engine.ask("What is shown?", None).await.unwrap();
    assert!(matches!(outcome, AskOutcome::NoDocument));
    assert!(h.engine.match_figure(noise_png(5)).await.unwrap().is_match());
}

#[tokio::test]
async fn test_reingest_replaces_session_and_removes_old_figures() {
    let h = harness(
        StaticExtractor::default()
            .with_document("alpha", prefixed_document("alpha", 100))
            .with_document("beta", prefixed_document("beta", 200)),
    );

    let first = h.engine.ingest("alpha.pdf", b"alpha".to_vec()).await.unwrap();
    let first_dir = h.figures_dir.path().join(first.session_id.to_string());
    assert!(first_dir.exists());

    let second = h.engine.ingest("beta.pdf", b"beta".to_vec()).await.unwrap();
    assert_ne!(first.session_id, second.session_id);
    assert!(!first_dir.exists());
    assert!(h.figures_dir.path().join(second.session_id.to_string()).exists());

    let passages = h.engine.current_passages();
    assert!(!passages.is_empty());
    assert!(passages.iter().all(|p| p.text.starts_with("beta")));

    // Figures of the replaced document no longer match
    let stale = h.engine.match_figure(noise_png(101)).await.unwrap();
    assert!(!stale.is_match());
}

#[tokio::test]
async fn test_failed_ingest_keeps_previous_session() {
    let h = harness(StaticExtractor::default().with_document("solar", solar_document()));
    let report = h.engine.ingest("solar.pdf", b"solar".to_vec()).await.unwrap();

    let result = h.engine.ingest("broken.pdf", b"garbage".to_vec()).await;
    match result {
        Err(Error::Extraction { filename, .. }) => assert_eq!(filename, "broken.pdf"),
        other => panic!("expected an extraction error, got {:?}", other.map(|r| r.session_id)),
    }

    assert_eq!(h.engine.session().id, report.session_id);
    let outcome = h.engine.ask("How do solar panels work?", None).await.unwrap();
    assert!(matches!(outcome, AskOutcome::Answered(_)));
}

#[tokio::test]
async fn test_failed_ingest_can_clear_session() {
    let h = harness_with(
        StaticExtractor::default().with_document("solar", solar_document()),
        EchoGenerator::default(),
        |config| config.ingestion.clear_session_on_failure = true,
    );
    let report = h.engine.ingest("solar.pdf", b"solar".to_vec()).await.unwrap();

    assert!(h.engine.ingest("broken.pdf", b"garbage".to_vec()).await.is_err());

    let session = h.engine.session();
    assert_ne!(session.id, report.session_id);
    assert!(!session.has_document());
    assert!(!h.figures_dir.path().join(report.session_id.to_string()).exists());

    let outcome = h.engine.ask("How do solar panels work?", None).await.unwrap();
    assert!(matches!(outcome, AskOutcome::NoDocument));
}

/// Index that stores vectors but never returns any of them
struct SilentIndex(parking_lot::Mutex<usize>);

#[async_trait]
impl VectorIndex for SilentIndex {
    async fn add(&self, ids: &[String], _vectors: &[Vec<f32>], _metadata: &[IndexMetadata]) -> Result<()> {
        *self.0.lock() += ids.len();
        Ok(())
    }

    async fn delete(&self, _ids: &[String]) -> Result<usize> {
        Ok(0)
    }

    async fn query(&self, _vector: &[f32], _k: usize) -> Result<Vec<IndexMatch>> {
        Ok(Vec::new())
    }

    async fn count(&self) -> Result<usize> {
        Ok(*self.0.lock())
    }

    fn name(&self) -> &str {
        "silent"
    }
}

struct SilentIndexFactory;

impl IndexFactory for SilentIndexFactory {
    fn create_index(&self, _session_id: Uuid) -> Result<Arc<dyn VectorIndex>> {
        Ok(Arc::new(SilentIndex(parking_lot::Mutex::new(0))))
    }

    fn name(&self) -> &str {
        "silent"
    }
}

#[tokio::test]
async fn test_no_hits_answers_with_sentinel_without_generating() {
    let figures_dir = tempfile::TempDir::new().unwrap();
    let config = test_config(&figures_dir);
    let generator = Arc::new(EchoGenerator::default());
    let providers = Providers {
        extractor: Arc::new(StaticExtractor::default().with_document("solar", solar_document())),
        embedder: Arc::new(HashingEmbedder::new(DIMENSIONS).unwrap()),
        index_factory: Arc::new(SilentIndexFactory),
        generator: generator.clone(),
        figure_store: Arc::new(LocalFigureStore::new(figures_dir.path()).unwrap()),
    };
    let engine = RagEngine::new(config, providers).unwrap();
    engine.ingest("solar.pdf", b"solar".to_vec()).await.unwrap();

    let answer = answered(engine.ask("How do solar panels work?", None).await.unwrap());

    assert_eq!(answer.answer, NOT_FOUND_ANSWER);
    assert_eq!(answer.confidence, 0.0);
    assert!(answer.sources.is_empty());
    assert!(answer.figures.is_empty());
    assert_eq!(generator.call_count(), 0);
}
