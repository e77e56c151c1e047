//! Queries racing ingestions always observe exactly one document

mod common;

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use common::*;
use grounded_rag::{AskOutcome, PerceptualHash, RagEngine};

fn prefix_of(text: &str) -> &'static str {
    if text.starts_with("alpha") {
        "alpha"
    } else if text.starts_with("beta") {
        "beta"
    } else {
        panic!("passage from an unknown document: {}", text)
    }
}

fn figure_hashes(engine: &RagEngine) -> HashSet<PerceptualHash> {
    engine.session().figures.iter().map(|f| f.hash).collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_queries_during_swaps_see_a_single_document() {
    let h = harness(
        StaticExtractor::default()
            .with_document("alpha", prefixed_document("alpha", 100))
            .with_document("beta", prefixed_document("beta", 200)),
    );
    let engine = h.engine.clone();

    engine.ingest("beta.pdf", b"beta".to_vec()).await.unwrap();
    let beta_figures = figure_hashes(&engine);
    engine.ingest("alpha.pdf", b"alpha".to_vec()).await.unwrap();
    let alpha_figures = figure_hashes(&engine);
    assert!(alpha_figures.is_disjoint(&beta_figures));

    let done = Arc::new(AtomicBool::new(false));

    let ingester = {
        let engine = engine.clone();
        let done = done.clone();
        tokio::spawn(async move {
            for round in 0..10 {
                let (name, bytes) = if round % 2 == 0 {
                    ("beta.pdf", b"beta".to_vec())
                } else {
                    ("alpha.pdf", b"alpha".to_vec())
                };
                engine.ingest(name, bytes).await.unwrap();
                tokio::task::yield_now().await;
            }
            done.store(true, Ordering::SeqCst);
        })
    };

    let mut askers = Vec::new();
    for worker in 0..4 {
        let engine = engine.clone();
        let done = done.clone();
        let alpha_figures = alpha_figures.clone();
        let beta_figures = beta_figures.clone();
        askers.push(tokio::spawn(async move {
            let mut answers = 0usize;
            while !done.load(Ordering::SeqCst) || answers < 5 {
                let question = format!("alpha{} beta{}", worker, worker + 1);
                let answer = match engine.ask(&question, Some(6)).await.unwrap() {
                    AskOutcome::Answered(answer) => answer,
                    AskOutcome::NoDocument => panic!("a document is always loaded"),
                };

                let document = prefix_of(&answer.hits[0].text);
                assert!(answer.hits.iter().all(|hit| prefix_of(&hit.text) == document));
                assert_eq!(prefix_of(&answer.answer), document);

                let expected = if document == "alpha" { &alpha_figures } else { &beta_figures };
                assert!(answer.figures.iter().all(|f| expected.contains(&f.hash)));

                let snapshot = engine.session();
                let snapshot_document = prefix_of(&snapshot.passages[0].text);
                assert!(snapshot.passages.iter().all(|p| prefix_of(&p.text) == snapshot_document));

                answers += 1;
                tokio::task::yield_now().await;
            }
            answers
        }));
    }

    ingester.await.unwrap();
    for asker in askers {
        assert!(asker.await.unwrap() >= 5);
    }
}
