//! Shared fakes for driving the engine without a PDF parser or an LLM

#![allow(dead_code)]

use async_trait::async_trait;
use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

use grounded_rag::config::{EmbeddingBackend, RagConfig};
use grounded_rag::error::{Error, Result};
use grounded_rag::providers::{
    AnswerGenerator, DocumentExtractor, HashingEmbedder, InMemoryIndexFactory, LocalFigureStore,
};
use grounded_rag::types::{ExtractedPage, RawImage, RetrievalHit};
use grounded_rag::{Providers, RagEngine};

pub const DIMENSIONS: usize = 128;

/// Returns canned pages keyed by the document bytes; unknown bytes fail
#[derive(Default)]
pub struct StaticExtractor {
    documents: HashMap<Vec<u8>, Vec<ExtractedPage>>,
}

impl StaticExtractor {
    pub fn with_document(mut self, key: &str, pages: Vec<ExtractedPage>) -> Self {
        self.documents.insert(key.as_bytes().to_vec(), pages);
        self
    }
}

impl DocumentExtractor for StaticExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<Vec<ExtractedPage>> {
        self.documents
            .get(bytes)
            .cloned()
            .ok_or_else(|| Error::extraction("document.pdf", "not a PDF"))
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Answers with the text of the best hit and counts calls
#[derive(Default)]
pub struct EchoGenerator {
    pub calls: AtomicUsize,
    pub fail: bool,
}

impl EchoGenerator {
    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnswerGenerator for EchoGenerator {
    async fn generate(&self, _question: &str, evidence: &[RetrievalHit]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::llm("model unavailable"));
        }
        Ok(evidence.first().map(|h| h.text.clone()).unwrap_or_default())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(!self.fail)
    }

    fn name(&self) -> &str {
        "echo"
    }

    fn model(&self) -> &str {
        "echo-1"
    }
}

/// An engine wired to fakes, with its figure directory
pub struct Harness {
    pub engine: Arc<RagEngine>,
    pub generator: Arc<EchoGenerator>,
    pub figures_dir: TempDir,
}

pub fn test_config(figures_dir: &TempDir) -> RagConfig {
    let mut config = RagConfig::default();
    config.embeddings.provider = EmbeddingBackend::Hashing;
    config.embeddings.dimensions = DIMENSIONS;
    config.embeddings.batch_size = 4;
    config.chunking.window_size = 20;
    config.chunking.overlap = 5;
    config.storage.figures_dir = figures_dir.path().to_path_buf();
    config
}

pub fn harness(extractor: StaticExtractor) -> Harness {
    harness_with(extractor, EchoGenerator::default(), |_| {})
}

pub fn harness_with(
    extractor: StaticExtractor,
    generator: EchoGenerator,
    configure: impl FnOnce(&mut RagConfig),
) -> Harness {
    let figures_dir = TempDir::new().unwrap();
    let mut config = test_config(&figures_dir);
    configure(&mut config);

    let generator = Arc::new(generator);
    let providers = Providers {
        extractor: Arc::new(extractor),
        embedder: Arc::new(HashingEmbedder::new(DIMENSIONS).unwrap()),
        index_factory: Arc::new(InMemoryIndexFactory::new(DIMENSIONS)),
        generator: generator.clone(),
        figure_store: Arc::new(LocalFigureStore::new(figures_dir.path()).unwrap()),
    };

    Harness {
        engine: Arc::new(RagEngine::new(config, providers).unwrap()),
        generator,
        figures_dir,
    }
}

pub fn png_bytes(image: &DynamicImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

/// High-entropy RGB noise; different seeds hash far apart
pub fn noise_png(seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let img = RgbImage::from_fn(48, 48, |_, _| Rgb([rng.gen(), rng.gen(), rng.gen()]));
    png_bytes(&DynamicImage::ImageRgb8(img))
}

/// Single-colour image, dropped by the entropy filter
pub fn flat_png() -> Vec<u8> {
    png_bytes(&DynamicImage::ImageLuma8(GrayImage::from_pixel(32, 32, Luma([200]))))
}

pub fn image(bytes: Vec<u8>) -> RawImage {
    RawImage::new(bytes, "png")
}

/// `count` words, each prefixed with `prefix`
pub fn words(prefix: &str, count: usize) -> String {
    (0..count)
        .map(|i| format!("{}{}", prefix, i))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Three pages about solar panels with a repeated logo and two real figures
pub fn solar_document() -> Vec<ExtractedPage> {
    vec![
        ExtractedPage::text(
            1,
            "Solar panels convert sunlight into electricity using photovoltaic cells made of silicon.",
        )
        .with_image(image(flat_png()))
        .with_image(image(noise_png(11))),
        ExtractedPage::text(
            2,
            "Inverters turn the direct current from the panels into alternating current for the home.",
        )
        .with_image(image(noise_png(11)))
        .with_image(image(noise_png(12))),
        ExtractedPage::text(3, ""),
    ]
}

/// Pages whose every word starts with `prefix`, each with one unique figure
pub fn prefixed_document(prefix: &str, seed_base: u64) -> Vec<ExtractedPage> {
    (1..=3)
        .map(|page| {
            ExtractedPage::text(page, words(prefix, 30))
                .with_image(image(noise_png(seed_base + page as u64)))
        })
        .collect()
}
