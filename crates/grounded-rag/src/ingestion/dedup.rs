//! Figure deduplication: entropy filter, perceptual-hash duplicates, page limit

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

use crate::config::FigureConfig;
use crate::figures::{image_entropy, perceptual_hash};
use crate::types::{ExtractedPage, PerceptualHash};

/// Verdict for one candidate image
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    /// New canonical figure
    Accept,
    /// Entropy below the configured minimum
    LowEntropy,
    /// Within the distance threshold of an already accepted figure
    Duplicate { of: PerceptualHash },
    /// The page already holds its maximum number of figures
    PageLimit,
}

/// An image that survived deduplication, ready to be persisted
#[derive(Debug, Clone)]
pub struct AcceptedImage {
    pub page: u32,
    /// Position among the page's embedded images
    pub image_index: u32,
    pub hash: PerceptualHash,
    pub entropy: f64,
    pub bytes: Vec<u8>,
    pub ext: String,
}

/// Deduplication counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DedupStats {
    /// Candidate images handed over by the extractor
    pub images_seen: usize,
    /// Images that could not be decoded
    pub decode_failures: usize,
    /// Images rejected for low entropy
    pub low_entropy: usize,
    /// Images folded into an earlier figure
    pub duplicates: usize,
    /// Images skipped because their page was full
    pub page_limited: usize,
    /// Canonical figures
    pub accepted: usize,
    /// Duplicates observed per accepted hash (hex); diagnostic only
    pub duplicate_hits: BTreeMap<String, u32>,
}

/// Result of a deduplication run
#[derive(Debug, Clone, Default)]
pub struct DedupOutcome {
    /// Accepted images in page-then-insertion order
    pub accepted: Vec<AcceptedImage>,
    pub stats: DedupStats,
}

/// Selects canonical figures from a document's embedded images
pub struct FigureDeduplicator {
    config: FigureConfig,
    /// Accepted hashes in acceptance order
    seen: Vec<PerceptualHash>,
    page_counts: HashMap<u32, usize>,
    stats: DedupStats,
}

impl FigureDeduplicator {
    /// Create a deduplicator with empty state
    pub fn new(config: FigureConfig) -> Self {
        Self {
            config,
            seen: Vec::new(),
            page_counts: HashMap::new(),
            stats: DedupStats::default(),
        }
    }

    /// Forget everything accepted so far
    pub fn reset(&mut self) {
        self.seen.clear();
        self.page_counts.clear();
        self.stats = DedupStats::default();
    }

    /// Counters so far
    pub fn stats(&self) -> &DedupStats {
        &self.stats
    }

    fn page_full(&self, page: u32) -> bool {
        self.page_counts.get(&page).copied().unwrap_or(0) >= self.config.max_images_per_page
    }

    /// Decide on one already fingerprinted image and update state
    ///
    /// Checks run in order: page limit, entropy, duplicates. The
    /// first accepted hash within the threshold wins.
    pub fn consider(&mut self, page: u32, hash: PerceptualHash, entropy: f64) -> Decision {
        if self.page_full(page) {
            self.stats.page_limited += 1;
            return Decision::PageLimit;
        }

        if entropy < self.config.min_entropy {
            self.stats.low_entropy += 1;
            return Decision::LowEntropy;
        }

        let threshold = self.config.hash_distance_threshold;
        if let Some(existing) = self.seen.iter().find(|s| s.distance(&hash) <= threshold).copied() {
            self.stats.duplicates += 1;
            *self.stats.duplicate_hits.entry(existing.to_hex()).or_insert(0) += 1;
            return Decision::Duplicate { of: existing };
        }

        self.seen.push(hash);
        *self.page_counts.entry(page).or_insert(0) += 1;
        self.stats.accepted += 1;
        Decision::Accept
    }

    /// Process every page's images in order
    ///
    /// Starts from a clean state. Undecodable images are logged and counted.
    pub fn run(&mut self, pages: &[ExtractedPage]) -> DedupOutcome {
        self.reset();
        let mut accepted = Vec::new();

        for page in pages {
            for (index, raw) in page.images.iter().enumerate() {
                self.stats.images_seen += 1;

                // Full pages are skipped before paying for a decode
                if self.page_full(page.page) {
                    self.stats.page_limited += 1;
                    continue;
                }

                let image = match image::load_from_memory(&raw.bytes) {
                    Ok(image) => image,
                    Err(e) => {
                        warn!("Skipping undecodable image {} on page {}: {}", index, page.page, e);
                        self.stats.decode_failures += 1;
                        continue;
                    }
                };

                let entropy = image_entropy(&image);
                let hash = perceptual_hash(&image);

                match self.consider(page.page, hash, entropy) {
                    Decision::Accept => {
                        debug!("Accepted figure {} on page {} ({}, entropy {:.2})", index, page.page, hash, entropy);
                        accepted.push(AcceptedImage {
                            page: page.page,
                            image_index: index as u32,
                            hash,
                            entropy,
                            bytes: raw.bytes.clone(),
                            ext: raw.ext.clone(),
                        });
                    }
                    Decision::Duplicate { of } => {
                        debug!("Image {} on page {} duplicates {}", index, page.page, of);
                    }
                    Decision::LowEntropy => {
                        debug!("Image {} on page {} rejected, entropy {:.2}", index, page.page, entropy);
                    }
                    Decision::PageLimit => {}
                }
            }
        }

        DedupOutcome {
            accepted,
            stats: self.stats.clone(),
        }
    }
}
