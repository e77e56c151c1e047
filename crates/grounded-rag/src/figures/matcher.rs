//! Nearest-figure lookup by perceptual hash distance

use crate::error::{Error, Result};
use crate::figures::perceptual_hash;
use crate::types::{Figure, MatchResult, PerceptualHash};

/// Matches a submitted image against a session's figures
#[derive(Debug, Clone, Copy)]
pub struct FigureMatcher {
    /// Largest Hamming distance that still counts as a match
    tolerance: u32,
}

impl Default for FigureMatcher {
    fn default() -> Self {
        Self { tolerance: 6 }
    }
}

impl FigureMatcher {
    pub fn new(tolerance: u32) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> u32 {
        self.tolerance
    }

    /// Closest figure to `hash`; the earliest figure wins ties
    pub fn match_hash(&self, hash: PerceptualHash, figures: &[Figure]) -> MatchResult {
        let mut best: Option<(&Figure, u32)> = None;

        for figure in figures {
            let distance = figure.hash.distance(&hash);
            let closer = best.map_or(true, |(_, best_distance)| distance < best_distance);
            if closer {
                best = Some((figure, distance));
            }
        }

        match best {
            Some((figure, distance)) if distance <= self.tolerance => MatchResult::Matched {
                figure: figure.clone(),
                distance,
            },
            Some((_, distance)) => MatchResult::NoMatch {
                best_distance: Some(distance),
            },
            None => MatchResult::NoMatch { best_distance: None },
        }
    }

    /// Decode, fingerprint and match an encoded image
    pub fn match_image(&self, bytes: &[u8], figures: &[Figure]) -> Result<MatchResult> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| Error::ImageDecode(format!("Could not decode image: {}", e)))?;
        Ok(self.match_hash(perceptual_hash(&image), figures))
    }
}
