//! Figure records, perceptual fingerprints and match results

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 64-bit perceptual fingerprint of an image
///
/// Serialised as 16 lowercase hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct PerceptualHash(pub u64);

impl PerceptualHash {
    /// Number of differing bits
    pub fn distance(&self, other: &PerceptualHash) -> u32 {
        (self.0 ^ other.0).count_ones()
    }

    /// Hex form
    pub fn to_hex(&self) -> String {
        format!("{:016x}", self.0)
    }
}

impl fmt::Display for PerceptualHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl FromStr for PerceptualHash {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.len() != 16 {
            return Err(format!("perceptual hash must be 16 hex digits, got {}", s.len()));
        }
        u64::from_str_radix(s, 16)
            .map(PerceptualHash)
            .map_err(|e| format!("invalid perceptual hash '{}': {}", s, e))
    }
}

impl From<PerceptualHash> for String {
    fn from(hash: PerceptualHash) -> Self {
        hash.to_hex()
    }
}

impl TryFrom<String> for PerceptualHash {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

/// A canonical figure accepted for the active document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Figure {
    /// Perceptual hash at capture time
    pub hash: PerceptualHash,
    /// Page the figure was found on
    pub page: u32,
    /// Index of the image among the page's embedded images
    pub image_index: u32,
    /// Storage location returned by the figure store
    pub path: String,
    /// Luma entropy at capture time
    pub entropy: f64,
}

/// Outcome of matching a submitted image against the session's figures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MatchResult {
    /// The closest figure is within tolerance
    Matched {
        figure: Figure,
        distance: u32,
    },
    /// Nothing within tolerance; `best_distance` is `None` when the session has no figures
    NoMatch {
        best_distance: Option<u32>,
    },
}

impl MatchResult {
    /// Whether a figure matched
    pub fn is_match(&self) -> bool {
        matches!(self, MatchResult::Matched { .. })
    }

    /// The matched figure, if any
    pub fn figure(&self) -> Option<&Figure> {
        match self {
            MatchResult::Matched { figure, .. } => Some(figure),
            MatchResult::NoMatch { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_counts_differing_bits() {
        let a = PerceptualHash(0);
        assert_eq!(a.distance(&PerceptualHash(0)), 0);
        assert_eq!(a.distance(&PerceptualHash(0b1011)), 3);
        assert_eq!(a.distance(&PerceptualHash(u64::MAX)), 64);
    }

    #[test]
    fn test_hash_serializes_as_hex() {
        let hash = PerceptualHash(0xdead_beef_0000_0001);
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, "\"deadbeef00000001\"");

        let parsed: PerceptualHash = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, hash);
        assert!("xyz".parse::<PerceptualHash>().is_err());
    }

    #[test]
    fn test_match_result_tagged() {
        let json = serde_json::to_value(MatchResult::NoMatch { best_distance: Some(12) }).unwrap();
        assert_eq!(json["status"], "no_match");
        assert_eq!(json["best_distance"], 12);
    }
}
