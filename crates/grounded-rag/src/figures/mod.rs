//! Figure fingerprinting and matching

mod hash;
mod matcher;

pub use hash::{image_entropy, luma_entropy, perceptual_hash};
pub use matcher::FigureMatcher;
