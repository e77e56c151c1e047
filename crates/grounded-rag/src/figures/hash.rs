//! Image fingerprints: luma entropy and DCT perceptual hash

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage};
use std::f64::consts::PI;

use crate::types::PerceptualHash;

/// Side of the square the image is reduced to before the DCT
const SAMPLE_SIZE: usize = 32;
/// Side of the low-frequency block kept from the DCT
const HASH_SIZE: usize = 8;

impl PerceptualHash {
    /// Fingerprint a decoded image
    pub fn from_image(image: &DynamicImage) -> Self {
        perceptual_hash(image)
    }
}

/// Shannon entropy (bits) of the 256-bin luma histogram
///
/// Returns 0.0 for an image without pixels.
pub fn image_entropy(image: &DynamicImage) -> f64 {
    luma_entropy(&image.to_luma8())
}

/// Shannon entropy of an already converted grayscale image
pub fn luma_entropy(gray: &GrayImage) -> f64 {
    let total = gray.as_raw().len();
    if total == 0 {
        return 0.0;
    }

    let mut histogram = [0usize; 256];
    for value in gray.as_raw() {
        histogram[*value as usize] += 1;
    }

    let total = total as f64;
    let mut entropy = 0.0;
    for count in histogram.iter().filter(|c| **c > 0) {
        let p = *count as f64 / total;
        entropy -= p * p.log2();
    }

    entropy
}

/// Perceptual hash of an image
///
/// Grayscale, Lanczos resize to 32x32, 2-D DCT-II, 8x8 low-frequency block,
/// one bit per coefficient above the block median. Bits are packed row-major,
/// most significant first.
pub fn perceptual_hash(image: &DynamicImage) -> PerceptualHash {
    let gray = image.to_luma8();
    let small = image::imageops::resize(
        &gray,
        SAMPLE_SIZE as u32,
        SAMPLE_SIZE as u32,
        FilterType::Lanczos3,
    );

    let pixels: Vec<f64> = small.as_raw().iter().map(|v| *v as f64).collect();
    let coefficients = low_frequency_dct(&pixels);

    let mut sorted = coefficients;
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    let median = (sorted[mid - 1] + sorted[mid]) / 2.0;

    let mut bits = 0u64;
    for coefficient in coefficients.iter() {
        bits <<= 1;
        if *coefficient > median {
            bits |= 1;
        }
    }

    PerceptualHash(bits)
}

/// Top-left HASH_SIZE x HASH_SIZE block of the separable DCT-II of a
/// SAMPLE_SIZE x SAMPLE_SIZE row-major matrix
fn low_frequency_dct(pixels: &[f64]) -> [f64; HASH_SIZE * HASH_SIZE] {
    let n = SAMPLE_SIZE as f64;
    let mut cosines = [[0.0f64; SAMPLE_SIZE]; HASH_SIZE];
    for (k, row) in cosines.iter_mut().enumerate() {
        for (x, value) in row.iter_mut().enumerate() {
            *value = (PI * k as f64 * (2.0 * x as f64 + 1.0) / (2.0 * n)).cos();
        }
    }

    // Transform along columns (over row index) first
    let mut partial = [[0.0f64; SAMPLE_SIZE]; HASH_SIZE];
    for u in 0..HASH_SIZE {
        for col in 0..SAMPLE_SIZE {
            let mut sum = 0.0;
            for row in 0..SAMPLE_SIZE {
                sum += pixels[row * SAMPLE_SIZE + col] * cosines[u][row];
            }
            partial[u][col] = sum;
        }
    }

    let mut block = [0.0f64; HASH_SIZE * HASH_SIZE];
    for u in 0..HASH_SIZE {
        for v in 0..HASH_SIZE {
            let mut sum = 0.0;
            for col in 0..SAMPLE_SIZE {
                sum += partial[u][col] * cosines[v][col];
            }
            block[u * HASH_SIZE + v] = sum;
        }
    }

    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage};
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn noise(seed: u64, size: u32) -> DynamicImage {
        let mut rng = StdRng::seed_from_u64(seed);
        let img = RgbImage::from_fn(size, size, |_, _| Rgb([rng.gen(), rng.gen(), rng.gen()]));
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_flat_image_has_zero_entropy() {
        let img = GrayImage::from_pixel(16, 16, Luma([200]));
        assert_eq!(luma_entropy(&img), 0.0);
        assert_eq!(luma_entropy(&GrayImage::new(0, 0)), 0.0);
    }

    #[test]
    fn test_sixteen_equal_levels_is_four_bits() {
        // 16 columns, one level each, equally frequent
        let img = GrayImage::from_fn(16, 4, |x, _| Luma([(x * 16) as u8]));
        assert_eq!(luma_entropy(&img), 4.0);
    }

    #[test]
    fn test_gray_rgb_entropy_matches_luma() {
        let img = RgbImage::from_fn(16, 4, |x, _| {
            let v = (x * 16) as u8;
            Rgb([v, v, v])
        });
        assert_eq!(image_entropy(&DynamicImage::ImageRgb8(img)), 4.0);
    }

    #[test]
    fn test_identical_images_hash_identically() {
        let a = perceptual_hash(&noise(7, 64));
        let b = perceptual_hash(&noise(7, 64));
        assert_eq!(a.distance(&b), 0);
    }

    #[test]
    fn test_hash_ignores_uniform_brightness_shift() {
        let mut rng = StdRng::seed_from_u64(11);
        let base = GrayImage::from_fn(64, 64, |_, _| Luma([rng.gen_range(60u8..170)]));
        let brighter = GrayImage::from_fn(64, 64, |x, y| Luma([base.get_pixel(x, y)[0] + 30]));

        let a = perceptual_hash(&DynamicImage::ImageLuma8(base));
        let b = perceptual_hash(&DynamicImage::ImageLuma8(brighter));
        assert!(a.distance(&b) <= 2, "distance {}", a.distance(&b));
    }

    #[test]
    fn test_unrelated_noise_hashes_differ() {
        let a = perceptual_hash(&noise(1, 64));
        let b = perceptual_hash(&noise(2, 64));
        assert!(a.distance(&b) > 6);
    }
}
