//! PDF extraction with lopdf

use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::Document;
use std::io::Cursor;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::providers::DocumentExtractor;
use crate::types::{ExtractedPage, RawImage};

/// Extracts page text and embedded raster images from PDF bytes
#[derive(Debug, Clone, Default)]
pub struct PdfExtractor;

impl PdfExtractor {
    pub fn new() -> Self {
        Self
    }

    fn extract_page(doc: &Document, page: u32, page_id: lopdf::ObjectId) -> ExtractedPage {
        let text = match doc.extract_text(&[page]) {
            Ok(text) => text,
            Err(e) => {
                debug!("No text extracted from page {}: {}", page, e);
                String::new()
            }
        };

        let mut extracted = ExtractedPage::text(page, text);

        let images = match doc.get_page_images(page_id) {
            Ok(images) => images,
            Err(e) => {
                debug!("Could not list images on page {}: {}", page, e);
                return extracted;
            }
        };

        for pdf_image in images {
            let filters = pdf_image.filters.clone().unwrap_or_default();
            let converted = match filters.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
                ["DCTDecode"] => Some(RawImage::new(pdf_image.content.to_vec(), "jpg")),
                [] => encode_pixels(
                    pdf_image.width,
                    pdf_image.height,
                    pdf_image.color_space.as_deref(),
                    pdf_image.bits_per_component,
                    pdf_image.content.to_vec(),
                ),
                ["FlateDecode"] => doc
                    .get_object(pdf_image.id)
                    .and_then(|object| object.as_stream())
                    .and_then(|stream| stream.decompressed_content())
                    .ok()
                    .and_then(|data| {
                        encode_pixels(
                            pdf_image.width,
                            pdf_image.height,
                            pdf_image.color_space.as_deref(),
                            pdf_image.bits_per_component,
                            data,
                        )
                    }),
                _ => None,
            };

            match converted {
                Some(raw) => extracted.images.push(raw),
                None => {
                    debug!(
                        "Skipping image {:?} on page {} (filters {:?}, color space {:?})",
                        pdf_image.id, page, filters, pdf_image.color_space
                    );
                    extracted.skipped_images += 1;
                }
            }
        }

        extracted
    }
}

impl DocumentExtractor for PdfExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<Vec<ExtractedPage>> {
        let doc = Document::load_mem(bytes)
            .map_err(|e| Error::extraction("document.pdf", format!("Failed to load PDF: {}", e)))?;

        let pages: Vec<ExtractedPage> = doc
            .get_pages()
            .into_iter()
            .map(|(page, page_id)| Self::extract_page(&doc, page, page_id))
            .collect();

        if pages.is_empty() {
            warn!("PDF contains no pages");
        }

        Ok(pages)
    }

    fn name(&self) -> &str {
        "lopdf"
    }
}

/// Re-encode an unfiltered 8-bit RGB or gray sample buffer as PNG
///
/// Returns `None` for any other layout or a buffer of the wrong size.
fn encode_pixels(
    width: i64,
    height: i64,
    color_space: Option<&str>,
    bits_per_component: Option<i64>,
    data: Vec<u8>,
) -> Option<RawImage> {
    if bits_per_component != Some(8) {
        return None;
    }
    let width = u32::try_from(width).ok()?;
    let height = u32::try_from(height).ok()?;

    let image = match color_space? {
        "DeviceRGB" => DynamicImage::ImageRgb8(RgbImage::from_raw(width, height, data)?),
        "DeviceGray" => DynamicImage::ImageLuma8(GrayImage::from_raw(width, height, data)?),
        _ => return None,
    };

    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).ok()?;
    Some(RawImage::new(bytes, "png"))
}
