//! Pure-Rust page rasterization using hayro.
//!
//! Needs no native library, which makes it the fallback for hosts where pdfium
//! cannot be installed. Enabled with the `hayro` cargo feature.

use crate::error::{ConversionError, Result};
use crate::raster::{PageRasterizer, POINTS_PER_INCH};
use hayro::hayro_interpret::InterpreterSettings;
use hayro::hayro_syntax::Pdf;
use hayro::{render, RenderSettings};
use image::RgbaImage;
use std::sync::Arc;
use tracing::debug;

/// [`PageRasterizer`] backed by hayro.
#[derive(Debug, Default, Clone, Copy)]
pub struct HayroRasterizer;

impl HayroRasterizer {
    pub fn new() -> Self {
        Self
    }

    fn open(document: &[u8]) -> Result<Pdf> {
        Pdf::new(Arc::new(document.to_vec())).map_err(|e| ConversionError::RasterizationFailure {
            page: None,
            message: format!("Failed to load PDF: {:?}", e),
        })
    }
}

impl PageRasterizer for HayroRasterizer {
    fn name(&self) -> &'static str {
        "hayro"
    }

    fn page_count(&self, document: &[u8]) -> Result<usize> {
        Ok(Self::open(document)?.pages().iter().count())
    }

    fn rasterize(&self, document: &[u8], index: usize, dpi: u32) -> Result<RgbaImage> {
        let pdf = Self::open(document)?;
        let pages = pdf.pages();
        let page = pages
            .iter()
            .nth(index)
            .ok_or_else(|| ConversionError::raster(index, "page index out of range"))?;

        let scale = dpi as f32 / POINTS_PER_INCH;
        let render_settings = RenderSettings {
            x_scale: scale,
            y_scale: scale,
            ..Default::default()
        };

        let pixmap = render(page, &InterpreterSettings::default(), &render_settings);

        // hayro hands out encoded PNG; decode back to RGBA so the converter's
        // own encoder and background handling apply uniformly.
        let image = image::load_from_memory_with_format(&pixmap.into_png(), image::ImageFormat::Png)
            .map_err(|e| ConversionError::raster(index, format!("Failed to decode bitmap: {}", e)))?
            .into_rgba8();

        debug!(
            "hayro rendered page {} at {}x{}",
            index + 1,
            image.width(),
            image.height()
        );

        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_document_fails_to_open() {
        let rasterizer = HayroRasterizer::new();
        assert_eq!(rasterizer.name(), "hayro");

        let result = rasterizer.page_count(b"definitely not a pdf");
        assert!(matches!(
            result,
            Err(ConversionError::RasterizationFailure { page: None, .. })
        ));
    }

    #[test]
    fn test_garbage_document_fails_to_rasterize() {
        let result = HayroRasterizer::new().rasterize(b"", 0, 72);
        assert!(matches!(
            result,
            Err(ConversionError::RasterizationFailure { page: None, .. })
        ));
    }
}
