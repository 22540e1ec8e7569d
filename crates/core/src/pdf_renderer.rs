//! Page rasterization using pdfium (Google's PDF engine).
//!
//! The pdfium library is bound once, when the host builds a
//! [`PdfiumRasterizer`]. The resulting handle is shared by every worker; each
//! call loads the document from the shared, read-only bytes.

use crate::error::{ConversionError, Result};
use crate::raster::{pixels_for_points, PageInfo, PageRasterizer, PdfInfo};
use image::RgbaImage;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// Directories searched for the pdfium shared library, in order.
const LIBRARY_DIRS: &[&str] = &["./", "./lib", "/usr/lib", "/usr/local/lib"];

/// [`PageRasterizer`] backed by a bound pdfium library.
///
/// pdfium itself is single-threaded: with the `thread_safe` binding every
/// call goes through one global lock, and each `rasterize` call parses the
/// document again. Page rendering through this backend is therefore
/// serialised; the worker pool only overlaps PNG encoding and file writes.
/// Use the `hayro` backend for rendering that scales with threads.
pub struct PdfiumRasterizer {
    pdfium: Pdfium,
}

impl std::fmt::Debug for PdfiumRasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfiumRasterizer").finish_non_exhaustive()
    }
}

impl PdfiumRasterizer {
    /// Bind pdfium from `PDFIUM_DYNAMIC_LIB_PATH`, the usual library
    /// directories, or the system library path.
    pub fn new() -> Result<Self> {
        if let Ok(dir) = std::env::var("PDFIUM_DYNAMIC_LIB_PATH") {
            if let Ok(rasterizer) = Self::from_library_dir(Path::new(&dir)) {
                return Ok(rasterizer);
            }
        }

        let bindings = LIBRARY_DIRS
            .iter()
            .find_map(|dir| {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)).ok()
            })
            .map(Ok)
            .unwrap_or_else(Pdfium::bind_to_system_library)
            .map_err(|e| {
                ConversionError::PdfiumError(format!("Failed to load pdfium library: {}", e))
            })?;

        info!("pdfium bound");
        Ok(Self {
            pdfium: Pdfium::new(bindings),
        })
    }

    /// Bind pdfium from a specific directory.
    pub fn from_library_dir(dir: &Path) -> Result<Self> {
        let bindings =
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)).map_err(
                |e| {
                    ConversionError::PdfiumError(format!(
                        "Failed to load pdfium library from {}: {}",
                        dir.display(),
                        e
                    ))
                },
            )?;

        info!("pdfium bound from {:?}", dir);
        Ok(Self {
            pdfium: Pdfium::new(bindings),
        })
    }

    fn open<'a>(&'a self, document: &'a [u8]) -> Result<PdfDocument<'a>> {
        self.pdfium
            .load_pdf_from_byte_slice(document, None)
            .map_err(|e| ConversionError::RasterizationFailure {
                page: None,
                message: format!("Failed to load PDF: {}", e),
            })
    }

    /// Page count and page sizes, without rendering anything.
    pub fn document_info(&self, document: &[u8]) -> Result<PdfInfo> {
        let document = self.open(document)?;

        let page_count = document.pages().len() as usize;
        let mut pages = Vec::with_capacity(page_count);

        for (i, page) in document.pages().iter().enumerate() {
            pages.push(PageInfo {
                page_number: i + 1,
                width_points: page.width().value,
                height_points: page.height().value,
            });
        }

        Ok(PdfInfo { page_count, pages })
    }
}

impl PageRasterizer for PdfiumRasterizer {
    fn name(&self) -> &'static str {
        "pdfium"
    }

    fn page_count(&self, document: &[u8]) -> Result<usize> {
        let document = self.open(document)?;
        Ok(document.pages().len() as usize)
    }

    fn rasterize(&self, document: &[u8], index: usize, dpi: u32) -> Result<RgbaImage> {
        let document = self.open(document)?;

        let page_index = u16::try_from(index)
            .map_err(|_| ConversionError::raster(index, "page index out of range"))?;
        let page = document
            .pages()
            .get(page_index)
            .map_err(|e| ConversionError::raster(index, format!("Failed to get page: {}", e)))?;

        let width = pixels_for_points(page.width().value, dpi);
        let height = pixels_for_points(page.height().value, dpi);

        let render_config = PdfRenderConfig::new()
            .set_target_width(width as i32)
            .set_target_height(height as i32)
            .rotate_if_landscape(PdfPageRenderRotation::None, false)
            .render_form_data(true)
            .render_annotations(true);

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| ConversionError::raster(index, format!("Failed to render: {}", e)))?;

        debug!("pdfium rendered page {} at {}x{}", index + 1, width, height);

        Ok(bitmap.as_image().into_rgba8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_library_dir_is_pdfium_error() {
        let result = PdfiumRasterizer::from_library_dir(Path::new("/nonexistent/pdfium"));
        assert!(matches!(result, Err(ConversionError::PdfiumError(_))));
    }

    #[test]
    fn test_garbage_document_fails_to_open() {
        // Only meaningful when pdfium is installed.
        let rasterizer = match PdfiumRasterizer::new() {
            Ok(r) => r,
            Err(ConversionError::PdfiumError(_)) => return,
            Err(e) => panic!("Unexpected error: {:?}", e),
        };

        let result = rasterizer.page_count(b"definitely not a pdf");
        assert!(matches!(
            result,
            Err(ConversionError::RasterizationFailure { page: None, .. })
        ));
        assert_eq!(rasterizer.name(), "pdfium");
    }
}
