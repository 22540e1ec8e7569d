//! The rasterizer capability consumed by the converter.
//!
//! A rasterizer knows how to count pages in a PDF and how to turn one page into
//! an RGBA bitmap at a given DPI. The converter never talks to a PDF library
//! directly; hosts bind a backend once at startup and hand it over as an
//! `Arc<dyn PageRasterizer>`.

use crate::error::Result;
use image::RgbaImage;
use serde::Serialize;

/// Points per inch in PDF user space.
pub const POINTS_PER_INCH: f32 = 72.0;

/// Page count oracle and page rasterizer over an in-memory PDF.
///
/// Implementations must be safe to call from several worker threads at once
/// with the same document bytes.
pub trait PageRasterizer: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Number of pages in the document.
    fn page_count(&self, document: &[u8]) -> Result<usize>;

    /// Render page `index` (0-based) at `dpi`.
    ///
    /// The bitmap is `points * dpi / 72` pixels on each side.
    fn rasterize(&self, document: &[u8], index: usize, dpi: u32) -> Result<RgbaImage>;
}

/// Pixel length of `points` at `dpi`.
pub fn pixels_for_points(points: f32, dpi: u32) -> u32 {
    ((points * dpi as f32) / POINTS_PER_INCH) as u32
}

/// Information about a PDF document.
#[derive(Debug, Clone, Serialize)]
pub struct PdfInfo {
    /// Number of pages.
    pub page_count: usize,
    /// Per-page information.
    pub pages: Vec<PageInfo>,
}

/// Information about a single PDF page.
#[derive(Debug, Clone, Serialize)]
pub struct PageInfo {
    /// Page number (1-indexed).
    pub page_number: usize,
    /// Width in PDF points (1/72 inch).
    pub width_points: f32,
    /// Height in PDF points (1/72 inch).
    pub height_points: f32,
}

impl PageInfo {
    /// Get width in pixels at a given DPI.
    pub fn width_pixels(&self, dpi: u32) -> u32 {
        pixels_for_points(self.width_points, dpi)
    }

    /// Get height in pixels at a given DPI.
    pub fn height_pixels(&self, dpi: u32) -> u32 {
        pixels_for_points(self.height_points, dpi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_info_dimensions() {
        let info = PageInfo {
            page_number: 1,
            width_points: 612.0,  // US Letter width
            height_points: 792.0, // US Letter height
        };

        // At 72 DPI (1:1)
        assert_eq!(info.width_pixels(72), 612);
        assert_eq!(info.height_pixels(72), 792);

        // At 300 DPI
        assert_eq!(info.width_pixels(300), 2550);
        assert_eq!(info.height_pixels(300), 3300);
    }

    #[test]
    fn test_page_info_a4_dimensions() {
        // A4 paper: 210mm x 297mm = 595.28 x 841.89 points
        let info = PageInfo {
            page_number: 1,
            width_points: 595.28,
            height_points: 841.89,
        };

        assert_eq!(info.width_pixels(72), 595);
        assert_eq!(info.height_pixels(72), 841);

        let w150 = info.width_pixels(150);
        let h150 = info.height_pixels(150);
        assert!(w150 == 1240 || w150 == 1239, "Expected ~1240, got {}", w150);
        assert!(h150 == 1753 || h150 == 1754, "Expected ~1753-1754, got {}", h150);
    }

    #[test]
    fn test_pixels_scale_linearly_with_dpi() {
        assert_eq!(pixels_for_points(72.0, 1), 1);
        assert_eq!(pixels_for_points(144.0, 150), 300);
        assert_eq!(pixels_for_points(612.0, 1200), 10200);
    }

    #[test]
    fn test_pdf_info_serializes() {
        let info = PdfInfo {
            page_count: 1,
            pages: vec![PageInfo {
                page_number: 1,
                width_points: 792.0,
                height_points: 612.0,
            }],
        };
        let json = serde_json::to_string(&info).unwrap();
        assert!(json.contains("\"page_count\":1"));
        assert!(json.contains("\"width_points\":792.0"));
    }
}
