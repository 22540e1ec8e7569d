//! # pdf-to-png-core
//!
//! Batch PDF to PNG conversion, one image per page.
//!
//! The library validates a request, resolves where every page goes, renders
//! the first page on the calling thread and the rest on a bounded worker pool,
//! and writes PNG files:
//!
//! - **pdfium** (Google's PDF engine) or **hayro** (pure Rust, `hayro`
//!   feature) behind the [`PageRasterizer`] trait
//! - **png** crate encoding with configurable compression
//! - **rayon** for parallel page rendering
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_to_png_core::{BatchPageConverter, ConversionRequest, PdfiumRasterizer, RenderConfig};
//! use std::sync::Arc;
//!
//! fn main() -> anyhow::Result<()> {
//!     // Bind pdfium once at startup and share it.
//!     let rasterizer = Arc::new(PdfiumRasterizer::new()?);
//!     let converter = BatchPageConverter::new(rasterizer, RenderConfig::default())?;
//!
//!     // report.pdf -> out/report_page1.png, out/report_page2.png, ...
//!     let request = ConversionRequest::new("report.pdf", "out/report.png").with_dpi(150);
//!     let report = converter.convert(&request)?;
//!
//!     println!("Rendered {} pages", report.page_count);
//!     Ok(())
//! }
//! ```
//!
//! ## Named pages in subdirectories
//!
//! ```rust,no_run
//! use pdf_to_png_core::{BatchPageConverterBuilder, ConversionRequest, PdfiumRasterizer};
//! use std::sync::Arc;
//!
//! fn main() -> anyhow::Result<()> {
//!     let converter = BatchPageConverterBuilder::new()
//!         .render_threads(4)
//!         .build(Arc::new(PdfiumRasterizer::new()?))?;
//!
//!     // out/alpha/Apple.png and out/beta/Banana.png
//!     let request = ConversionRequest::new("fruit.pdf", "out/fruit.png")
//!         .with_total_pages(2)
//!         .with_page_names(["Apple", "Banana"])
//!         .with_page_paths(["alpha", "beta"]);
//!     converter.convert(&request)?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod converter;
pub mod encode;
pub mod error;
#[cfg(feature = "hayro")]
pub mod hayro_renderer;
pub mod paths;
pub mod pdf_renderer;
pub mod raster;
pub mod status;
pub mod validate;

// Re-export main types for convenience
pub use config::{
    BatchResult, ConversionReport, ConversionRequest, ConversionStage, FailedFile, NamingMode,
    PageOutcome, PageTask, RenderConfig, RenderedPage, DEFAULT_DPI, MAX_DPI,
};
pub use converter::{BatchPageConverter, BatchPageConverterBuilder, ConverterStats};
pub use error::{ConversionError, Result};
#[cfg(feature = "hayro")]
pub use hayro_renderer::HayroRasterizer;
pub use paths::sanitize_file_name;
pub use pdf_renderer::PdfiumRasterizer;
pub use raster::{PageInfo, PageRasterizer, PdfInfo};

/// Initialize the library's logging.
/// Call this once at application startup if you want to see logs.
pub fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();
}

/// Like [`init_logging`], but falls back to `default_filter` when `RUST_LOG`
/// is unset. Returns quietly if a subscriber is already installed.
pub fn init_logging_with(default_filter: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}
