//! Configuration and request/result types for PDF to PNG conversion.

use crate::error::{ConversionError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Highest DPI accepted by the converter.
pub const MAX_DPI: u32 = 1200;

/// DPI used when a caller does not pick one.
pub const DEFAULT_DPI: u32 = 300;

/// Configuration for page rendering and PNG output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Default output DPI (dots per inch) for requests built by the converter.
    /// Default: 300.
    pub dpi: u32,

    /// Number of worker threads for pages after the first.
    /// Default: number of CPU cores.
    pub render_threads: usize,

    /// PNG compression level (0-9, higher = smaller file, slower).
    /// Default: 6.
    pub png_compression: u8,

    /// Whether to keep the alpha channel (transparency).
    /// Default: false.
    pub use_alpha: bool,

    /// Background color for pages (if not using alpha).
    /// Default: white (255, 255, 255).
    pub background_color: (u8, u8, u8),
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_DPI,
            render_threads: num_cpus::get(),
            png_compression: 6,
            use_alpha: false,
            background_color: (255, 255, 255),
        }
    }
}

impl RenderConfig {
    /// Create a render config with specified DPI.
    pub fn with_dpi(dpi: u32) -> Self {
        Self {
            dpi,
            ..Default::default()
        }
    }

    /// Set the number of render threads.
    pub fn render_threads(mut self, threads: usize) -> Self {
        self.render_threads = threads;
        self
    }

    /// Set PNG compression level.
    pub fn png_compression(mut self, level: u8) -> Self {
        self.png_compression = level.min(9);
        self
    }

    /// Enable alpha channel.
    pub fn use_alpha(mut self, enabled: bool) -> Self {
        self.use_alpha = enabled;
        self
    }

    /// Set the background color used to flatten transparent pixels.
    pub fn background_color(mut self, rgb: (u8, u8, u8)) -> Self {
        self.background_color = rgb;
        self
    }

    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ConversionError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: RenderConfig = serde_json::from_str(&raw).map_err(|e| {
            ConversionError::InvalidConfig(format!("cannot parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.dpi == 0 || self.dpi > MAX_DPI {
            return Err(ConversionError::InvalidConfig(format!(
                "dpi must be between 1 and {}",
                MAX_DPI
            )));
        }
        if self.render_threads == 0 {
            return Err(ConversionError::InvalidConfig(
                "render_threads must be at least 1".to_string(),
            ));
        }
        if self.png_compression > 9 {
            return Err(ConversionError::InvalidConfig(
                "png_compression must be between 0 and 9".to_string(),
            ));
        }
        Ok(())
    }
}

/// A single conversion request. Owned by the caller, read-only to the converter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionRequest {
    /// Path to the source PDF.
    pub source_path: PathBuf,

    /// Output file path. Its directory is the output root; its stem and
    /// extension drive numbered naming.
    pub output_path: PathBuf,

    /// Output DPI.
    pub dpi: u32,

    /// Page count the caller expects. Checked against the document.
    pub total_pages: Option<u32>,

    /// One name per page, used instead of numbered file names.
    pub page_names: Option<Vec<String>>,

    /// One subdirectory (relative to the output root) per page.
    pub page_paths: Option<Vec<String>>,
}

/// How output file names are derived for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamingMode {
    /// `{stem}_page{n}{ext}`, or the output path itself for one page.
    Numbered,
    /// `{sanitized name}{ext}` next to the output path.
    Named,
    /// `{page path}/{sanitized name}.png` under the output directory.
    NamedWithPaths,
}

impl ConversionRequest {
    /// Create a new conversion request at the default DPI.
    pub fn new(source_path: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            output_path: output_path.into(),
            dpi: DEFAULT_DPI,
            total_pages: None,
            page_names: None,
            page_paths: None,
        }
    }

    /// Set the DPI for this conversion.
    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    /// Declare how many pages the document is expected to have.
    pub fn with_total_pages(mut self, total: u32) -> Self {
        self.total_pages = Some(total);
        self
    }

    /// Name each page's output file.
    pub fn with_page_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.page_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Place each page's output file in its own subdirectory.
    pub fn with_page_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.page_paths = Some(paths.into_iter().map(Into::into).collect());
        self
    }

    /// Naming mode implied by which arrays are present.
    pub fn naming_mode(&self) -> NamingMode {
        match (&self.page_names, &self.page_paths) {
            (Some(_), Some(_)) => NamingMode::NamedWithPaths,
            (Some(_), None) => NamingMode::Named,
            (None, _) => NamingMode::Numbered,
        }
    }
}

/// Stage of a single conversion call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversionStage {
    Idle,
    Validating,
    Opening,
    ProcessingFirstPage,
    ProcessingRemaining,
    Done,
    Failed,
}

/// One page's planned output. Built once, consumed once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTask {
    /// Page index (0-based).
    pub index: usize,
    /// Where the PNG for this page is written.
    pub output_path: PathBuf,
}

/// A page that was rendered and written to disk.
#[derive(Debug, Clone, Serialize)]
pub struct RenderedPage {
    /// Page number (1-indexed).
    pub page_number: usize,

    /// Image width in pixels.
    pub width: u32,

    /// Image height in pixels.
    pub height: u32,

    /// Size of the written PNG file.
    pub bytes_written: usize,
}

/// Outcome of one page task.
#[derive(Debug, Clone)]
pub struct PageOutcome {
    pub index: usize,
    pub output_path: PathBuf,
    pub result: std::result::Result<RenderedPage, ConversionError>,
}

impl PageOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-page result of converting one document.
#[derive(Debug, Clone)]
pub struct ConversionReport {
    /// Source PDF.
    pub source_path: PathBuf,

    /// Pages in the document.
    pub page_count: usize,

    /// One outcome per page that was attempted, sorted by page index.
    pub pages: Vec<PageOutcome>,

    /// The failure surfaced for this call, if any: the first one observed.
    pub first_failure: Option<ConversionError>,

    /// Processing time.
    pub duration: Duration,
}

impl ConversionReport {
    /// Whether every page was written.
    pub fn is_success(&self) -> bool {
        self.first_failure.is_none()
    }

    /// Paths of the pages that were written.
    pub fn output_paths(&self) -> Vec<PathBuf> {
        self.pages
            .iter()
            .filter(|p| p.is_ok())
            .map(|p| p.output_path.clone())
            .collect()
    }

    /// Number of pages that failed.
    pub fn failed_pages(&self) -> usize {
        self.pages.iter().filter(|p| !p.is_ok()).count()
    }

    /// Turn a report with failed pages into the surfaced error.
    pub fn into_result(self) -> Result<ConversionReport> {
        match self.first_failure {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }
}

/// Result of a batch conversion operation.
#[derive(Debug, Clone)]
pub struct BatchResult {
    /// Successfully converted files.
    pub successful: Vec<ConversionReport>,

    /// Failed conversions.
    pub failed: Vec<FailedFile>,

    /// Total processing time.
    pub total_duration: Duration,

    /// Total pages rendered.
    pub total_pages: usize,
}

/// Information about a failed conversion.
#[derive(Debug, Clone)]
pub struct FailedFile {
    /// Source PDF.
    pub source_path: PathBuf,

    /// The surfaced error.
    pub error: ConversionError,
}
