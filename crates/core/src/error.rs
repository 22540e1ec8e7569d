//! Error types for PDF to PNG conversion.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the pdf-to-png library.
#[derive(Error, Debug, Clone)]
pub enum ConversionError {
    /// A source, output or page path is empty or malformed.
    #[error("Invalid {what} path format: '{path}'")]
    InvalidPath { what: &'static str, path: String },

    /// Source PDF not found.
    #[error("PDF file not found at path: {0}")]
    FileNotFound(PathBuf),

    /// DPI outside (0, 1200].
    #[error("Invalid DPI value. Must be between 1 and 1200. Got: {0}")]
    InvalidDpi(i64),

    /// The document opened but has no pages.
    #[error("PDF document has no pages: {0}")]
    EmptyDocument(PathBuf),

    /// Declared page count differs from the document.
    #[error("Total pages number ({declared}) does not match PDF page count ({actual})")]
    PageCountMismatch { declared: i64, actual: usize },

    /// A page name or page path array has fewer entries than pages.
    #[error("{field} array length ({len}) is less than total pages ({required})")]
    NameArrayTooShort {
        field: &'static str,
        len: usize,
        required: usize,
    },

    /// A page name is the empty string.
    #[error("Page names array contains an empty string at index {0}")]
    EmptyNameEntry(usize),

    /// Output directory creation failed.
    #[error("Failed to create output directory '{path}': {message}")]
    DirectoryCreationFailure { path: PathBuf, message: String },

    /// The rasterizer could not open the document or render a page.
    #[error("Rasterization failed for page {shown}: {message}", shown = display_page(.page))]
    RasterizationFailure { page: Option<usize>, message: String },

    /// PNG encoding or writing failed.
    #[error("PNG encoding failed for '{path}': {message}")]
    EncodingFailure { path: PathBuf, message: String },

    /// Anything not covered above, including worker panics.
    #[error("Unexpected failure: {0}")]
    UnexpectedException(String),

    /// Pdfium library could not be loaded.
    #[error("Pdfium error: {0}")]
    PdfiumError(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

fn display_page(page: &Option<usize>) -> String {
    match page {
        Some(index) => (index + 1).to_string(),
        None => "-".to_string(),
    }
}

impl ConversionError {
    /// Taxonomy name used in status strings (`Error: <category> - <detail>`).
    pub fn category(&self) -> &'static str {
        match self {
            ConversionError::InvalidPath { .. } => "InvalidPath",
            ConversionError::FileNotFound(_) => "FileNotFound",
            ConversionError::InvalidDpi(_) => "InvalidDpi",
            ConversionError::EmptyDocument(_) => "EmptyDocument",
            ConversionError::PageCountMismatch { .. } => "PageCountMismatch",
            ConversionError::NameArrayTooShort { .. } => "NameArrayTooShort",
            ConversionError::EmptyNameEntry(_) => "EmptyNameEntry",
            ConversionError::DirectoryCreationFailure { .. } => "DirectoryCreationFailure",
            ConversionError::RasterizationFailure { .. } => "RasterizationFailure",
            ConversionError::EncodingFailure { .. } => "EncodingFailure",
            ConversionError::UnexpectedException(_) => "UnexpectedException",
            ConversionError::PdfiumError(_) => "PdfiumError",
            ConversionError::InvalidConfig(_) => "InvalidConfig",
        }
    }

    /// Whether the error was raised before any document work started.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ConversionError::InvalidPath { .. }
                | ConversionError::FileNotFound(_)
                | ConversionError::InvalidDpi(_)
                | ConversionError::NameArrayTooShort { .. }
                | ConversionError::EmptyNameEntry(_)
        )
    }

    pub(crate) fn raster(page: usize, message: impl ToString) -> Self {
        ConversionError::RasterizationFailure {
            page: Some(page),
            message: message.to_string(),
        }
    }
}

/// Result type alias for convenience.
pub type Result<T> = std::result::Result<T, ConversionError>;
