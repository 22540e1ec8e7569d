//! Request validation. Checks run in a fixed order and stop at the first failure.

use crate::config::{ConversionRequest, MAX_DPI};
use crate::error::{ConversionError, Result};
use std::path::Path;

/// Check everything that can be checked without opening the document.
///
/// Order: path syntax, source existence, DPI, page path syntax. The name and
/// path arrays depend on the real page count and are checked by
/// [`validate_page_arrays`] once the declared total has been compared to it.
pub fn validate_request(request: &ConversionRequest) -> Result<()> {
    check_path_syntax("PDF", &request.source_path)?;
    check_path_syntax("output", &request.output_path)?;
    if request.output_path.file_name().is_none() {
        return Err(invalid_path("output", &request.output_path));
    }

    if !request.source_path.is_file() {
        return Err(ConversionError::FileNotFound(request.source_path.clone()));
    }

    check_dpi(request.dpi)?;

    if let Some(paths) = &request.page_paths {
        for entry in paths {
            if entry.contains('\0') {
                return Err(ConversionError::InvalidPath {
                    what: "page",
                    path: entry.replace('\0', "\\0"),
                });
            }
        }
    }

    Ok(())
}

/// Check the page name and page path arrays against a page count.
pub fn validate_page_arrays(request: &ConversionRequest, page_count: usize) -> Result<()> {
    if let Some(paths) = &request.page_paths {
        if paths.len() < page_count {
            return Err(ConversionError::NameArrayTooShort {
                field: "Output paths",
                len: paths.len(),
                required: page_count,
            });
        }
        if request.page_names.is_none() {
            return Err(ConversionError::NameArrayTooShort {
                field: "Page names",
                len: 0,
                required: page_count,
            });
        }
    }

    if let Some(names) = &request.page_names {
        if let Some(index) = names.iter().position(|n| n.is_empty()) {
            return Err(ConversionError::EmptyNameEntry(index));
        }
        if names.len() < page_count {
            return Err(ConversionError::NameArrayTooShort {
                field: "Page names",
                len: names.len(),
                required: page_count,
            });
        }
    }

    Ok(())
}

/// Convert an untyped DPI from a foreign caller.
pub fn dpi_from_raw(dpi: i64) -> Result<u32> {
    match u32::try_from(dpi) {
        Ok(value) if value > 0 && value <= MAX_DPI => Ok(value),
        _ => Err(ConversionError::InvalidDpi(dpi)),
    }
}

fn check_dpi(dpi: u32) -> Result<()> {
    if dpi == 0 || dpi > MAX_DPI {
        return Err(ConversionError::InvalidDpi(i64::from(dpi)));
    }
    Ok(())
}

fn check_path_syntax(what: &'static str, path: &Path) -> Result<()> {
    let raw = path.as_os_str();
    if raw.is_empty() || raw.to_string_lossy().contains('\0') {
        return Err(invalid_path(what, path));
    }
    Ok(())
}

fn invalid_path(what: &'static str, path: &Path) -> ConversionError {
    ConversionError::InvalidPath {
        what,
        path: path.to_string_lossy().replace('\0', "\\0"),
    }
}
