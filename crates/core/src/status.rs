//! String-returning entry points for callers that cannot consume typed results.
//!
//! Every function returns either [`SUCCESS`] or `"Error: <category> - <detail>"`.

use crate::config::{ConversionReport, ConversionRequest};
use crate::converter::BatchPageConverter;
use crate::error::{ConversionError, Result};
use crate::validate::dpi_from_raw;

/// Returned when every page was written.
pub const SUCCESS: &str = "SUCCESS: PDF converted successfully";

/// Format an error for the string boundary.
pub fn error_status(err: &ConversionError) -> String {
    format!("Error: {} - {}", err.category(), err)
}

/// Format a conversion result for the string boundary.
pub fn status_of(result: &Result<ConversionReport>) -> String {
    match result {
        Ok(_) => SUCCESS.to_string(),
        Err(e) => error_status(e),
    }
}

/// Whether a status string reports success.
pub fn is_success(status: &str) -> bool {
    status.starts_with("SUCCESS")
}

/// Convert every page, numbering output files when there is more than one.
pub fn convert_pdf_to_image(
    converter: &BatchPageConverter,
    source_path: &str,
    output_path: &str,
    dpi: i64,
) -> String {
    run(converter, source_path, output_path, dpi, None, |request| request)
}

/// Convert every page, naming each output file after `page_names[i]`.
pub fn convert_pdf_to_image_with_page_names(
    converter: &BatchPageConverter,
    source_path: &str,
    output_path: &str,
    dpi: i64,
    total_pages: i64,
    page_names: &[String],
) -> String {
    run(converter, source_path, output_path, dpi, Some(total_pages), |request| {
        request.with_page_names(page_names.iter().cloned())
    })
}

/// Convert every page to `{output dir}/{page_paths[i]}/{page_names[i]}.png`.
pub fn convert_pdf_to_image_with_page_names_and_output_paths(
    converter: &BatchPageConverter,
    source_path: &str,
    output_path: &str,
    dpi: i64,
    total_pages: i64,
    page_names: &[String],
    page_paths: &[String],
) -> String {
    run(converter, source_path, output_path, dpi, Some(total_pages), |request| {
        request
            .with_page_names(page_names.iter().cloned())
            .with_page_paths(page_paths.iter().cloned())
    })
}

fn run(
    converter: &BatchPageConverter,
    source_path: &str,
    output_path: &str,
    raw_dpi: i64,
    raw_total: Option<i64>,
    shape: impl FnOnce(ConversionRequest) -> ConversionRequest,
) -> String {
    // Out-of-range values still go through validation so path errors are
    // reported first; the caller's raw value is echoed back.
    let dpi = dpi_from_raw(raw_dpi).unwrap_or(0);
    let mut request = shape(ConversionRequest::new(source_path, output_path).with_dpi(dpi));
    request.total_pages = raw_total.map(total_pages_from_raw);

    match converter.convert(&request) {
        Err(ConversionError::InvalidDpi(_)) => error_status(&ConversionError::InvalidDpi(raw_dpi)),
        Err(ConversionError::PageCountMismatch { actual, .. }) => {
            error_status(&ConversionError::PageCountMismatch {
                declared: raw_total.unwrap_or_default(),
                actual,
            })
        }
        other => status_of(&other),
    }
}

/// Negative or oversized totals can never match a document, so they map to
/// a count no document has and fail as a page count mismatch.
fn total_pages_from_raw(total: i64) -> u32 {
    u32::try_from(total).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn test_success_status() {
        let report = ConversionReport {
            source_path: PathBuf::from("a.pdf"),
            page_count: 1,
            pages: vec![],
            first_failure: None,
            duration: Duration::ZERO,
        };
        assert_eq!(status_of(&Ok(report)), "SUCCESS: PDF converted successfully");
    }

    #[test]
    fn test_total_pages_from_raw() {
        assert_eq!(total_pages_from_raw(3), 3);
        assert_eq!(total_pages_from_raw(-1), u32::MAX);
        assert_eq!(total_pages_from_raw(i64::MAX), u32::MAX);
    }

    #[test]
    fn test_error_status_format() {
        let status = error_status(&ConversionError::PageCountMismatch {
            declared: 4,
            actual: 2,
        });
        assert!(status.starts_with("Error: PageCountMismatch - "));
        assert!(status.contains("(4)"));
        assert!(!is_success(&status));
        assert!(is_success(SUCCESS));
    }
}
