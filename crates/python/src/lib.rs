//! Python bindings for pdf-to-png using PyO3.
//!
//! The three `convert_pdf_to_image*` methods return a status string
//! (`"SUCCESS: ..."` or `"Error: <category> - <detail>"`) for callers that
//! want a single value back. `convert` and `convert_async` return a typed
//! `ConversionReport` and raise on failure.
//!
//! # Example
//!
//! ```python
//! from pdf_to_png import PdfConverter
//!
//! converter = PdfConverter(render_threads=4)
//!
//! status = converter.convert_pdf_to_image("report.pdf", "out/report.png", 150)
//! assert status.startswith("SUCCESS")
//!
//! report = converter.convert(
//!     "fruit.pdf", "out/fruit.png", dpi=150,
//!     page_names=["Apple", "Banana"], page_paths=["alpha", "beta"],
//! )
//! print(report.output_paths)
//! ```

use pdf_to_png_core::{
    status, BatchPageConverter, BatchPageConverterBuilder, ConversionError, ConversionReport,
    ConversionRequest, PageRasterizer, PdfiumRasterizer,
};
use pyo3::exceptions::{PyFileNotFoundError, PyIOError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

fn to_py_err(err: ConversionError) -> PyErr {
    let message = status::error_status(&err);
    match err {
        ConversionError::FileNotFound(_) => PyFileNotFoundError::new_err(message),
        ConversionError::DirectoryCreationFailure { .. }
        | ConversionError::EncodingFailure { .. } => PyIOError::new_err(message),
        e if e.is_validation() => PyValueError::new_err(message),
        ConversionError::InvalidConfig(_) => PyValueError::new_err(message),
        _ => PyRuntimeError::new_err(message),
    }
}

/// Python wrapper for one page outcome.
#[pyclass(name = "PageOutcome")]
#[derive(Clone)]
pub struct PyPageOutcome {
    #[pyo3(get)]
    pub page_number: usize,
    #[pyo3(get)]
    pub output_path: String,
    #[pyo3(get)]
    pub width: Option<u32>,
    #[pyo3(get)]
    pub height: Option<u32>,
    #[pyo3(get)]
    pub error: Option<String>,
}

#[pymethods]
impl PyPageOutcome {
    fn __repr__(&self) -> String {
        match &self.error {
            Some(e) => format!("PageOutcome(page={}, error='{}')", self.page_number, e),
            None => format!(
                "PageOutcome(page={}, path='{}')",
                self.page_number, self.output_path
            ),
        }
    }

    /// Whether the page was written.
    #[getter]
    fn ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Python wrapper for ConversionReport.
#[pyclass(name = "ConversionReport")]
#[derive(Clone)]
pub struct PyConversionReport {
    #[pyo3(get)]
    pub source_path: String,
    #[pyo3(get)]
    pub page_count: usize,
    #[pyo3(get)]
    pub pages: Vec<PyPageOutcome>,
    #[pyo3(get)]
    pub duration_secs: f64,
}

impl From<ConversionReport> for PyConversionReport {
    fn from(r: ConversionReport) -> Self {
        Self {
            source_path: r.source_path.to_string_lossy().to_string(),
            page_count: r.page_count,
            pages: r
                .pages
                .into_iter()
                .map(|p| {
                    let output_path = p.output_path.to_string_lossy().to_string();
                    match p.result {
                        Ok(page) => PyPageOutcome {
                            page_number: page.page_number,
                            output_path,
                            width: Some(page.width),
                            height: Some(page.height),
                            error: None,
                        },
                        Err(e) => PyPageOutcome {
                            page_number: p.index + 1,
                            output_path,
                            width: None,
                            height: None,
                            error: Some(status::error_status(&e)),
                        },
                    }
                })
                .collect(),
            duration_secs: r.duration.as_secs_f64(),
        }
    }
}

#[pymethods]
impl PyConversionReport {
    fn __repr__(&self) -> String {
        format!(
            "ConversionReport(source='{}', pages={}, duration={:.2}s)",
            self.source_path, self.page_count, self.duration_secs
        )
    }

    /// Paths of the pages that were written.
    #[getter]
    fn output_paths(&self) -> Vec<String> {
        self.pages
            .iter()
            .filter(|p| p.error.is_none())
            .map(|p| p.output_path.clone())
            .collect()
    }
}

/// PDF to PNG converter.
///
/// Binds the rasterizer library once, when the converter is created.
///
/// Args:
///     render_threads: Worker threads for pages after the first (default: CPU count)
///     dpi: Default DPI for `convert` (default: 300)
///     png_compression: PNG compression level 0-9 (default: 6)
///     use_alpha: Keep transparency instead of flattening onto white (default: False)
///     pdfium_path: Directory containing the pdfium library (default: search)
///     backend: "pdfium" or, when built with the `hayro` feature, "hayro"
#[pyclass(name = "PdfConverter")]
pub struct PyPdfConverter {
    converter: BatchPageConverter,
}

impl PyPdfConverter {
    fn rasterizer(
        backend: &str,
        pdfium_path: Option<String>,
    ) -> PyResult<Arc<dyn PageRasterizer>> {
        match backend {
            "pdfium" => {
                let rasterizer = match pdfium_path {
                    Some(dir) => PdfiumRasterizer::from_library_dir(&PathBuf::from(dir)),
                    None => PdfiumRasterizer::new(),
                }
                .map_err(to_py_err)?;
                Ok(Arc::new(rasterizer))
            }
            #[cfg(feature = "hayro")]
            "hayro" => Ok(Arc::new(pdf_to_png_core::HayroRasterizer::new())),
            other => Err(PyValueError::new_err(format!(
                "unknown backend '{}'",
                other
            ))),
        }
    }

    fn request(
        source_path: String,
        output_path: String,
        dpi: u32,
        total_pages: Option<u32>,
        page_names: Option<Vec<String>>,
        page_paths: Option<Vec<String>>,
    ) -> ConversionRequest {
        let mut request = ConversionRequest::new(source_path, output_path).with_dpi(dpi);
        request.total_pages = total_pages;
        request.page_names = page_names;
        request.page_paths = page_paths;
        request
    }
}

#[pymethods]
impl PyPdfConverter {
    #[new]
    #[pyo3(signature = (render_threads=None, dpi=None, png_compression=None, use_alpha=false, pdfium_path=None, backend="pdfium"))]
    fn new(
        render_threads: Option<usize>,
        dpi: Option<u32>,
        png_compression: Option<u8>,
        use_alpha: bool,
        pdfium_path: Option<String>,
        backend: &str,
    ) -> PyResult<Self> {
        let mut builder = BatchPageConverterBuilder::new().use_alpha(use_alpha);
        if let Some(threads) = render_threads {
            builder = builder.render_threads(threads);
        }
        if let Some(d) = dpi {
            builder = builder.dpi(d);
        }
        if let Some(level) = png_compression {
            builder = builder.png_compression(level);
        }

        let rasterizer = Self::rasterizer(backend, pdfium_path)?;
        let converter = builder.build(rasterizer).map_err(to_py_err)?;
        debug!("Python converter created: {:?}", converter);

        Ok(Self { converter })
    }

    /// Convert every page; multi-page documents get `_page{n}` suffixes.
    ///
    /// Returns "SUCCESS: PDF converted successfully" or "Error: <category> - <detail>".
    #[pyo3(signature = (pdf_path, output_path, dpi=300))]
    fn convert_pdf_to_image(
        &self,
        py: Python<'_>,
        pdf_path: String,
        output_path: String,
        dpi: i64,
    ) -> String {
        py.allow_threads(|| {
            status::convert_pdf_to_image(&self.converter, &pdf_path, &output_path, dpi)
        })
    }

    /// Convert every page, naming page `i` after `page_names[i]`.
    fn convert_pdf_to_image_with_page_names(
        &self,
        py: Python<'_>,
        pdf_path: String,
        output_path: String,
        dpi: i64,
        total_pages: i64,
        page_names: Vec<String>,
    ) -> String {
        py.allow_threads(|| {
            status::convert_pdf_to_image_with_page_names(
                &self.converter,
                &pdf_path,
                &output_path,
                dpi,
                total_pages,
                &page_names,
            )
        })
    }

    /// Convert every page to `<output dir>/<page_paths[i]>/<page_names[i]>.png`.
    #[allow(clippy::too_many_arguments)]
    fn convert_pdf_to_image_with_page_names_and_output_paths(
        &self,
        py: Python<'_>,
        pdf_path: String,
        output_path: String,
        dpi: i64,
        total_pages: i64,
        page_names: Vec<String>,
        page_paths: Vec<String>,
    ) -> String {
        py.allow_threads(|| {
            status::convert_pdf_to_image_with_page_names_and_output_paths(
                &self.converter,
                &pdf_path,
                &output_path,
                dpi,
                total_pages,
                &page_names,
                &page_paths,
            )
        })
    }

    /// Convert a document and return a ConversionReport.
    ///
    /// Raises ValueError for invalid requests, FileNotFoundError for a missing
    /// PDF, IOError for output failures and RuntimeError otherwise.
    #[pyo3(signature = (pdf_path, output_path, dpi=None, total_pages=None, page_names=None, page_paths=None))]
    #[allow(clippy::too_many_arguments)]
    fn convert(
        &self,
        py: Python<'_>,
        pdf_path: String,
        output_path: String,
        dpi: Option<u32>,
        total_pages: Option<u32>,
        page_names: Option<Vec<String>>,
        page_paths: Option<Vec<String>>,
    ) -> PyResult<PyConversionReport> {
        let dpi = dpi.unwrap_or(self.converter.config().dpi);
        let request = Self::request(pdf_path, output_path, dpi, total_pages, page_names, page_paths);

        py.allow_threads(|| self.converter.convert(&request))
            .map(PyConversionReport::from)
            .map_err(to_py_err)
    }

    /// Awaitable version of `convert`.
    #[pyo3(signature = (pdf_path, output_path, dpi=None, total_pages=None, page_names=None, page_paths=None))]
    #[allow(clippy::too_many_arguments)]
    fn convert_async<'py>(
        &self,
        py: Python<'py>,
        pdf_path: String,
        output_path: String,
        dpi: Option<u32>,
        total_pages: Option<u32>,
        page_names: Option<Vec<String>>,
        page_paths: Option<Vec<String>>,
    ) -> PyResult<Bound<'py, PyAny>> {
        let converter = self.converter.clone();
        let dpi = dpi.unwrap_or(converter.config().dpi);
        let request = Self::request(pdf_path, output_path, dpi, total_pages, page_names, page_paths);

        pyo3_async_runtimes::tokio::future_into_py(py, async move {
            converter
                .convert_async(request)
                .await
                .map(PyConversionReport::from)
                .map_err(to_py_err)
        })
    }

    /// Pages written since the converter was created.
    #[getter]
    fn pages_written(&self) -> usize {
        self.converter.stats().pages_written
    }

    /// Get the configured DPI.
    #[getter]
    fn dpi(&self) -> u32 {
        self.converter.config().dpi
    }

    fn __repr__(&self) -> String {
        let stats = self.converter.stats();
        format!(
            "PdfConverter(backend='{}', threads={}, dpi={})",
            stats.backend,
            stats.render_threads,
            self.converter.config().dpi
        )
    }
}

/// Replace filesystem-reserved characters in a name with underscores.
#[pyfunction]
fn sanitize_file_name(name: &str) -> String {
    pdf_to_png_core::sanitize_file_name(name)
}

/// Initialize logging for the library.
///
/// Honors `RUST_LOG`, falling back to `level`. Calling it again is a no-op.
#[pyfunction]
#[pyo3(signature = (level="info"))]
fn init_logging(level: &str) {
    pdf_to_png_core::init_logging_with(level);
}

/// Python module definition.
#[pymodule]
fn pdf_to_png(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyPdfConverter>()?;
    m.add_class::<PyConversionReport>()?;
    m.add_class::<PyPageOutcome>()?;

    m.add_function(wrap_pyfunction!(sanitize_file_name, m)?)?;
    m.add_function(wrap_pyfunction!(init_logging, m)?)?;
    m.add("SUCCESS", status::SUCCESS)?;

    Ok(())
}
