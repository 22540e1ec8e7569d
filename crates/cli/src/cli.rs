use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use pdf_to_png_core::{
    status, validate::dpi_from_raw, BatchPageConverter, ConversionError, ConversionReport,
    ConversionRequest, PageRasterizer, PdfiumRasterizer, RenderConfig, DEFAULT_DPI,
};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "pdf2png")]
#[command(about = "Render every page of a PDF to its own PNG file")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to a JSON render config. Flags override its fields.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Rasterizer backend.
    #[arg(long, value_enum, default_value_t = Backend::Pdfium, global = true)]
    pub backend: Backend,

    /// Directory containing the pdfium library.
    #[arg(long, global = true)]
    pub pdfium_lib: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    Pdfium,
    /// Pure-Rust renderer; needs the `hayro` build feature.
    Hayro,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Convert a PDF into one PNG per page.
    Convert {
        /// Source PDF.
        source: PathBuf,

        /// Output PNG path. Multi-page documents get `_page{n}` suffixes.
        output: PathBuf,

        /// Render resolution, 1 to 1200.
        #[arg(long, allow_negative_numbers = true)]
        dpi: Option<i64>,

        /// Expected page count; conversion fails if the document differs.
        #[arg(long)]
        total_pages: Option<u32>,

        /// File name for the next page, in page order. Repeatable.
        #[arg(long = "name")]
        names: Vec<String>,

        /// Subdirectory for the next page, in page order. Repeatable.
        #[arg(long = "page-path")]
        page_paths: Vec<String>,

        /// Worker threads for pages after the first.
        #[arg(long)]
        threads: Option<usize>,

        /// PNG compression level, 0 to 9.
        #[arg(long)]
        compression: Option<u8>,

        /// Keep transparency instead of flattening onto the background.
        #[arg(long)]
        alpha: bool,

        /// Print the per-page report as JSON.
        #[arg(long, conflicts_with = "print_status")]
        json: bool,

        /// Print a single SUCCESS/Error status line.
        #[arg(long = "status")]
        print_status: bool,
    },
    /// Print page count and page sizes.
    Info {
        source: PathBuf,

        /// DPI used for the pixel sizes.
        #[arg(long, default_value_t = DEFAULT_DPI)]
        dpi: u32,
    },
}

pub fn init_logging(level: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.unwrap_or("warn")));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true),
        )
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))
}

pub fn dispatch(args: Args) -> Result<()> {
    let config = load_config(args.config.as_deref())?;

    match args.cmd {
        Command::Convert {
            source,
            output,
            dpi,
            total_pages,
            names,
            page_paths,
            threads,
            compression,
            alpha,
            json,
            print_status,
        } => {
            let mut config = config;
            if let Some(t) = threads {
                config = config.render_threads(t);
            }
            if let Some(level) = compression {
                config = config.png_compression(level);
            }
            if alpha {
                config = config.use_alpha(true);
            }

            let rasterizer = bind_rasterizer(args.backend, args.pdfium_lib.as_deref())?;
            let converter = BatchPageConverter::new(rasterizer, config)?;

            let request = build_request(
                source,
                output,
                request_dpi(dpi, converter.config().dpi),
                total_pages,
                names,
                page_paths,
            );
            let result = convert_request(&converter, &request, dpi);

            let report = match result {
                Ok(report) => report,
                Err(e) if print_status => {
                    println!("{}", status::error_status(&e));
                    bail!(e);
                }
                Err(e) => return Err(e.into()),
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&report_json(&report))?);
            } else if print_status {
                let line = match &report.first_failure {
                    Some(e) => status::error_status(e),
                    None => status::SUCCESS.to_string(),
                };
                println!("{}", line);
            } else {
                for path in report.output_paths() {
                    println!("{}", path.display());
                }
            }

            info!(
                "{} of {} pages written in {:.2}s",
                report.page_count - report.failed_pages(),
                report.page_count,
                report.duration.as_secs_f64()
            );

            match report.first_failure {
                Some(e) => Err(e.into()),
                None => Ok(()),
            }
        }
        Command::Info { source, dpi } => show_info(args.pdfium_lib.as_deref(), &source, dpi),
    }
}

fn load_config(path: Option<&Path>) -> Result<RenderConfig> {
    match path {
        Some(p) => RenderConfig::from_json_file(p)
            .with_context(|| format!("loading config: {}", p.display())),
        None => Ok(RenderConfig::default()),
    }
}

fn bind_rasterizer(backend: Backend, pdfium_lib: Option<&Path>) -> Result<Arc<dyn PageRasterizer>> {
    match backend {
        Backend::Pdfium => Ok(Arc::new(bind_pdfium(pdfium_lib)?)),
        #[cfg(feature = "hayro")]
        Backend::Hayro => Ok(Arc::new(pdf_to_png_core::HayroRasterizer::new())),
        #[cfg(not(feature = "hayro"))]
        Backend::Hayro => bail!("pdf2png was built without the `hayro` feature"),
    }
}

fn bind_pdfium(pdfium_lib: Option<&Path>) -> Result<PdfiumRasterizer> {
    let rasterizer = match pdfium_lib {
        Some(dir) => PdfiumRasterizer::from_library_dir(dir),
        None => PdfiumRasterizer::new(),
    }?;
    debug!("bound {:?}", rasterizer);
    Ok(rasterizer)
}

/// Out-of-range values still go through validation (as 0) so path errors are
/// reported before DPI errors.
pub fn request_dpi(raw: Option<i64>, default: u32) -> u32 {
    raw.map_or(default, |r| dpi_from_raw(r).unwrap_or(0))
}

/// Run a conversion, echoing the caller's raw DPI in `InvalidDpi`.
pub fn convert_request(
    converter: &BatchPageConverter,
    request: &ConversionRequest,
    raw_dpi: Option<i64>,
) -> pdf_to_png_core::Result<ConversionReport> {
    match (converter.convert_detailed(request), raw_dpi) {
        (Err(ConversionError::InvalidDpi(_)), Some(raw)) => Err(ConversionError::InvalidDpi(raw)),
        (result, _) => result,
    }
}

pub fn build_request(
    source: PathBuf,
    output: PathBuf,
    dpi: u32,
    total_pages: Option<u32>,
    names: Vec<String>,
    page_paths: Vec<String>,
) -> ConversionRequest {
    let mut request = ConversionRequest::new(source, output).with_dpi(dpi);
    request.total_pages = total_pages;
    if !names.is_empty() {
        request = request.with_page_names(names);
    }
    if !page_paths.is_empty() {
        request = request.with_page_paths(page_paths);
    }
    request
}

pub fn report_json(report: &ConversionReport) -> Value {
    let pages: Vec<Value> = report
        .pages
        .iter()
        .map(|p| match &p.result {
            Ok(page) => json!({
                "page": p.index + 1,
                "output": p.output_path,
                "rendered": page,
            }),
            Err(e) => json!({
                "page": p.index + 1,
                "output": p.output_path,
                "error": status::error_status(e),
            }),
        })
        .collect();

    json!({
        "source": report.source_path,
        "page_count": report.page_count,
        "duration_secs": report.duration.as_secs_f64(),
        "status": match &report.first_failure {
            Some(e) => status::error_status(e),
            None => status::SUCCESS.to_string(),
        },
        "pages": pages,
    })
}

fn show_info(pdfium_lib: Option<&Path>, source: &Path, dpi: u32) -> Result<()> {
    let document =
        std::fs::read(source).with_context(|| format!("reading {}", source.display()))?;
    let info = bind_pdfium(pdfium_lib)?.document_info(&document)?;

    let pages: Vec<Value> = info
        .pages
        .iter()
        .map(|p| {
            json!({
                "page": p.page_number,
                "width_points": p.width_points,
                "height_points": p.height_points,
                "width_pixels": p.width_pixels(dpi),
                "height_pixels": p.height_pixels(dpi),
            })
        })
        .collect();

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "source": source,
            "dpi": dpi,
            "page_count": info.page_count,
            "pages": pages,
        }))?
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;
    use pdf_to_png_core::{NamingMode, PageOutcome, RenderedPage};
    use std::time::Duration;

    struct NeverOpened;

    impl PageRasterizer for NeverOpened {
        fn name(&self) -> &'static str {
            "never-opened"
        }

        fn page_count(&self, _document: &[u8]) -> pdf_to_png_core::Result<usize> {
            panic!("document opened before validation finished")
        }

        fn rasterize(
            &self,
            _document: &[u8],
            _index: usize,
            _dpi: u32,
        ) -> pdf_to_png_core::Result<RgbaImage> {
            panic!("page rendered before validation finished")
        }
    }

    fn never_opened() -> BatchPageConverter {
        BatchPageConverter::new(Arc::new(NeverOpened), RenderConfig::default().render_threads(1))
            .unwrap()
    }

    #[test]
    fn missing_source_reported_before_bad_dpi() {
        let dir = tempfile::tempdir().unwrap();
        let converter = never_opened();
        let request = build_request(
            dir.path().join("missing.pdf"),
            dir.path().join("out.png"),
            request_dpi(Some(0), DEFAULT_DPI),
            None,
            vec![],
            vec![],
        );

        let err = convert_request(&converter, &request, Some(0)).unwrap_err();
        assert!(matches!(err, ConversionError::FileNotFound(_)), "got {:?}", err);
    }

    #[test]
    fn bad_dpi_echoes_the_raw_value() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("doc.pdf");
        std::fs::write(&source, b"%PDF-1.4\n").unwrap();
        let converter = never_opened();
        let request = build_request(
            source,
            dir.path().join("out.png"),
            request_dpi(Some(-5), DEFAULT_DPI),
            None,
            vec![],
            vec![],
        );

        let err = convert_request(&converter, &request, Some(-5)).unwrap_err();
        assert!(matches!(err, ConversionError::InvalidDpi(-5)), "got {:?}", err);
    }

    #[test]
    fn request_dpi_defaults_and_clamps() {
        assert_eq!(request_dpi(None, 300), 300);
        assert_eq!(request_dpi(Some(150), 300), 150);
        assert_eq!(request_dpi(Some(5000), 300), 0);
    }

    #[test]
    fn parses_convert_with_names_and_paths() {
        let args = Args::try_parse_from([
            "pdf2png", "convert", "fruit.pdf", "out/fruit.png", "--dpi", "150",
            "--total-pages", "2", "--name", "Apple", "--name", "Banana",
            "--page-path", "alpha", "--page-path", "beta",
        ])
        .unwrap();

        match args.cmd {
            Command::Convert { dpi, total_pages, names, page_paths, .. } => {
                assert_eq!(dpi, Some(150));
                assert_eq!(total_pages, Some(2));
                assert_eq!(names, vec!["Apple", "Banana"]);
                assert_eq!(page_paths, vec!["alpha", "beta"]);
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert_eq!(args.backend, Backend::Pdfium);
    }

    #[test]
    fn negative_dpi_reaches_validation() {
        let args =
            Args::try_parse_from(["pdf2png", "convert", "a.pdf", "a.png", "--dpi", "-5"]).unwrap();
        match args.cmd {
            Command::Convert { dpi, .. } => {
                assert_eq!(dpi, Some(-5));
                assert!(matches!(
                    dpi_from_raw(-5),
                    Err(ConversionError::InvalidDpi(-5))
                ));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn json_and_status_conflict() {
        let parsed = Args::try_parse_from([
            "pdf2png", "convert", "a.pdf", "a.png", "--json", "--status",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn build_request_picks_naming_mode() {
        let numbered = build_request("a.pdf".into(), "a.png".into(), 72, None, vec![], vec![]);
        assert_eq!(numbered.naming_mode(), NamingMode::Numbered);
        assert!(numbered.page_names.is_none());

        let named = build_request(
            "a.pdf".into(),
            "a.png".into(),
            72,
            Some(1),
            vec!["One".into()],
            vec!["dir".into()],
        );
        assert_eq!(named.naming_mode(), NamingMode::NamedWithPaths);
        assert_eq!(named.total_pages, Some(1));
        assert_eq!(named.dpi, 72);
    }

    #[test]
    fn report_json_lists_each_page() {
        let report = ConversionReport {
            source_path: "doc.pdf".into(),
            page_count: 2,
            pages: vec![
                PageOutcome {
                    index: 0,
                    output_path: "doc_page1.png".into(),
                    result: Ok(RenderedPage {
                        page_number: 1,
                        width: 10,
                        height: 20,
                        bytes_written: 99,
                    }),
                },
                PageOutcome {
                    index: 1,
                    output_path: "doc_page2.png".into(),
                    result: Err(ConversionError::RasterizationFailure {
                        page: Some(1),
                        message: "bad stream".into(),
                    }),
                },
            ],
            first_failure: Some(ConversionError::RasterizationFailure {
                page: Some(1),
                message: "bad stream".into(),
            }),
            duration: Duration::from_millis(250),
        };

        let value = report_json(&report);
        assert_eq!(value["page_count"], 2);
        assert_eq!(value["pages"][0]["rendered"]["width"], 10);
        assert!(value["pages"][1]["error"]
            .as_str()
            .unwrap()
            .contains("bad stream"));
        assert!(value["status"].as_str().unwrap().starts_with("Error:"));
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("nope.json"))).is_err());
        assert_eq!(load_config(None).unwrap().dpi, DEFAULT_DPI);
    }
}
