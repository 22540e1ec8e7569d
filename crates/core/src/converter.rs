//! Conversion driver: validation, path planning, page rendering, PNG output.
//!
//! One call walks `Validating -> Opening -> ProcessingFirstPage ->
//! ProcessingRemaining -> Done`, dropping to `Failed` on the first terminal
//! error. Page 0 is rendered on the calling thread so a broken document fails
//! before any parallel work starts; the remaining pages run on the converter's
//! bounded rayon pool. Nothing is retried and files already written are kept.

use crate::config::{
    BatchResult, ConversionReport, ConversionRequest, ConversionStage, FailedFile, PageOutcome,
    PageTask, RenderConfig, RenderedPage,
};
use crate::encode::write_png;
use crate::error::{ConversionError, Result};
use crate::paths::{find_collisions, output_directories, plan_tasks};
use crate::raster::PageRasterizer;
use crate::validate::{validate_page_arrays, validate_request};
use futures::stream::{self, StreamExt};
use rayon::prelude::*;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

#[derive(Debug, Default)]
struct Counters {
    documents: AtomicUsize,
    pages: AtomicUsize,
}

/// Converts PDF documents to one PNG per page.
///
/// Cheap to clone: the rasterizer, worker pool and counters are shared.
#[derive(Clone)]
pub struct BatchPageConverter {
    /// Rasterizer capability, bound once by the host.
    rasterizer: Arc<dyn PageRasterizer>,
    /// Configuration.
    config: RenderConfig,
    /// Worker pool for pages after the first.
    thread_pool: Arc<rayon::ThreadPool>,
    counters: Arc<Counters>,
}

impl std::fmt::Debug for BatchPageConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchPageConverter")
            .field("rasterizer", &self.rasterizer.name())
            .field("config", &self.config)
            .finish()
    }
}

impl BatchPageConverter {
    /// Create a new converter around an already-initialized rasterizer.
    pub fn new(rasterizer: Arc<dyn PageRasterizer>, config: RenderConfig) -> Result<Self> {
        config.validate()?;

        let thread_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.render_threads)
            .thread_name(|i| format!("pdf-to-png-{}", i))
            .build()
            .map_err(|e| {
                ConversionError::InvalidConfig(format!("Failed to create thread pool: {}", e))
            })?;

        info!(
            "Converter initialized with {} backend, {} threads, default {} DPI",
            rasterizer.name(),
            config.render_threads,
            config.dpi
        );

        Ok(Self {
            rasterizer,
            config,
            thread_pool: Arc::new(thread_pool),
            counters: Arc::new(Counters::default()),
        })
    }

    /// Get the current configuration.
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Build a request at the configured default DPI.
    pub fn request(
        &self,
        source_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
    ) -> ConversionRequest {
        ConversionRequest::new(source_path, output_path).with_dpi(self.config.dpi)
    }

    /// Convert one document. Any page failure fails the call with the first
    /// failure observed.
    pub fn convert(&self, request: &ConversionRequest) -> Result<ConversionReport> {
        self.convert_detailed(request)?.into_result()
    }

    /// Convert one document, keeping per-page outcomes when pages after the
    /// first fail. Validation, opening and first-page failures are still `Err`.
    pub fn convert_detailed(&self, request: &ConversionRequest) -> Result<ConversionReport> {
        self.run(request, &|_, _| {})
    }

    /// Like [`convert`](Self::convert), calling `progress(pages_done, total)`
    /// after each page.
    pub fn convert_with_progress<F>(
        &self,
        request: &ConversionRequest,
        progress: F,
    ) -> Result<ConversionReport>
    where
        F: Fn(usize, usize) + Sync,
    {
        self.run(request, &progress)?.into_result()
    }

    /// Run [`convert`](Self::convert) on tokio's blocking pool.
    pub async fn convert_async(&self, request: ConversionRequest) -> Result<ConversionReport> {
        let converter = self.clone();
        tokio::task::spawn_blocking(move || converter.convert(&request))
            .await
            .map_err(|e| ConversionError::UnexpectedException(e.to_string()))?
    }

    /// Convert several documents one after another.
    pub fn convert_batch(&self, requests: &[ConversionRequest]) -> BatchResult {
        let start = Instant::now();
        let mut result = BatchResult {
            successful: Vec::new(),
            failed: Vec::new(),
            total_duration: Default::default(),
            total_pages: 0,
        };

        for request in requests {
            record(&mut result, &request.source_path, self.convert(request));
        }

        result.total_duration = start.elapsed();
        result
    }

    /// Convert documents concurrently, `concurrency` at a time.
    pub async fn convert_parallel(
        &self,
        requests: Vec<ConversionRequest>,
        concurrency: usize,
    ) -> BatchResult {
        let start = Instant::now();

        let results: Vec<(PathBuf, Result<ConversionReport>)> = stream::iter(requests)
            .map(|request| async move {
                let source = request.source_path.clone();
                (source, self.convert_async(request).await)
            })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;

        let mut batch = BatchResult {
            successful: Vec::new(),
            failed: Vec::new(),
            total_duration: Default::default(),
            total_pages: 0,
        };
        for (source, result) in results {
            record(&mut batch, &source, result);
        }
        batch.total_duration = start.elapsed();
        batch
    }

    /// Get statistics about processing.
    pub fn stats(&self) -> ConverterStats {
        ConverterStats {
            documents_converted: self.counters.documents.load(Ordering::Relaxed),
            pages_written: self.counters.pages.load(Ordering::Relaxed),
            render_threads: self.config.render_threads,
            backend: self.rasterizer.name(),
        }
    }

    fn run(
        &self,
        request: &ConversionRequest,
        progress: &(dyn Fn(usize, usize) + Sync),
    ) -> Result<ConversionReport> {
        let start = Instant::now();
        let source = request.source_path.as_path();
        stage(source, ConversionStage::Idle);

        let result = self.run_stages(request, progress);
        match &result {
            Ok(report) if report.is_success() => {
                stage(source, ConversionStage::Done);
                self.counters.documents.fetch_add(1, Ordering::Relaxed);
                info!(
                    "Converted {:?} to {} pages in {:?}",
                    source,
                    report.page_count,
                    start.elapsed()
                );
            }
            Ok(report) => {
                stage(source, ConversionStage::Failed);
                error!(
                    "{} of {} pages failed for {:?}",
                    report.failed_pages(),
                    report.page_count,
                    source
                );
            }
            Err(e) => {
                stage(source, ConversionStage::Failed);
                error!("Failed to convert {:?}: {}", source, e);
            }
        }
        result
    }

    fn run_stages(
        &self,
        request: &ConversionRequest,
        progress: &(dyn Fn(usize, usize) + Sync),
    ) -> Result<ConversionReport> {
        let start = Instant::now();
        let source = request.source_path.as_path();

        stage(source, ConversionStage::Validating);
        validate_request(request)?;

        stage(source, ConversionStage::Opening);
        let document =
            std::fs::read(source).map_err(|e| ConversionError::RasterizationFailure {
                page: None,
                message: format!("Failed to read PDF file: {}", e),
            })?;
        let page_count = self.rasterizer.page_count(&document)?;
        debug!("{:?} has {} pages", source, page_count);

        if page_count == 0 {
            return Err(ConversionError::EmptyDocument(source.to_path_buf()));
        }
        if let Some(declared) = request.total_pages {
            if declared as usize != page_count {
                return Err(ConversionError::PageCountMismatch {
                    declared: i64::from(declared),
                    actual: page_count,
                });
            }
        }
        validate_page_arrays(request, page_count)?;

        let tasks = plan_tasks(request, page_count);
        for (path, pages) in find_collisions(&tasks) {
            warn!(
                "Pages {:?} all resolve to {:?}; later writes overwrite earlier ones",
                pages, path
            );
        }

        for dir in output_directories(&tasks) {
            std::fs::create_dir_all(&dir).map_err(|e| {
                ConversionError::DirectoryCreationFailure {
                    path: dir.clone(),
                    message: e.to_string(),
                }
            })?;
        }

        let (first, rest) = tasks
            .split_first()
            .ok_or_else(|| ConversionError::EmptyDocument(source.to_path_buf()))?;

        stage(source, ConversionStage::ProcessingFirstPage);
        let first_outcome = self.process_page(&document, request.dpi, first);
        if let Err(e) = &first_outcome.result {
            return Err(e.clone());
        }
        progress(1, page_count);

        let mut pages = Vec::with_capacity(page_count);
        pages.push(first_outcome);
        let mut first_failure = None;

        if !rest.is_empty() {
            stage(source, ConversionStage::ProcessingRemaining);

            let (failure_tx, failure_rx) = crossbeam_channel::unbounded();
            let completed = AtomicUsize::new(1);

            let remaining: Vec<PageOutcome> = self.thread_pool.install(|| {
                rest.par_iter()
                    .map(|task| {
                        let outcome = self.process_page(&document, request.dpi, task);
                        if let Err(e) = &outcome.result {
                            warn!("Page {} failed: {}", task.index + 1, e);
                            // Receiver outlives the pool; send cannot fail.
                            let _ = failure_tx.send(e.clone());
                        }
                        progress(completed.fetch_add(1, Ordering::SeqCst) + 1, page_count);
                        outcome
                    })
                    .collect()
            });
            drop(failure_tx);

            // Completion order, not page order.
            first_failure = failure_rx.try_iter().next();
            pages.extend(remaining);
        }

        pages.sort_by_key(|p| p.index);

        Ok(ConversionReport {
            source_path: source.to_path_buf(),
            page_count,
            pages,
            first_failure,
            duration: start.elapsed(),
        })
    }

    /// Rasterize and write one page; panics inside the backend become errors.
    fn process_page(&self, document: &[u8], dpi: u32, task: &PageTask) -> PageOutcome {
        let result = catch_unwind(AssertUnwindSafe(|| self.render_page(document, dpi, task)))
            .unwrap_or_else(|payload| {
                Err(ConversionError::UnexpectedException(format!(
                    "page {} panicked: {}",
                    task.index + 1,
                    panic_message(payload.as_ref())
                )))
            });

        if result.is_ok() {
            self.counters.pages.fetch_add(1, Ordering::Relaxed);
        }

        PageOutcome {
            index: task.index,
            output_path: task.output_path.clone(),
            result,
        }
    }

    fn render_page(&self, document: &[u8], dpi: u32, task: &PageTask) -> Result<RenderedPage> {
        let image = self.rasterizer.rasterize(document, task.index, dpi)?;
        let page = write_png(&task.output_path, task.index, image, &self.config)?;
        debug!("Wrote page {} to {:?}", page.page_number, task.output_path);
        Ok(page)
    }
}

fn stage(source: &Path, stage: ConversionStage) {
    debug!("{:?}: {:?}", source, stage);
}

fn record(batch: &mut BatchResult, source: &Path, result: Result<ConversionReport>) {
    match result {
        Ok(report) => {
            batch.total_pages += report.page_count;
            batch.successful.push(report);
        }
        Err(error) => batch.failed.push(FailedFile {
            source_path: source.to_path_buf(),
            error,
        }),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Statistics about the converter.
#[derive(Debug, Clone)]
pub struct ConverterStats {
    /// Documents converted without any failed page.
    pub documents_converted: usize,
    /// Pages written since creation.
    pub pages_written: usize,
    /// Worker threads.
    pub render_threads: usize,
    /// Rasterizer backend name.
    pub backend: &'static str,
}

/// Builder for creating a converter with custom settings.
pub struct BatchPageConverterBuilder {
    config: RenderConfig,
}

impl BatchPageConverterBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: RenderConfig::default(),
        }
    }

    /// Start from an existing configuration.
    pub fn from_config(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Set the default DPI for requests built by the converter.
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi;
        self
    }

    /// Set the number of render threads.
    pub fn render_threads(mut self, threads: usize) -> Self {
        self.config.render_threads = threads;
        self
    }

    /// Set PNG compression level (0-9).
    pub fn png_compression(mut self, level: u8) -> Self {
        self.config = self.config.png_compression(level);
        self
    }

    /// Keep the alpha channel instead of flattening onto the background.
    pub fn use_alpha(mut self, enabled: bool) -> Self {
        self.config.use_alpha = enabled;
        self
    }

    /// Set the background color.
    pub fn background_color(mut self, rgb: (u8, u8, u8)) -> Self {
        self.config.background_color = rgb;
        self
    }

    /// Build the converter.
    pub fn build(self, rasterizer: Arc<dyn PageRasterizer>) -> Result<BatchPageConverter> {
        BatchPageConverter::new(rasterizer, self.config)
    }
}

impl Default for BatchPageConverterBuilder {
    fn default() -> Self {
        Self::new()
    }
}
