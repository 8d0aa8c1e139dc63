use anyhow::{Context, Result};
use log::debug;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::cli::Args;
use crate::document::{OutputLayout, SourceDocument};
use crate::error::StageError;
use crate::logging::DebugLog;
use crate::pdf::PageExtractor;
use crate::progress::ProgressTracker;
use crate::raster::Rasterizer;
use crate::walk::Walker;

/// Extract → rasterize → write, once per PDF found under the input
/// directory.
///
/// Every PDF gets its own task as soon as the walk reaches it. Without
/// `max_in_flight` nothing limits how many run at once.
#[derive(Clone)]
pub struct CoverPipeline {
    extractor: PageExtractor,
    rasterizer: Rasterizer,
    layout: OutputLayout,
    log: DebugLog,
    raster_index: usize,
    skip_extract: bool,
    limit: Option<Arc<Semaphore>>,
    progress: ProgressTracker,
}

/// Counts for one run. Per-file failures never turn into an error.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub discovered: usize,
    pub skipped: usize,
    pub converted: usize,
    pub failed: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Converted {}/{} PDF covers ({} failed, {} other files skipped)",
            self.converted, self.discovered, self.failed, self.skipped
        )
    }
}

impl CoverPipeline {
    pub fn new(
        extractor: PageExtractor,
        rasterizer: Rasterizer,
        layout: OutputLayout,
        log: DebugLog,
    ) -> Self {
        Self {
            extractor,
            rasterizer,
            layout,
            log,
            raster_index: 0,
            skip_extract: false,
            limit: None,
            progress: ProgressTracker::new(false),
        }
    }

    pub fn from_args(args: &Args, log: DebugLog) -> Self {
        let mut extractor = PageExtractor::new(args.extractor);
        if let Some(program) = &args.extractor_bin {
            extractor = extractor.with_program(program);
        }
        let mut rasterizer = Rasterizer::new(args.quality);
        if let Some(program) = &args.rasterizer_bin {
            rasterizer = rasterizer.with_program(program);
        }

        Self::new(extractor, rasterizer, OutputLayout::new(&args.output_dir), log)
            .raster_index(args.raster_index)
            .skip_extract(args.skip_extract)
            .max_in_flight(args.max_in_flight)
            .progress(ProgressTracker::new(args.progress))
    }

    /// Index of the rendered image written as the cover PNG.
    pub fn raster_index(mut self, index: usize) -> Self {
        self.raster_index = index;
        self
    }

    /// Rasterize source PDFs directly instead of extracting page 1 first.
    pub fn skip_extract(mut self, skip: bool) -> Self {
        self.skip_extract = skip;
        self
    }

    pub fn max_in_flight(mut self, limit: Option<usize>) -> Self {
        self.limit = limit.map(|n| Arc::new(Semaphore::new(n.max(1))));
        self
    }

    pub fn progress(mut self, progress: ProgressTracker) -> Self {
        self.progress = progress;
        self
    }

    pub fn extractor(&self) -> &PageExtractor {
        &self.extractor
    }

    pub fn rasterizer(&self) -> &Rasterizer {
        &self.rasterizer
    }

    /// Walk `input_dir` and convert every `.pdf` in it.
    ///
    /// Only a broken walk is an error; it drops (and so aborts) whatever
    /// conversions are still running.
    pub async fn run(&self, input_dir: &Path) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        let mut tasks = JoinSet::new();

        let walker = Walker::new(input_dir).excluding(self.layout.resolved_dirs());
        for entry in walker {
            let path =
                entry.with_context(|| format!("Failed to walk {}", input_dir.display()))?;

            match SourceDocument::from_path(&path) {
                Some(doc) if doc.is_pdf() => {
                    summary.discovered += 1;
                    self.progress.discovered();
                    let pipeline = self.clone();
                    tasks.spawn(async move { pipeline.process(doc).await });
                }
                _ => {
                    debug!("Skipping {}", path.display());
                    summary.skipped += 1;
                }
            }
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(_)) => summary.converted += 1,
                Ok(Err(_)) => summary.failed += 1,
                Err(e) => {
                    self.log.error(format_args!("Conversion task failed: {e}"));
                    summary.failed += 1;
                }
            }
        }

        self.progress.finish();
        Ok(summary)
    }

    /// Convert one document, logging the failure if there is one.
    async fn process(&self, doc: SourceDocument) -> Result<PathBuf, StageError> {
        let result = self.convert(&doc).await;
        if let Err(e) = &result {
            self.log.error(format_args!("{e}"));
        }
        self.progress.increment();
        result
    }

    async fn convert(&self, doc: &SourceDocument) -> Result<PathBuf, StageError> {
        let _permit = match &self.limit {
            Some(limit) => limit.acquire().await.ok(),
            None => None,
        };

        debug!("Processing {}", doc.path.display());

        let cover = if self.skip_extract {
            doc.path.clone()
        } else {
            let cover = self.layout.cover_path(&doc.name);
            self.extractor
                .extract_cover(&doc.path, &cover)
                .await
                .map_err(StageError::Extract)?;
            self.log.info(format_args!("Report #{} cover exported.", doc.name));
            cover
        };

        let raster = self
            .rasterizer
            .rasterize(&cover)
            .await
            .map_err(StageError::Raster)?;

        let image = raster
            .image(self.raster_index)
            .ok_or_else(|| StageError::MissingImage {
                name: doc.name.clone(),
                index: self.raster_index,
                available: raster.images.len(),
            })?;

        let png = self.layout.png_path(&doc.name);
        tokio::fs::write(&png, image)
            .await
            .map_err(|source| StageError::Write {
                path: png.clone(),
                source,
            })?;

        self.log.info(format_args!("Report #{} cover converted.", doc.name));
        Ok(png)
    }
}
