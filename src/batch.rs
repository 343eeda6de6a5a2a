// src/batch.rs - Sequential quantification of every image in a folder

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use log::{debug, info, warn};

use crate::config::FailurePolicy;
use crate::errors::{QuantError, Result};
use crate::image_io::list_images;
use crate::progress::ProgressSink;
use crate::results::ResultStore;
use crate::scratch::ScratchArea;
use crate::segmentation::{quantify, RenderMode};

/// Shared flag for stopping a batch between images
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// An image the batch skipped
#[derive(Debug, Clone, PartialEq)]
pub struct FailedImage {
    pub path: PathBuf,
    pub message: String,
}

/// Summary of a completed (or cancelled) run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub discovered: usize,
    pub processed: usize,
    pub failures: Vec<FailedImage>,
    pub cancelled: bool,
}

/// Why a batch was not started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    InvalidInputFolder,
    NoImagesFound,
}

impl Rejection {
    /// Map a precondition error to the rejection it causes, if it is one
    pub fn from_error(error: &QuantError) -> Option<Self> {
        match error {
            QuantError::InvalidDirectory(_) => Some(Rejection::InvalidInputFolder),
            QuantError::EmptyDirectory(_) => Some(Rejection::NoImagesFound),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    Rejected(Rejection),
    Completed(BatchReport),
}

/// Drives segmentation over a folder, one image at a time.
///
/// Owns the scratch area and the results of the latest run.
pub struct BatchRunner {
    scratch: ScratchArea,
    policy: FailurePolicy,
    render_mode: RenderMode,
    cancel: CancelToken,
    results: ResultStore,
}

impl BatchRunner {
    pub fn new(scratch: ScratchArea) -> Self {
        Self {
            scratch,
            policy: FailurePolicy::default(),
            render_mode: RenderMode::default(),
            cancel: CancelToken::new(),
            results: ResultStore::new(),
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_render_mode(mut self, render_mode: RenderMode) -> Self {
        self.render_mode = render_mode;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn results(&self) -> &ResultStore {
        &self.results
    }

    pub fn scratch(&self) -> &ScratchArea {
        &self.scratch
    }

    /// Quantify every image in `directory`.
    ///
    /// A missing folder or a folder without images is reported through
    /// `progress.status` and returned as `Rejected` without touching the
    /// scratch area. Otherwise the previous results and scratch contents
    /// are discarded before the first image is processed.
    pub fn run_batch<P: AsRef<Path>>(
        &mut self,
        directory: P,
        progress: &dyn ProgressSink,
    ) -> Result<BatchOutcome> {
        let directory = directory.as_ref();

        let images = match discover(directory) {
            Ok(images) => images,
            Err(e) => match Rejection::from_error(&e) {
                Some(rejection) => {
                    warn!("{}", e);
                    progress.status(&e.to_string());
                    return Ok(BatchOutcome::Rejected(rejection));
                }
                None => return Err(e),
            },
        };

        self.results = ResultStore::new();
        self.scratch.clear()?;

        progress.reset();
        progress.set_maximum(images.len());

        info!("Quantifying {} images from {}", images.len(), directory.display());
        let start_time = Instant::now();

        let mut report = BatchReport {
            discovered: images.len(),
            ..BatchReport::default()
        };

        for (index, path) in images.iter().enumerate() {
            if self.cancel.is_cancelled() {
                info!("Batch cancelled after {} of {} images", index, images.len());
                report.cancelled = true;
                break;
            }

            debug!("Processing: {}", path.display());
            match quantify(path, &self.scratch, self.render_mode) {
                Ok(result) => {
                    self.results.push(result);
                    report.processed += 1;
                }
                Err(e) if e.is_per_image() && self.policy == FailurePolicy::Skip => {
                    warn!("Skipping {}: {}", path.display(), e);
                    report.failures.push(FailedImage {
                        path: path.clone(),
                        message: e.to_string(),
                    });
                }
                Err(e) => {
                    warn!("Aborting batch at {}: {}", path.display(), e);
                    return Err(e);
                }
            }

            progress.set_value(index);
        }

        progress.finish(report.processed + report.failures.len());

        info!(
            "Batch finished in {:.2} seconds: {} processed, {} failed",
            start_time.elapsed().as_secs_f64(),
            report.processed,
            report.failures.len()
        );

        Ok(BatchOutcome::Completed(report))
    }
}

/// Check the batch preconditions and list the images to process
fn discover(directory: &Path) -> Result<Vec<PathBuf>> {
    if directory.as_os_str().is_empty() || !directory.is_dir() {
        return Err(QuantError::InvalidDirectory(directory.to_path_buf()));
    }

    let images = list_images(directory)?;
    if images.is_empty() {
        return Err(QuantError::EmptyDirectory(directory.to_path_buf()));
    }
    Ok(images)
}
