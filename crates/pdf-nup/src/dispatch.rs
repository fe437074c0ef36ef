//! Parallel merge pipeline
//!
//! The sorted input list is cut into contiguous chunks, one per worker. Each
//! worker validates, composes and renders its chunk on its own, and the
//! results are stitched back together in chunk order. Sheets never span two
//! chunks: a chunk's trailing partial sheet is emitted as-is, so the output
//! for a given worker count is always the same.

use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;

use crate::compose::PageCompositor;
use crate::layout::SheetLayout;
use crate::options::MergeOptions;
use crate::toolkit::{PdfToolkit, ToolkitError};
use crate::types::*;
use crate::validate::InputValidator;

/// Knobs for one dispatcher run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispatchConfig {
    pub worker_count: usize,
    pub strict: bool,
    /// Drop a failed chunk (recording its files) instead of aborting the run
    pub tolerate_worker_failure: bool,
}

impl From<&MergeOptions> for DispatchConfig {
    fn from(options: &MergeOptions) -> Self {
        Self {
            worker_count: options.effective_worker_count(),
            strict: options.strict,
            tolerate_worker_failure: options.tolerate_worker_failure,
        }
    }
}

/// A contiguous slice of the sorted input list, owned by one worker
#[derive(Debug, Clone, PartialEq)]
pub struct MergeChunk {
    /// Position of the chunk in dispatch order
    pub index: usize,
    /// Position of the chunk's first file in the full sorted list
    pub start: usize,
    pub files: Vec<PathBuf>,
}

/// Split `files` into at most `workers` contiguous, near-equal chunks.
///
/// Earlier chunks take the remainder, so sizes differ by at most one. No
/// empty chunks are produced.
pub fn partition(files: &[PathBuf], workers: usize) -> Vec<MergeChunk> {
    let workers = workers.max(1).min(files.len());
    if workers == 0 {
        return Vec::new();
    }

    let base = files.len() / workers;
    let remainder = files.len() % workers;

    let mut chunks = Vec::with_capacity(workers);
    let mut start = 0;
    for index in 0..workers {
        let len = base + usize::from(index < remainder);
        chunks.push(MergeChunk {
            index,
            start,
            files: files[start..start + len].to_vec(),
        });
        start += len;
    }
    chunks
}

/// What one worker produced for its chunk
#[derive(Debug)]
struct ChunkResult<F> {
    fragment: F,
    files_used: usize,
    pages: usize,
    sheets: usize,
    skipped: Vec<SkipRecord>,
}

/// Summary of a finished run
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MergeReport {
    pub files_total: usize,
    pub files_used: usize,
    pub pages_placed: usize,
    pub sheets: usize,
    pub chunks: usize,
    /// Skip and recovery notes, in sorted input order
    pub skipped: Vec<SkipRecord>,
}

/// Final document plus the run report
#[derive(Debug)]
pub struct DispatchOutcome<O> {
    pub document: O,
    pub report: MergeReport,
}

/// Runs chunks on the blocking pool and reassembles their output
#[derive(Debug)]
pub struct WorkDispatcher<T> {
    toolkit: Arc<T>,
    layout: Arc<SheetLayout>,
    config: DispatchConfig,
}

impl<T: PdfToolkit> WorkDispatcher<T> {
    pub fn new(toolkit: Arc<T>, layout: SheetLayout, config: DispatchConfig) -> Self {
        Self {
            toolkit,
            layout: Arc::new(layout),
            config,
        }
    }

    pub fn layout(&self) -> &SheetLayout {
        &self.layout
    }

    /// Merge `sorted_files` into one document.
    pub async fn run(&self, sorted_files: Vec<PathBuf>) -> Result<DispatchOutcome<T::Output>> {
        let files_total = sorted_files.len();
        let chunks = partition(&sorted_files, self.config.worker_count);
        info!(
            "Merging {} file(s) in {} chunk(s), {} page(s) per sheet",
            files_total,
            chunks.len(),
            self.layout.capacity()
        );

        let mut handles = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let toolkit = Arc::clone(&self.toolkit);
            let layout = Arc::clone(&self.layout);
            let strict = self.config.strict;
            let files = chunk.files.clone();
            let index = chunk.index;
            let handle = tokio::task::spawn_blocking(move || {
                process_chunk(&*toolkit, layout, chunk, strict, files_total)
            });
            handles.push((index, files, handle));
        }

        let mut report = MergeReport {
            files_total,
            chunks: handles.len(),
            ..Default::default()
        };
        let mut fragments = Vec::with_capacity(handles.len());

        // Await in chunk order, not completion order
        for (index, files, handle) in handles {
            let outcome = match handle.await {
                Ok(Ok(result)) => Ok(result),
                Ok(Err(e)) => Err(e.to_string()),
                Err(join) => Err(format!("worker did not finish: {}", join)),
            };

            match outcome {
                Ok(result) => {
                    report.files_used += result.files_used;
                    report.pages_placed += result.pages;
                    report.sheets += result.sheets;
                    report.skipped.extend(result.skipped);
                    fragments.push(result.fragment);
                }
                Err(reason) if self.config.tolerate_worker_failure => {
                    warn!("Chunk {} failed, dropping its {} file(s): {}", index, files.len(), reason);
                    report.skipped.extend(
                        files
                            .into_iter()
                            .map(|file| SkipRecord::new(file, SkipReason::WorkerFailed, &reason)),
                    );
                }
                Err(reason) => {
                    return Err(MergeError::WorkerFailure {
                        chunk: index,
                        reason,
                        skipped: report.skipped,
                    });
                }
            }
        }

        if report.pages_placed == 0 {
            return Err(MergeError::NoUsablePages {
                skipped: report.skipped,
            });
        }

        let toolkit = Arc::clone(&self.toolkit);
        let document = tokio::task::spawn_blocking(move || toolkit.assemble(fragments)).await??;

        let assembled = self.toolkit.output_page_count(&document);
        if assembled != report.sheets {
            warn!(
                "Assembled document has {} page(s), expected {} sheet(s)",
                assembled, report.sheets
            );
        }

        info!(
            "Placed {} page(s) from {}/{} file(s) on {} sheet(s)",
            report.pages_placed, report.files_used, report.files_total, report.sheets
        );

        Ok(DispatchOutcome { document, report })
    }
}

/// Validate, compose and render one chunk on the current thread.
fn process_chunk<T: PdfToolkit>(
    toolkit: &T,
    layout: Arc<SheetLayout>,
    chunk: MergeChunk,
    strict: bool,
    files_total: usize,
) -> std::result::Result<ChunkResult<T::Fragment>, ToolkitError> {
    let validator = InputValidator::new(toolkit, strict);
    let mut fragment = toolkit.new_fragment(layout.sheet_width, layout.sheet_height);
    let mut compositor = PageCompositor::new(layout);

    let mut result_pages = 0;
    let mut sheets = 0;
    let mut files_used = 0;
    let mut skipped = Vec::new();

    for (offset, path) in chunk.files.iter().enumerate() {
        info!(
            "Processing file {}/{}: {}",
            chunk.start + offset + 1,
            files_total,
            path.display()
        );

        let file = match validator.validate(path) {
            Ok(file) => file,
            Err(record) => {
                skipped.push(record);
                continue;
            }
        };

        files_used += 1;
        skipped.extend(file.note);
        for page in file.pages {
            result_pages += 1;
            if let Some(sheet) = compositor.accept(page) {
                toolkit.render_sheet(&mut fragment, sheet)?;
                sheets += 1;
            }
        }
    }

    if let Some(sheet) = compositor.flush() {
        toolkit.render_sheet(&mut fragment, sheet)?;
        sheets += 1;
    }

    Ok(ChunkResult {
        fragment,
        files_used,
        pages: result_pages,
        sheets,
        skipped,
    })
}
