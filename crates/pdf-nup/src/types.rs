use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::toolkit::ToolkitError;

#[derive(Error, Debug)]
pub enum MergeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF toolkit error: {0}")]
    Toolkit(#[from] ToolkitError),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Unsupported layout: {0} pages per sheet (expected 1, 2, 4, 6 or 9)")]
    UnsupportedLayout(usize),
    #[error("Worker for chunk {chunk} failed: {reason}")]
    WorkerFailure {
        chunk: usize,
        reason: String,
        /// Skip records gathered from the chunks that finished before the failure
        skipped: Vec<SkipRecord>,
    },
    #[error("No usable pages in any of the {} skipped input file(s)", skipped.len())]
    NoUsablePages { skipped: Vec<SkipRecord> },
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl MergeError {
    /// Skip records collected before a run-fatal error, if the error carries any
    pub fn skipped(&self) -> &[SkipRecord] {
        match self {
            MergeError::WorkerFailure { skipped, .. } | MergeError::NoUsablePages { skipped } => {
                skipped
            }
            _ => &[],
        }
    }
}

pub type Result<T> = std::result::Result<T, MergeError>;

/// Paper orientation
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Orientation {
    /// Portrait: height > width (default for most paper sizes)
    #[default]
    Portrait,
    /// Landscape: width > height
    Landscape,
}

/// Standard output sheet sizes
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PaperSize {
    A3,
    #[default]
    A4,
    A5,
    Letter,
    Legal,
    Tabloid,
    /// Explicit sheet size in points, taken as given (orientation is not applied)
    Custom { width_pt: f32, height_pt: f32 },
}

impl PaperSize {
    /// Get base dimensions in millimeters (portrait), `None` for custom sizes
    pub fn dimensions_mm(self) -> Option<(f32, f32)> {
        match self {
            PaperSize::A3 => Some((297.0, 420.0)),
            PaperSize::A4 => Some((210.0, 297.0)),
            PaperSize::A5 => Some((148.0, 210.0)),
            PaperSize::Letter => Some((215.9, 279.4)),
            PaperSize::Legal => Some((215.9, 355.6)),
            PaperSize::Tabloid => Some((279.4, 431.8)),
            PaperSize::Custom { .. } => None,
        }
    }

    /// Sheet dimensions in points with orientation applied
    pub fn dimensions_pt(self, orientation: Orientation) -> (f32, f32) {
        let (w, h) = match self {
            PaperSize::Custom {
                width_pt,
                height_pt,
            } => return (width_pt, height_pt),
            preset => {
                let (w_mm, h_mm) = preset.dimensions_mm().unwrap_or((210.0, 297.0));
                (
                    crate::constants::mm_to_pt(w_mm),
                    crate::constants::mm_to_pt(h_mm),
                )
            }
        };
        match orientation {
            Orientation::Portrait => (w, h),
            Orientation::Landscape => (h, w),
        }
    }
}

/// Why an input file shows up in the final report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SkipReason {
    /// Zero bytes or zero pages; the file contributes nothing
    Empty,
    /// The file had structural problems but pages were still extracted and used
    MalformedRecovered,
    /// No usable page could be extracted; the file was excluded
    MalformedFatal,
    /// The worker processing this file's chunk failed and the chunk was dropped
    WorkerFailed,
}

impl SkipReason {
    /// Whether the file was left out of the output entirely
    pub fn excludes_file(self) -> bool {
        !matches!(self, SkipReason::MalformedRecovered)
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SkipReason::Empty => "empty",
            SkipReason::MalformedRecovered => "malformed (recovered)",
            SkipReason::MalformedFatal => "malformed (skipped)",
            SkipReason::WorkerFailed => "worker failed",
        };
        f.write_str(label)
    }
}

/// A note about one input file: skipped outright, or used after repair
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SkipRecord {
    pub file: PathBuf,
    pub reason: SkipReason,
    pub detail: String,
}

impl SkipRecord {
    pub fn new(file: impl Into<PathBuf>, reason: SkipReason, detail: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            reason,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for SkipRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.file.display(), self.reason, self.detail)
    }
}
