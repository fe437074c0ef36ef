use crate::constants::DEFAULT_PAGES_PER_SHEET;
use crate::layout::PagesPerSheet;
use crate::types::*;
use std::num::NonZeroUsize;
use std::path::PathBuf;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Merge run configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MergeOptions {
    // Input
    pub input_files: Vec<PathBuf>,

    // Layout
    pub pages_per_sheet: usize,
    pub paper_size: PaperSize,
    pub orientation: Orientation,

    // Workers; `None` uses every available core
    pub worker_count: Option<usize>,
    pub tolerate_worker_failure: bool,

    // Validation
    pub strict: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            input_files: Vec::new(),
            pages_per_sheet: DEFAULT_PAGES_PER_SHEET,
            paper_size: PaperSize::default(),
            orientation: Orientation::default(),
            worker_count: None,
            tolerate_worker_failure: false,
            strict: true,
        }
    }
}

impl MergeOptions {
    /// Load options from JSON file
    #[cfg(feature = "serde")]
    pub async fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let options = serde_json::from_slice(&bytes)
            .map_err(|e| MergeError::Config(format!("Failed to parse config: {}", e)))?;
        Ok(options)
    }

    /// Save options to JSON file
    #[cfg(feature = "serde")]
    pub async fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| MergeError::Config(format!("Failed to serialize config: {}", e)))?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Output sheet size in points
    pub fn output_sheet_size(&self) -> (f32, f32) {
        self.paper_size.dimensions_pt(self.orientation)
    }

    /// Number of workers to run, resolving the default to the core count
    pub fn effective_worker_count(&self) -> usize {
        self.worker_count.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1)
        })
    }

    /// Validate the options
    pub fn validate(&self) -> Result<()> {
        PagesPerSheet::try_from(self.pages_per_sheet)?;

        if self.input_files.is_empty() {
            return Err(MergeError::Config("No input files specified".to_string()));
        }

        if self.worker_count == Some(0) {
            return Err(MergeError::Config(
                "Worker count must be at least 1".to_string(),
            ));
        }

        let (width, height) = self.output_sheet_size();
        if !(width > 0.0 && height > 0.0) {
            return Err(MergeError::Config(format!(
                "Sheet size must be positive, got {} x {} pt",
                width, height
            )));
        }

        Ok(())
    }
}
