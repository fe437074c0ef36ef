mod compose;
mod constants;
mod dispatch;
mod io;
pub mod layout;
mod options;
pub mod render;
mod sort;
mod stats;
#[cfg(test)]
mod testing;
pub mod toolkit;
mod types;
mod validate;

pub use compose::{CompositeSheet, PageCompositor, PlacedPage, SourcePage};
pub use constants::*;
pub use dispatch::{DispatchConfig, DispatchOutcome, MergeChunk, MergeReport, WorkDispatcher, partition};
pub use io::{collect_inputs, load_pdf, save_pdf, write_output};
pub use layout::{PagesPerSheet, SheetLayout, plan};
pub use options::*;
pub use render::LopdfToolkit;
pub use sort::{NaturalSortKey, sort_naturally};
pub use stats::{MergeStatistics, calculate_statistics};
pub use toolkit::{PdfToolkit, ToolkitError};
pub use types::*;
pub use validate::{InputValidator, ValidatedFile};

use log::info;
use lopdf::Document;
use std::sync::Arc;

/// Result of a successful merge
#[derive(Debug)]
pub struct MergeOutput<D = Document> {
    pub document: D,
    pub report: MergeReport,
    pub statistics: MergeStatistics,
}

/// Merge the configured inputs into a single N-up document.
pub async fn merge_pdfs(options: &MergeOptions) -> Result<MergeOutput> {
    merge_with(Arc::new(LopdfToolkit::new()), options).await
}

/// Merge with an explicit toolkit.
pub async fn merge_with<T: PdfToolkit>(
    toolkit: Arc<T>,
    options: &MergeOptions,
) -> Result<MergeOutput<T::Output>> {
    options.validate()?;

    let (sheet_width, sheet_height) = options.output_sheet_size();
    let layout = plan(options.pages_per_sheet, sheet_width, sheet_height)?;

    let mut files = options.input_files.clone();
    sort_naturally(&mut files);

    let dispatcher = WorkDispatcher::new(toolkit, layout, DispatchConfig::from(options));
    let DispatchOutcome { document, report } = dispatcher.run(files).await?;
    let statistics = calculate_statistics(&report, dispatcher.layout());

    info!(
        "Merged {} page(s) onto {} sheet(s), {} file(s) skipped",
        statistics.source_pages, statistics.output_sheets, statistics.files_skipped
    );

    Ok(MergeOutput {
        document,
        report,
        statistics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeToolkit;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_inputs_are_merged_in_natural_order() {
        let dir = TempDir::new().unwrap();
        let mut input_files = Vec::new();
        for name in ["f-10", "f-2", "f-1"] {
            let path = dir.path().join(format!("{}.pdf", name));
            std::fs::write(&path, format!("FAKE name={} pages=1", name)).unwrap();
            input_files.push(path);
        }

        let options = MergeOptions {
            input_files,
            pages_per_sheet: 2,
            worker_count: Some(1),
            ..Default::default()
        };
        let output = merge_with(Arc::new(FakeToolkit), &options).await.unwrap();

        assert_eq!(output.document, vec![vec!["f-1#1", "f-2#1"], vec!["f-10#1"]]);
        assert_eq!(output.statistics.blank_cells, 1);
    }

    #[tokio::test]
    async fn test_unsupported_layout_fails_before_reading_inputs() {
        let options = MergeOptions {
            input_files: vec![PathBuf::from("/does/not/exist.pdf")],
            pages_per_sheet: 5,
            ..Default::default()
        };
        let err = merge_with(Arc::new(FakeToolkit), &options).await.unwrap_err();
        assert!(matches!(err, MergeError::UnsupportedLayout(5)));
    }
}
