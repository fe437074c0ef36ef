use crate::dispatch::MergeReport;
use crate::layout::SheetLayout;
use crate::types::SkipReason;
use std::fmt;

/// Printable summary of a finished merge
#[derive(Debug, Clone, PartialEq)]
pub struct MergeStatistics {
    /// Number of input files considered
    pub input_files: usize,
    /// Files that contributed at least one page
    pub files_used: usize,
    /// Files left out entirely
    pub files_skipped: usize,
    /// Files used only after recovery
    pub files_recovered: usize,
    /// Source pages placed on sheets
    pub source_pages: usize,
    /// Output sheets
    pub output_sheets: usize,
    /// Pages per sheet
    pub pages_per_sheet: usize,
    /// Empty cells left on partial sheets
    pub blank_cells: usize,
    /// Number of worker chunks
    pub chunks: usize,
}

/// Summarize a merge report for display
pub fn calculate_statistics(report: &MergeReport, layout: &SheetLayout) -> MergeStatistics {
    let files_skipped = report
        .skipped
        .iter()
        .filter(|record| record.reason.excludes_file())
        .count();
    let files_recovered = report
        .skipped
        .iter()
        .filter(|record| record.reason == SkipReason::MalformedRecovered)
        .count();

    let capacity = layout.capacity();
    let blank_cells = (report.sheets * capacity).saturating_sub(report.pages_placed);

    MergeStatistics {
        input_files: report.files_total,
        files_used: report.files_used,
        files_skipped,
        files_recovered,
        source_pages: report.pages_placed,
        output_sheets: report.sheets,
        pages_per_sheet: capacity,
        blank_cells,
        chunks: report.chunks,
    }
}

impl fmt::Display for MergeStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Input files:     {}", self.input_files)?;
        writeln!(
            f,
            "  used:          {} ({} recovered)",
            self.files_used, self.files_recovered
        )?;
        writeln!(f, "  skipped:       {}", self.files_skipped)?;
        writeln!(f, "Source pages:    {}", self.source_pages)?;
        writeln!(
            f,
            "Output sheets:   {} at {}-up",
            self.output_sheets, self.pages_per_sheet
        )?;
        writeln!(f, "Blank cells:     {}", self.blank_cells)?;
        write!(f, "Worker chunks:   {}", self.chunks)
    }
}
