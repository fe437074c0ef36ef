//! Capability boundary between the merge core and a PDF library
//!
//! The layout, composition, validation and dispatch code only talk to a
//! [`PdfToolkit`]. The lopdf-backed implementation lives in [`crate::render`].

use std::io::Write;
use thiserror::Error;

use crate::compose::CompositeSheet;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolkitError {
    #[error("parse failed: {0}")]
    Parse(String),
    #[error("render failed: {0}")]
    Render(String),
    #[error("write failed: {0}")]
    Write(String),
}

pub type ToolkitResult<T> = std::result::Result<T, ToolkitError>;

/// How hard the toolkit should try to make sense of the input bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Parse the bytes as they are
    Strict,
    /// Best-effort structural recovery before parsing
    Repair,
}

/// A structural irregularity found on one page
#[derive(Debug, Clone, PartialEq)]
pub enum PageIssue {
    /// No usable MediaBox; default dimensions were substituted
    MissingMediaBox,
    /// Content stream could not be read; the page renders blank
    UnreadableContent(String),
    /// Resources refer to objects that do not exist; they are dropped
    MissingResources(String),
    /// The page object itself could not be resolved
    Unresolvable(String),
}

impl PageIssue {
    /// Critical issues leave nothing to place on the sheet
    pub fn is_critical(&self) -> bool {
        matches!(self, PageIssue::Unresolvable(_))
    }

    pub fn describe(&self) -> String {
        match self {
            PageIssue::MissingMediaBox => "missing MediaBox".to_string(),
            PageIssue::UnreadableContent(reason) => format!("unreadable content ({})", reason),
            PageIssue::MissingResources(refs) => format!("missing resource objects ({})", refs),
            PageIssue::Unresolvable(reason) => format!("unresolvable page ({})", reason),
        }
    }
}

/// What the toolkit found out about one page of a parsed input
#[derive(Debug, Clone)]
pub struct PageProbe<C> {
    /// Width and height in points; fallback dimensions when MediaBox is missing
    pub dimensions: (f32, f32),
    pub issues: Vec<PageIssue>,
    /// Handle to the page content, `None` when the page cannot be extracted
    pub content: Option<C>,
}

/// Everything the merge pipeline needs from a PDF library.
pub trait PdfToolkit: Send + Sync + 'static {
    /// A parsed input document
    type Document;
    /// Opaque handle to one page's content; never leaves the worker that created it
    type Content;
    /// Sheets rendered by a single worker
    type Fragment: Send + 'static;
    /// The final composed document
    type Output: Send + 'static;

    /// Parse one input file's bytes.
    fn parse(&self, bytes: &[u8], mode: ParseMode) -> ToolkitResult<Self::Document>;

    /// Enumerate the pages of a parsed document in page order.
    fn probe_pages(&self, document: Self::Document) -> Vec<PageProbe<Self::Content>>;

    /// Start an empty fragment for one worker.
    fn new_fragment(&self, sheet_width: f32, sheet_height: f32) -> Self::Fragment;

    /// Render a sealed sheet as the next page of `fragment`.
    fn render_sheet(
        &self,
        fragment: &mut Self::Fragment,
        sheet: CompositeSheet<Self::Content>,
    ) -> ToolkitResult<()>;

    /// Concatenate fragments, in the given order, into the final document.
    fn assemble(&self, fragments: Vec<Self::Fragment>) -> ToolkitResult<Self::Output>;

    /// Number of pages (sheets) in a final document.
    fn output_page_count(&self, output: &Self::Output) -> usize;

    /// Serialize the final document.
    fn write(&self, output: &mut Self::Output, writer: &mut dyn Write) -> ToolkitResult<()>;
}
