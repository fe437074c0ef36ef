//! In-memory toolkit for unit tests
//!
//! Input "documents" are short text descriptions:
//! `FAKE name=a pages=3 missing-mediabox=2 unreadable=1 unresolvable=3 fail-render`.
//! Strict parsing requires the text to start with `FAKE`; repair parsing
//! accepts it anywhere. Page numbers in issue tokens are 1-based.

use std::io::Write;

use crate::compose::CompositeSheet;
use crate::constants::DEFAULT_PAGE_DIMENSIONS;
use crate::toolkit::{PageIssue, PageProbe, ParseMode, PdfToolkit, ToolkitError, ToolkitResult};

#[derive(Debug, Clone, Default)]
pub(crate) struct FakeDocument {
    name: Option<String>,
    pages: usize,
    missing_media_box: Vec<usize>,
    unreadable: Vec<usize>,
    unresolvable: Vec<usize>,
    fail_render: bool,
}

/// Rendered sheets: one entry per sheet, listing page labels in cell order
#[derive(Debug, Default)]
pub(crate) struct FakeFragment {
    pub sheets: Vec<Vec<String>>,
}

#[derive(Debug, Default)]
pub(crate) struct FakeToolkit;

impl FakeToolkit {
    fn parse_description(text: &str) -> ToolkitResult<FakeDocument> {
        let mut doc = FakeDocument::default();
        for token in text.split_whitespace().skip(1) {
            let (key, value) = token.split_once('=').unwrap_or((token, ""));
            let number = || {
                value
                    .parse::<usize>()
                    .map_err(|_| ToolkitError::Parse(format!("bad token {}", token)))
            };
            match key {
                "name" => doc.name = Some(value.to_string()),
                "pages" => doc.pages = number()?,
                "missing-mediabox" => doc.missing_media_box.push(number()?),
                "unreadable" => doc.unreadable.push(number()?),
                "unresolvable" => doc.unresolvable.push(number()?),
                "fail-render" => doc.fail_render = true,
                _ => return Err(ToolkitError::Parse(format!("unknown token {}", token))),
            }
        }
        Ok(doc)
    }
}

impl PdfToolkit for FakeToolkit {
    type Document = FakeDocument;
    type Content = String;
    type Fragment = FakeFragment;
    type Output = Vec<Vec<String>>;

    fn parse(&self, bytes: &[u8], mode: ParseMode) -> ToolkitResult<Self::Document> {
        let text = String::from_utf8_lossy(bytes);
        let start = match mode {
            ParseMode::Strict if text.starts_with("FAKE") => 0,
            ParseMode::Strict => return Err(ToolkitError::Parse("missing header".to_string())),
            ParseMode::Repair => text
                .find("FAKE")
                .ok_or_else(|| ToolkitError::Parse("no header to recover".to_string()))?,
        };
        Self::parse_description(&text[start..])
    }

    fn probe_pages(&self, doc: FakeDocument) -> Vec<PageProbe<String>> {
        let label = doc.name.clone().unwrap_or_else(|| "doc".to_string());
        let tag = if doc.fail_render { "!fail" } else { "" };
        (1..=doc.pages)
            .map(|n| {
                let mut issues = Vec::new();
                let mut dimensions = (300.0, 400.0);
                if doc.missing_media_box.contains(&n) {
                    issues.push(PageIssue::MissingMediaBox);
                    dimensions = DEFAULT_PAGE_DIMENSIONS;
                }
                if doc.unreadable.contains(&n) {
                    issues.push(PageIssue::UnreadableContent("bad filter".to_string()));
                }
                let content = if doc.unresolvable.contains(&n) {
                    issues.push(PageIssue::Unresolvable("dangling reference".to_string()));
                    None
                } else {
                    Some(format!("{}#{}{}", label, n, tag))
                };
                PageProbe {
                    dimensions,
                    issues,
                    content,
                }
            })
            .collect()
    }

    fn new_fragment(&self, _sheet_width: f32, _sheet_height: f32) -> FakeFragment {
        FakeFragment::default()
    }

    fn render_sheet(
        &self,
        fragment: &mut FakeFragment,
        sheet: CompositeSheet<String>,
    ) -> ToolkitResult<()> {
        let labels: Vec<String> = sheet
            .into_pages()
            .into_iter()
            .map(|placed| placed.page.content)
            .collect();
        if labels.iter().any(|label| label.ends_with("!fail")) {
            return Err(ToolkitError::Render("refusing to render".to_string()));
        }
        fragment.sheets.push(labels);
        Ok(())
    }

    fn assemble(&self, fragments: Vec<FakeFragment>) -> ToolkitResult<Vec<Vec<String>>> {
        Ok(fragments.into_iter().flat_map(|f| f.sheets).collect())
    }

    fn output_page_count(&self, output: &Vec<Vec<String>>) -> usize {
        output.len()
    }

    fn write(&self, output: &mut Vec<Vec<String>>, writer: &mut dyn Write) -> ToolkitResult<()> {
        for sheet in output.iter() {
            writeln!(writer, "{}", sheet.join(" | "))
                .map_err(|e| ToolkitError::Write(e.to_string()))?;
        }
        Ok(())
    }
}
