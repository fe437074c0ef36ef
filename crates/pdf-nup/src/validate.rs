//! Input validation: turning one file into source pages, or a skip record
//!
//! No file-level problem is ever raised as an error past this point. A file
//! either yields pages (possibly with a `MalformedRecovered` note) or a
//! [`SkipRecord`] saying why it was left out.

use log::{debug, warn};
use std::path::Path;

use crate::compose::SourcePage;
use crate::constants::DEFAULT_PAGE_DIMENSIONS;
use crate::toolkit::{PageIssue, ParseMode, PdfToolkit};
use crate::types::{SkipReason, SkipRecord};

/// Pages extracted from one usable input file
#[derive(Debug)]
pub struct ValidatedFile<C> {
    pub pages: Vec<SourcePage<C>>,
    /// Set when the file was used only after recovery
    pub note: Option<SkipRecord>,
}

/// Classifies input files as usable, empty, or broken
#[derive(Debug)]
pub struct InputValidator<'a, T> {
    toolkit: &'a T,
    strict: bool,
}

impl<'a, T: PdfToolkit> InputValidator<'a, T> {
    pub fn new(toolkit: &'a T, strict: bool) -> Self {
        Self { toolkit, strict }
    }

    /// Read and classify one input file.
    pub fn validate(&self, path: &Path) -> Result<ValidatedFile<T::Content>, SkipRecord> {
        let bytes = std::fs::read(path).map_err(|e| {
            skip(
                path,
                SkipReason::MalformedFatal,
                format!("cannot read file: {}", e),
            )
        })?;
        self.validate_bytes(path, &bytes)
    }

    /// Classify a file whose contents are already in memory.
    pub fn validate_bytes(
        &self,
        path: &Path,
        bytes: &[u8],
    ) -> Result<ValidatedFile<T::Content>, SkipRecord> {
        if bytes.is_empty() {
            return Err(skip(path, SkipReason::Empty, "zero-byte file"));
        }

        let mut notes = Vec::new();
        let (document, repaired) = match self.toolkit.parse(bytes, ParseMode::Strict) {
            Ok(document) => (document, false),
            Err(strict_err) => match self.toolkit.parse(bytes, ParseMode::Repair) {
                Ok(document) => {
                    notes.push(format!("repaired after strict parse failed ({})", strict_err));
                    (document, true)
                }
                Err(repair_err) => {
                    return Err(skip(
                        path,
                        SkipReason::MalformedFatal,
                        format!("{}; repair failed: {}", strict_err, repair_err),
                    ));
                }
            },
        };

        let probes = self.toolkit.probe_pages(document);
        if probes.is_empty() {
            return Err(if repaired {
                skip(
                    path,
                    SkipReason::MalformedFatal,
                    "repaired document has no pages",
                )
            } else {
                skip(path, SkipReason::Empty, "document has no pages")
            });
        }

        let total = probes.len();
        let mut pages = Vec::with_capacity(total);
        let mut critical = false;

        for (page_index, probe) in probes.into_iter().enumerate() {
            let mut issues = probe.issues;
            let (mut width, mut height) = probe.dimensions;
            if !(width > 0.0 && height > 0.0) {
                (width, height) = DEFAULT_PAGE_DIMENSIONS;
                if !issues.contains(&PageIssue::MissingMediaBox) {
                    issues.push(PageIssue::MissingMediaBox);
                }
            }

            let content = match probe.content {
                Some(content) if !issues.iter().any(PageIssue::is_critical) => content,
                _ => {
                    critical = true;
                    let reason = issues
                        .iter()
                        .find(|issue| issue.is_critical())
                        .map(PageIssue::describe)
                        .unwrap_or_else(|| "page content unavailable".to_string());
                    notes.push(format!("page {}: {}, dropped", page_index + 1, reason));
                    continue;
                }
            };

            for issue in &issues {
                if self.strict {
                    notes.push(format!("page {}: {}", page_index + 1, issue.describe()));
                } else {
                    debug!(
                        "{} page {}: ignoring {}",
                        path.display(),
                        page_index + 1,
                        issue.describe()
                    );
                }
            }

            pages.push(SourcePage {
                file: path.to_path_buf(),
                page_index,
                width,
                height,
                content,
            });
        }

        if self.strict && critical {
            return Err(skip(path, SkipReason::MalformedFatal, notes.join("; ")));
        }
        if pages.is_empty() {
            return Err(skip(
                path,
                SkipReason::MalformedFatal,
                format!("none of {} page(s) could be extracted: {}", total, notes.join("; ")),
            ));
        }

        let note = if notes.is_empty() {
            None
        } else {
            let record = SkipRecord::new(path, SkipReason::MalformedRecovered, notes.join("; "));
            warn!("Recovered {}", record);
            Some(record)
        };

        Ok(ValidatedFile { pages, note })
    }
}

fn skip(path: &Path, reason: SkipReason, detail: impl Into<String>) -> SkipRecord {
    let record = SkipRecord::new(path, reason, detail);
    warn!("Skipping {}", record);
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeToolkit;
    use std::path::PathBuf;

    fn validate(strict: bool, bytes: &str) -> Result<ValidatedFile<String>, SkipRecord> {
        let toolkit = FakeToolkit::default();
        InputValidator::new(&toolkit, strict).validate_bytes(&PathBuf::from("in.pdf"), bytes.as_bytes())
    }

    #[test]
    fn test_zero_byte_file_is_empty() {
        let record = validate(true, "").unwrap_err();
        assert_eq!(record.reason, SkipReason::Empty);
        assert_eq!(record.file, PathBuf::from("in.pdf"));
    }

    #[test]
    fn test_zero_page_file_is_empty() {
        let record = validate(true, "FAKE pages=0").unwrap_err();
        assert_eq!(record.reason, SkipReason::Empty);
    }

    #[test]
    fn test_valid_file_yields_pages_without_records() {
        let file = validate(true, "FAKE pages=5").unwrap();
        assert_eq!(file.pages.len(), 5);
        assert!(file.note.is_none());
        let indices: Vec<usize> = file.pages.iter().map(|p| p.page_index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_repairable_file_is_recovered() {
        let file = validate(true, "junk FAKE pages=2").unwrap();
        assert_eq!(file.pages.len(), 2);
        let note = file.note.unwrap();
        assert_eq!(note.reason, SkipReason::MalformedRecovered);
        assert!(note.detail.contains("repaired"));
    }

    #[test]
    fn test_repair_is_recorded_in_lenient_mode_too() {
        let file = validate(false, "junk FAKE pages=1").unwrap();
        assert_eq!(file.note.unwrap().reason, SkipReason::MalformedRecovered);
    }

    #[test]
    fn test_unparseable_file_is_fatal() {
        let record = validate(true, "not a document").unwrap_err();
        assert_eq!(record.reason, SkipReason::MalformedFatal);
    }

    #[test]
    fn test_repaired_file_without_pages_is_fatal() {
        let record = validate(false, "junk FAKE pages=0").unwrap_err();
        assert_eq!(record.reason, SkipReason::MalformedFatal);
    }

    #[test]
    fn test_non_critical_issue_strict_records_recovery() {
        let file = validate(true, "FAKE pages=3 missing-mediabox=2").unwrap();
        assert_eq!(file.pages.len(), 3);
        assert_eq!(file.pages[1].width, DEFAULT_PAGE_DIMENSIONS.0);
        let note = file.note.unwrap();
        assert_eq!(note.reason, SkipReason::MalformedRecovered);
        assert!(note.detail.contains("page 2"));
    }

    #[test]
    fn test_non_critical_issue_lenient_is_silent() {
        let file = validate(false, "FAKE pages=3 unreadable=1 missing-mediabox=3").unwrap();
        assert_eq!(file.pages.len(), 3);
        assert!(file.note.is_none());
    }

    #[test]
    fn test_critical_issue_strict_is_fatal() {
        let record = validate(true, "FAKE pages=3 unresolvable=2").unwrap_err();
        assert_eq!(record.reason, SkipReason::MalformedFatal);
        assert!(record.detail.contains("page 2"));
    }

    #[test]
    fn test_critical_issue_lenient_drops_page() {
        let file = validate(false, "FAKE pages=3 unresolvable=2").unwrap();
        let indices: Vec<usize> = file.pages.iter().map(|p| p.page_index).collect();
        assert_eq!(indices, vec![0, 2]);
        assert_eq!(file.note.unwrap().reason, SkipReason::MalformedRecovered);
    }

    #[test]
    fn test_lenient_all_pages_unresolvable_is_fatal() {
        let record = validate(false, "FAKE pages=1 unresolvable=1").unwrap_err();
        assert_eq!(record.reason, SkipReason::MalformedFatal);
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let toolkit = FakeToolkit::default();
        let record = InputValidator::new(&toolkit, true)
            .validate(Path::new("/definitely/not/here.pdf"))
            .unwrap_err();
        assert_eq!(record.reason, SkipReason::MalformedFatal);
    }
}
