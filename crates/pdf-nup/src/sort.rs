//! Natural ordering of input file names
//!
//! Digit runs compare by magnitude, so `File 2.pdf` sorts before `File 10.pdf`.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

/// One run of a file name: either text or a digit run
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Number {
        /// Digits with leading zeros stripped ("0" for an all-zero run)
        magnitude: String,
        /// The digit run as written, used to break ties between `7` and `007`
        raw: String,
    },
}

impl Ord for Segment {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Segment::Text(a), Segment::Text(b)) => a.cmp(b),
            (
                Segment::Number { magnitude: a, raw: ra },
                Segment::Number { magnitude: b, raw: rb },
            ) => a
                .len()
                .cmp(&b.len())
                .then_with(|| a.cmp(b))
                .then_with(|| ra.cmp(rb)),
            // Digits sort before letters, as they do in ASCII
            (Segment::Number { .. }, Segment::Text(_)) => Ordering::Less,
            (Segment::Text(_), Segment::Number { .. }) => Ordering::Greater,
        }
    }
}

impl PartialOrd for Segment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Ordering key derived from a file name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct NaturalSortKey(Vec<Segment>);

impl NaturalSortKey {
    /// Split `name` into alternating text and digit runs.
    pub fn new(name: &str) -> Self {
        let mut segments = Vec::new();
        let mut current = String::new();
        let mut in_digits = false;

        for ch in name.chars() {
            let is_digit = ch.is_ascii_digit();
            if !current.is_empty() && is_digit != in_digits {
                segments.push(Self::segment(std::mem::take(&mut current), in_digits));
            }
            in_digits = is_digit;
            current.push(ch);
        }
        if !current.is_empty() {
            segments.push(Self::segment(current, in_digits));
        }

        Self(segments)
    }

    /// Key for a path, taken from its file name component
    pub fn for_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        Self::new(&name)
    }

    fn segment(run: String, digits: bool) -> Segment {
        if digits {
            let trimmed = run.trim_start_matches('0');
            let magnitude = if trimmed.is_empty() { "0" } else { trimmed };
            Segment::Number {
                magnitude: magnitude.to_string(),
                raw: run,
            }
        } else {
            Segment::Text(run)
        }
    }
}

/// Stable natural sort of paths by file name.
///
/// Paths with identical keys keep their relative input order.
pub fn sort_naturally(paths: &mut [PathBuf]) {
    paths.sort_by_cached_key(|path| NaturalSortKey::for_path(path));
}
