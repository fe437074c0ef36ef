//! lopdf-backed implementation of the toolkit boundary
//!
//! - Strict and repairing parses of input files
//! - Page probing (dimensions, content, structural issues)
//! - Sheet rendering through Form XObjects
//! - Stitching worker fragments into the final document

mod page;
mod xobject;

use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::compose::CompositeSheet;
use crate::constants::OUTPUT_PDF_VERSION;
use crate::toolkit::{PageIssue, PageProbe, ParseMode, PdfToolkit, ToolkitError, ToolkitResult};
use xobject::{
    CopyCache, copy_object_deep, dangling_references, default_media_box, inherited_attribute,
    page_content, page_media_box, page_rotation,
};

impl From<lopdf::Error> for ToolkitError {
    fn from(err: lopdf::Error) -> Self {
        ToolkitError::Parse(err.to_string())
    }
}

/// A parsed input file, shared by all of its pages within one worker
#[derive(Debug)]
pub struct SourceDocument {
    /// Unique per parse; keys the object copy caches
    id: usize,
    document: Document,
}

/// Handle to one source page
#[derive(Debug, Clone)]
pub struct LopdfPage {
    source: Rc<SourceDocument>,
    page_id: ObjectId,
    media_box: [f32; 4],
    /// Clockwise display rotation: 0, 90, 180 or 270
    rotation: u16,
    content: Vec<u8>,
}

/// Sheets rendered by one worker, not yet part of the final document
#[derive(Debug)]
pub struct LopdfFragment {
    document: Document,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
    sheet_width: f32,
    sheet_height: f32,
    /// Copy caches per source document id
    caches: HashMap<usize, CopyCache>,
}

/// [`PdfToolkit`] implementation on top of `lopdf`
#[derive(Debug, Default)]
pub struct LopdfToolkit {
    next_source_id: AtomicUsize,
}

impl LopdfToolkit {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PdfToolkit for LopdfToolkit {
    type Document = Document;
    type Content = LopdfPage;
    type Fragment = LopdfFragment;
    type Output = Document;

    fn parse(&self, bytes: &[u8], mode: ParseMode) -> ToolkitResult<Document> {
        match mode {
            ParseMode::Strict => Ok(Document::load_mem(bytes)?),
            ParseMode::Repair => {
                let repaired = repair_bytes(bytes).ok_or_else(|| {
                    ToolkitError::Parse("no %PDF- header found".to_string())
                })?;
                Ok(Document::load_mem(&repaired)?)
            }
        }
    }

    fn probe_pages(&self, document: Document) -> Vec<PageProbe<LopdfPage>> {
        let page_ids: Vec<ObjectId> = document.get_pages().values().copied().collect();
        let source = Rc::new(SourceDocument {
            id: self.next_source_id.fetch_add(1, Ordering::Relaxed),
            document,
        });

        page_ids
            .into_iter()
            .map(|page_id| probe_page(&source, page_id))
            .collect()
    }

    fn new_fragment(&self, sheet_width: f32, sheet_height: f32) -> LopdfFragment {
        let mut document = Document::with_version(OUTPUT_PDF_VERSION);
        let pages_id = document.new_object_id();
        LopdfFragment {
            document,
            pages_id,
            page_ids: Vec::new(),
            sheet_width,
            sheet_height,
            caches: HashMap::new(),
        }
    }

    fn render_sheet(
        &self,
        fragment: &mut LopdfFragment,
        sheet: CompositeSheet<LopdfPage>,
    ) -> ToolkitResult<()> {
        page::render_sheet_page(fragment, sheet)
            .map(|_| ())
            .map_err(|e| match e {
                ToolkitError::Parse(reason) => ToolkitError::Render(reason),
                other => other,
            })
    }

    fn assemble(&self, fragments: Vec<LopdfFragment>) -> ToolkitResult<Document> {
        let mut output = Document::with_version(OUTPUT_PDF_VERSION);
        let pages_tree_id = output.new_object_id();
        let mut page_refs = Vec::new();

        for fragment in &fragments {
            let mut cache = CopyCache::new();
            for &page_id in &fragment.page_ids {
                let page_dict = fragment.document.get_dictionary(page_id)?;

                // Copy everything except the back-link into the fragment's page tree
                let mut new_page = Dictionary::new();
                for (key, value) in page_dict.iter() {
                    if key.as_slice() == b"Parent" {
                        continue;
                    }
                    new_page.set(
                        key.clone(),
                        copy_object_deep(&mut output, &fragment.document, value, &mut cache)?,
                    );
                }
                new_page.set("Parent", Object::Reference(pages_tree_id));
                page_refs.push(Object::Reference(output.add_object(new_page)));
            }
        }

        // Create pages tree
        let count = page_refs.len() as i64;
        let pages_dict = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(page_refs)),
            ("Count", Object::Integer(count)),
        ]);
        output
            .objects
            .insert(pages_tree_id, Object::Dictionary(pages_dict));

        // Create catalog
        let catalog_id = output.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_tree_id)),
        ]));
        output.trailer.set("Root", catalog_id);

        Ok(output)
    }

    fn output_page_count(&self, output: &Document) -> usize {
        output.get_pages().len()
    }

    fn write(&self, output: &mut Document, mut writer: &mut dyn Write) -> ToolkitResult<()> {
        output
            .save_to(&mut writer)
            .map_err(|e| ToolkitError::Write(e.to_string()))
    }
}

/// Gather dimensions, content and issues for one page.
fn probe_page(source: &Rc<SourceDocument>, page_id: ObjectId) -> PageProbe<LopdfPage> {
    let doc = &source.document;
    let page_dict = match doc.get_dictionary(page_id) {
        Ok(dict) => dict,
        Err(e) => {
            let fallback = default_media_box();
            return PageProbe {
                dimensions: (fallback[2], fallback[3]),
                issues: vec![PageIssue::Unresolvable(e.to_string())],
                content: None,
            };
        }
    };

    let mut issues = Vec::new();

    let media_box = page_media_box(doc, page_dict).unwrap_or_else(|| {
        issues.push(PageIssue::MissingMediaBox);
        default_media_box()
    });

    let content = page_content(doc, page_dict).unwrap_or_else(|e| {
        issues.push(PageIssue::UnreadableContent(e.to_string()));
        Vec::new()
    });

    if let Some(resources) = inherited_attribute(doc, page_dict, b"Resources") {
        let missing = dangling_references(doc, resources);
        if !missing.is_empty() {
            let refs: Vec<String> = missing
                .iter()
                .map(|(num, generation)| format!("{} {} R", num, generation))
                .collect();
            issues.push(PageIssue::MissingResources(refs.join(", ")));
        }
    }

    let rotation = page_rotation(doc, page_dict);
    let (width, height) = (media_box[2] - media_box[0], media_box[3] - media_box[1]);
    let dimensions = if rotation % 180 == 0 {
        (width, height)
    } else {
        (height, width)
    };

    PageProbe {
        dimensions,
        issues,
        content: Some(LopdfPage {
            source: Rc::clone(source),
            page_id,
            media_box,
            rotation,
            content,
        }),
    }
}

/// Best-effort structural repair: drop junk before the header and after the
/// last end-of-file marker, and terminate truncated files.
fn repair_bytes(bytes: &[u8]) -> Option<Vec<u8>> {
    let start = find(bytes, b"%PDF-")?;
    let body = &bytes[start..];

    let mut repaired = match rfind(body, b"%%EOF") {
        Some(eof) => body[..eof + b"%%EOF".len()].to_vec(),
        None => {
            let mut truncated = body.to_vec();
            truncated.extend_from_slice(b"\n%%EOF\n");
            truncated
        }
    };
    if !repaired.ends_with(b"\n") {
        repaired.push(b'\n');
    }
    Some(repaired)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .rposition(|window| window == needle)
}
