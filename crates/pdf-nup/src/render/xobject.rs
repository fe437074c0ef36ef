//! Form XObject creation and object copying
//!
//! Source pages are wrapped as Form XObjects so they can be drawn onto a
//! sheet with a single `cm` transform.

use crate::constants::DEFAULT_PAGE_DIMENSIONS;
use crate::toolkit::{ToolkitError, ToolkitResult};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::{HashMap, HashSet};

/// Object id mapping from one source document into one target document
pub(crate) type CopyCache = HashMap<ObjectId, ObjectId>;

// =============================================================================
// XObject Creation
// =============================================================================

/// Create a Form XObject in `output` from a source page.
///
/// `content` is the already-extracted page content stream. Resources are
/// deep-copied through `cache` so objects shared between pages of the same
/// source (fonts, images) are only copied once.
pub(crate) fn create_page_xobject(
    output: &mut Document,
    source: &Document,
    page_id: ObjectId,
    media_box: [f32; 4],
    content: &[u8],
    cache: &mut CopyCache,
) -> ToolkitResult<ObjectId> {
    let mut xobject_dict = Dictionary::new();
    xobject_dict.set("Type", Object::Name(b"XObject".to_vec()));
    xobject_dict.set("Subtype", Object::Name(b"Form".to_vec()));
    xobject_dict.set(
        "BBox",
        Object::Array(media_box.iter().map(|&v| Object::Real(v)).collect()),
    );
    xobject_dict.set("FormType", Object::Integer(1));

    if let Ok(page_dict) = source.get_dictionary(page_id) {
        if let Some(resources) = inherited_attribute(source, page_dict, b"Resources") {
            xobject_dict.set(
                "Resources",
                copy_object_deep(output, source, resources, cache)?,
            );
        }
    }

    Ok(output.add_object(Stream::new(xobject_dict, content.to_vec())))
}

// =============================================================================
// Page Attributes
// =============================================================================

/// Look up a page attribute, following `Parent` links for inheritable keys.
pub(crate) fn inherited_attribute<'a>(
    doc: &'a Document,
    page_dict: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Object> {
    let mut dict = page_dict;
    // Page trees are shallow; the bound guards against Parent cycles
    for _ in 0..32 {
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        let parent_id = dict.get(b"Parent").and_then(Object::as_reference).ok()?;
        dict = doc.get_dictionary(parent_id).ok()?;
    }
    None
}

/// Get the MediaBox of a page as `[llx, lly, urx, ury]`, if it is usable.
pub(crate) fn page_media_box(doc: &Document, page_dict: &Dictionary) -> Option<[f32; 4]> {
    let object = inherited_attribute(doc, page_dict, b"MediaBox")?;
    let array = match object {
        Object::Reference(id) => doc.get_object(*id).ok()?.as_array().ok()?,
        other => other.as_array().ok()?,
    };
    if array.len() != 4 {
        return None;
    }

    let mut values = [0.0f32; 4];
    for (slot, obj) in values.iter_mut().zip(array) {
        *slot = extract_number(obj)?;
    }

    let [llx, lly, urx, ury] = values;
    // Normalize boxes written with swapped corners
    let normalized = [llx.min(urx), lly.min(ury), llx.max(urx), lly.max(ury)];
    if normalized[2] - normalized[0] > 0.0 && normalized[3] - normalized[1] > 0.0 {
        Some(normalized)
    } else {
        None
    }
}

/// Page rotation in degrees, normalized to 0, 90, 180 or 270.
///
/// Values that are not a multiple of 90 are ignored.
pub(crate) fn page_rotation(doc: &Document, page_dict: &Dictionary) -> u16 {
    let degrees = match inherited_attribute(doc, page_dict, b"Rotate") {
        Some(Object::Integer(value)) => *value,
        Some(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Integer(value)) => *value,
            _ => 0,
        },
        _ => 0,
    };
    let normalized = degrees.rem_euclid(360);
    if normalized % 90 == 0 { normalized as u16 } else { 0 }
}

/// MediaBox used when a page does not declare a usable one
pub(crate) fn default_media_box() -> [f32; 4] {
    [0.0, 0.0, DEFAULT_PAGE_DIMENSIONS.0, DEFAULT_PAGE_DIMENSIONS.1]
}

/// Extract numeric value from a PDF object
fn extract_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

// =============================================================================
// Page Content Extraction
// =============================================================================

/// Get the decoded content stream data from a page.
pub(crate) fn page_content(doc: &Document, page_dict: &Dictionary) -> ToolkitResult<Vec<u8>> {
    let contents = match page_dict.get(b"Contents") {
        Ok(c) => c,
        Err(_) => return Ok(Vec::new()), // No content = blank page
    };

    match contents {
        Object::Reference(id) => match doc.get_object(*id)? {
            Object::Array(arr) => concatenated_content_streams(doc, arr),
            Object::Stream(stream) => stream_bytes(stream),
            _ => Ok(Vec::new()),
        },
        Object::Array(arr) => concatenated_content_streams(doc, arr),
        _ => Ok(Vec::new()),
    }
}

/// Concatenate multiple content streams
fn concatenated_content_streams(doc: &Document, refs: &[Object]) -> ToolkitResult<Vec<u8>> {
    let mut result = Vec::new();

    for obj in refs {
        if let Object::Reference(id) = obj {
            let stream = doc.get_object(*id)?.as_stream()?;
            result.extend_from_slice(&stream_bytes(stream)?);
            result.push(b'\n');
        }
    }

    Ok(result)
}

/// Decoded stream data; unfiltered streams are returned as stored
fn stream_bytes(stream: &Stream) -> ToolkitResult<Vec<u8>> {
    if stream.dict.get(b"Filter").is_err() {
        return Ok(stream.content.clone());
    }
    let decoded = stream
        .decompressed_content()
        .map_err(|e| ToolkitError::Parse(format!("cannot decode content stream: {}", e)))?;
    // lopdf logs corrupt Flate data and hands back nothing instead of failing
    if decoded.is_empty() && !stream.content.is_empty() {
        return Err(ToolkitError::Parse(
            "content stream decoded to nothing".to_string(),
        ));
    }
    Ok(decoded)
}

/// References reachable from `obj` that point at objects missing from `doc`
pub(crate) fn dangling_references(doc: &Document, obj: &Object) -> Vec<ObjectId> {
    let mut visited = HashSet::new();
    let mut missing = Vec::new();
    collect_dangling(doc, obj, &mut visited, &mut missing);
    missing
}

fn collect_dangling(
    doc: &Document,
    obj: &Object,
    visited: &mut HashSet<ObjectId>,
    missing: &mut Vec<ObjectId>,
) {
    match obj {
        Object::Reference(id) => {
            if !visited.insert(*id) {
                return;
            }
            match doc.get_object(*id) {
                Ok(target) => collect_dangling(doc, target, visited, missing),
                Err(_) => missing.push(*id),
            }
        }
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter() {
                collect_dangling(doc, value, visited, missing);
            }
        }
        Object::Stream(stream) => {
            for (_, value) in stream.dict.iter() {
                collect_dangling(doc, value, visited, missing);
            }
        }
        Object::Array(items) => {
            for item in items {
                collect_dangling(doc, item, visited, missing);
            }
        }
        _ => {}
    }
}

// =============================================================================
// Deep Copy
// =============================================================================

/// Deep copy an object from source to output document, following references.
///
/// Uses a cache to avoid copying the same object multiple times.
pub(crate) fn copy_object_deep(
    output: &mut Document,
    source: &Document,
    obj: &Object,
    cache: &mut CopyCache,
) -> ToolkitResult<Object> {
    match obj {
        Object::Reference(id) => {
            if let Some(&new_id) = cache.get(id) {
                return Ok(Object::Reference(new_id));
            }

            // Reserve the id before recursing so reference cycles terminate
            let new_id = output.new_object_id();
            cache.insert(*id, new_id);

            // Missing objects become null, as a reader would treat them
            let copied = match source.get_object(*id) {
                Ok(referenced) => copy_object_deep(output, source, referenced, cache)?,
                Err(_) => Object::Null,
            };
            output.objects.insert(new_id, copied);

            Ok(Object::Reference(new_id))
        }
        Object::Dictionary(dict) => Ok(Object::Dictionary(copy_dictionary(
            output, source, dict, cache,
        )?)),
        Object::Array(arr) => {
            let new_arr: ToolkitResult<Vec<_>> = arr
                .iter()
                .map(|item| copy_object_deep(output, source, item, cache))
                .collect();
            Ok(Object::Array(new_arr?))
        }
        Object::Stream(stream) => Ok(Object::Stream(Stream {
            dict: copy_dictionary(output, source, &stream.dict, cache)?,
            content: stream.content.clone(),
            allows_compression: stream.allows_compression,
            start_position: None,
        })),
        // Primitive types: just clone
        _ => Ok(obj.clone()),
    }
}

fn copy_dictionary(
    output: &mut Document,
    source: &Document,
    dict: &Dictionary,
    cache: &mut CopyCache,
) -> ToolkitResult<Dictionary> {
    let mut new_dict = Dictionary::new();
    for (key, value) in dict.iter() {
        new_dict.set(key.clone(), copy_object_deep(output, source, value, cache)?);
    }
    Ok(new_dict)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with_page(page: Dictionary) -> (Document, ObjectId) {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let mut page = page;
        page.set("Parent", Object::Reference(pages_id));
        let page_id = doc.add_object(page);
        doc.objects.insert(
            pages_id,
            Object::Dictionary(Dictionary::from_iter(vec![
                ("Type", Object::Name(b"Pages".to_vec())),
                ("Kids", Object::Array(vec![Object::Reference(page_id)])),
                ("Count", Object::Integer(1)),
                (
                    "MediaBox",
                    Object::Array(vec![
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Integer(400),
                        Object::Integer(300),
                    ]),
                ),
            ])),
        );
        (doc, page_id)
    }

    #[test]
    fn test_media_box_inherited_from_parent() {
        let (doc, page_id) = doc_with_page(Dictionary::new());
        let dict = doc.get_dictionary(page_id).unwrap();
        assert_eq!(page_media_box(&doc, dict), Some([0.0, 0.0, 400.0, 300.0]));
    }

    #[test]
    fn test_media_box_swapped_corners_normalized() {
        let mut page = Dictionary::new();
        page.set(
            "MediaBox",
            Object::Array(vec![
                Object::Real(612.0),
                Object::Real(792.0),
                Object::Integer(0),
                Object::Integer(0),
            ]),
        );
        let (doc, page_id) = doc_with_page(page);
        let dict = doc.get_dictionary(page_id).unwrap();
        assert_eq!(page_media_box(&doc, dict), Some([0.0, 0.0, 612.0, 792.0]));
    }

    #[test]
    fn test_degenerate_media_box_rejected() {
        let mut page = Dictionary::new();
        page.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(792),
            ]),
        );
        let (doc, page_id) = doc_with_page(page);
        let dict = doc.get_dictionary(page_id).unwrap();
        assert_eq!(page_media_box(&doc, dict), None);
    }

    #[test]
    fn test_copy_shares_cached_objects() {
        let mut source = Document::with_version("1.7");
        let font_id = source.add_object(Dictionary::from_iter(vec![(
            "Type",
            Object::Name(b"Font".to_vec()),
        )]));
        let resources = Object::Dictionary(Dictionary::from_iter(vec![(
            "F1",
            Object::Reference(font_id),
        )]));

        let mut output = Document::with_version("1.7");
        let mut cache = CopyCache::new();
        let first = copy_object_deep(&mut output, &source, &resources, &mut cache).unwrap();
        let second = copy_object_deep(&mut output, &source, &resources, &mut cache).unwrap();

        let font_ref = |obj: &Object| obj.as_dict().unwrap().get(b"F1").unwrap().as_reference();
        assert_eq!(font_ref(&first).unwrap(), font_ref(&second).unwrap());
        assert_eq!(output.objects.len(), 1);
    }

    #[test]
    fn test_dangling_reference_found_and_copied_as_null() {
        let mut source = Document::with_version("1.7");
        let font_id = source.add_object(Dictionary::from_iter(vec![(
            "Type",
            Object::Name(b"Font".to_vec()),
        )]));
        let resources = Object::Dictionary(Dictionary::from_iter(vec![(
            "Font",
            Object::Dictionary(Dictionary::from_iter(vec![
                ("F1", Object::Reference(font_id)),
                ("F2", Object::Reference((999, 0))),
            ])),
        )]));

        assert_eq!(dangling_references(&source, &resources), vec![(999, 0)]);

        let mut output = Document::with_version("1.7");
        let mut cache = CopyCache::new();
        let copied = copy_object_deep(&mut output, &source, &resources, &mut cache).unwrap();
        let fonts = copied.as_dict().unwrap().get(b"Font").unwrap().as_dict().unwrap();
        let missing = fonts.get(b"F2").unwrap().as_reference().unwrap();
        assert!(matches!(output.get_object(missing), Ok(Object::Null)));
    }

    #[test]
    fn test_undecodable_content_is_an_error() {
        let mut source = Document::with_version("1.7");
        let content_id = source.add_object(Stream::new(
            Dictionary::from_iter(vec![("Filter", Object::Name(b"FlateDecode".to_vec()))]),
            b"definitely not zlib".to_vec(),
        ));
        let mut page = Dictionary::new();
        page.set("Contents", Object::Reference(content_id));

        assert!(page_content(&source, &page).is_err());
    }

    #[test]
    fn test_unfiltered_content_is_returned_as_is() {
        let mut source = Document::with_version("1.7");
        let content_id = source.add_object(Stream::new(Dictionary::new(), b"q Q".to_vec()));
        let mut page = Dictionary::new();
        page.set("Contents", Object::Reference(content_id));

        assert_eq!(page_content(&source, &page).unwrap(), b"q Q".to_vec());
    }

    #[test]
    fn test_rotation_inherited_and_normalized() {
        let mut page = Dictionary::new();
        page.set("Rotate", Object::Integer(-90));
        let (doc, page_id) = doc_with_page(page);
        let dict = doc.get_dictionary(page_id).unwrap();
        assert_eq!(page_rotation(&doc, dict), 270);

        let mut page = Dictionary::new();
        page.set("Rotate", Object::Integer(45));
        let (doc, page_id) = doc_with_page(page);
        let dict = doc.get_dictionary(page_id).unwrap();
        assert_eq!(page_rotation(&doc, dict), 0);
    }
}
