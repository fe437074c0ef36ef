//! Output sheet rendering
//!
//! Each sheet becomes one page whose content stream draws the placed source
//! pages as Form XObjects. Unused cells are simply not drawn.

use crate::compose::CompositeSheet;
use crate::layout::Rect;
use crate::toolkit::ToolkitResult;
use lopdf::{Dictionary, Object, ObjectId, Stream};

use super::xobject::create_page_xobject;
use super::{LopdfFragment, LopdfPage};

/// Render one sealed sheet as the next page of `fragment`.
pub(crate) fn render_sheet_page(
    fragment: &mut LopdfFragment,
    sheet: CompositeSheet<LopdfPage>,
) -> ToolkitResult<ObjectId> {
    let mut content_ops = Vec::new();
    let mut xobjects = Dictionary::new();

    for (idx, placed) in sheet.into_pages().into_iter().enumerate() {
        let page = &placed.page.content;
        let cache = fragment.caches.entry(page.source.id).or_default();

        let xobject_id = create_page_xobject(
            &mut fragment.document,
            &page.source.document,
            page.page_id,
            page.media_box,
            &page.content,
            cache,
        )?;
        let xobject_name = format!("P{}", idx);
        xobjects.set(xobject_name.as_bytes(), Object::Reference(xobject_id));

        content_ops.push(placement_command(
            &xobject_name,
            &placed.placement.content_rect,
            placed.placement.scale,
            page.media_box,
            page.rotation,
        ));
    }

    let mut resources = Dictionary::new();
    resources.set("XObject", Object::Dictionary(xobjects));

    let content = content_ops.join("");
    let content_id = fragment
        .document
        .add_object(Stream::new(Dictionary::new(), content.into_bytes()));

    let mut page_dict = Dictionary::new();
    page_dict.set("Type", Object::Name(b"Page".to_vec()));
    page_dict.set("Parent", Object::Reference(fragment.pages_id));
    page_dict.set(
        "MediaBox",
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(fragment.sheet_width),
            Object::Real(fragment.sheet_height),
        ]),
    );
    page_dict.set("Contents", Object::Reference(content_id));
    page_dict.set("Resources", Object::Dictionary(resources));

    let page_id = fragment.document.add_object(page_dict);
    fragment.page_ids.push(page_id);
    Ok(page_id)
}

/// Generate the content stream command that draws one placed page.
///
/// The form's own coordinates start at the MediaBox corner. That corner is
/// moved to wherever the page's display `rotation` (clockwise) puts it inside
/// the placement rectangle, which already has the rotated proportions.
pub(crate) fn placement_command(
    xobject_name: &str,
    rect: &Rect,
    scale: f32,
    media_box: [f32; 4],
    rotation: u16,
) -> String {
    let [llx, lly, urx, ury] = media_box;
    let (w, h) = ((urx - llx) * scale, (ury - lly) * scale);
    let (x0, y0) = (llx * scale, lly * scale);

    let [a, b, c, d, e, f] = match rotation {
        90 => [0.0, -scale, scale, 0.0, rect.x - y0, rect.y + w + x0],
        180 => [-scale, 0.0, 0.0, -scale, rect.x + w + x0, rect.y + h + y0],
        270 => [0.0, scale, -scale, 0.0, rect.x + h + y0, rect.y - x0],
        _ => [scale, 0.0, 0.0, scale, rect.x - x0, rect.y - y0],
    };
    format!(
        "q {} {} {} {} {} {} cm /{} Do Q\n",
        a, b, c, d, e, f, xobject_name
    )
}
