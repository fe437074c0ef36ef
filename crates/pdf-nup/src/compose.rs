//! Page composition: filling sheet cells with source pages
//!
//! A [`PageCompositor`] buffers accepted pages into the current sheet and hands
//! the sheet out once every cell is used. The last sheet of a run may be
//! partial; its unused cells stay blank.

use std::path::PathBuf;
use std::sync::Arc;

use crate::layout::{Placement, SheetLayout};

/// One page taken from one input file
#[derive(Debug, Clone)]
pub struct SourcePage<C> {
    /// Input file the page came from
    pub file: PathBuf,
    /// Index of the page within its file (0-based)
    pub page_index: usize,
    /// Page width in points
    pub width: f32,
    /// Page height in points
    pub height: f32,
    /// Toolkit handle to the page content
    pub content: C,
}

/// A source page together with its position on the sheet
#[derive(Debug, Clone)]
pub struct PlacedPage<C> {
    pub page: SourcePage<C>,
    pub placement: Placement,
}

/// Accumulator for the pages of one output sheet
#[derive(Debug, Clone)]
pub struct CompositeSheet<C> {
    layout: Arc<SheetLayout>,
    pages: Vec<PlacedPage<C>>,
    sealed: bool,
}

impl<C> CompositeSheet<C> {
    fn new(layout: Arc<SheetLayout>) -> Self {
        let capacity = layout.capacity();
        Self {
            layout,
            pages: Vec::with_capacity(capacity),
            sealed: false,
        }
    }

    /// Place `page` into the next free cell. Returns true once the sheet is full.
    fn place(&mut self, page: SourcePage<C>) -> bool {
        debug_assert!(!self.sealed && !self.is_full());

        let cell = self.pages.len();
        let placement = self.layout.place(cell, page.width, page.height);
        self.pages.push(PlacedPage { page, placement });
        self.is_full()
    }

    fn seal(mut self) -> Self {
        self.sealed = true;
        self
    }

    pub fn layout(&self) -> &SheetLayout {
        &self.layout
    }

    /// Placed pages in cell order
    pub fn pages(&self) -> &[PlacedPage<C>] {
        &self.pages
    }

    pub fn into_pages(self) -> Vec<PlacedPage<C>> {
        self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.pages.len() >= self.layout.capacity()
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Cells left blank on this sheet
    pub fn blank_cells(&self) -> usize {
        self.layout.capacity() - self.pages.len()
    }
}

/// Streams source pages into sheets, in row-major cell order
#[derive(Debug)]
pub struct PageCompositor<C> {
    layout: Arc<SheetLayout>,
    current: Option<CompositeSheet<C>>,
}

impl<C> PageCompositor<C> {
    pub fn new(layout: Arc<SheetLayout>) -> Self {
        Self {
            layout,
            current: None,
        }
    }

    /// Accept the next page. Returns the sealed sheet when this page filled it.
    pub fn accept(&mut self, page: SourcePage<C>) -> Option<CompositeSheet<C>> {
        let sheet = self
            .current
            .get_or_insert_with(|| CompositeSheet::new(Arc::clone(&self.layout)));

        if sheet.place(page) {
            self.current.take().map(CompositeSheet::seal)
        } else {
            None
        }
    }

    /// Seal and return the partially filled sheet, if any pages are buffered.
    pub fn flush(&mut self) -> Option<CompositeSheet<C>> {
        self.current
            .take()
            .filter(|sheet| !sheet.is_empty())
            .map(CompositeSheet::seal)
    }

    /// Number of pages waiting in the current sheet
    pub fn pending(&self) -> usize {
        self.current.as_ref().map_or(0, CompositeSheet::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::plan;

    fn page(index: usize) -> SourcePage<usize> {
        SourcePage {
            file: PathBuf::from(format!("page-{}.pdf", index)),
            page_index: 0,
            width: 612.0,
            height: 792.0,
            content: index,
        }
    }

    fn compositor(pages_per_sheet: usize) -> PageCompositor<usize> {
        PageCompositor::new(Arc::new(plan(pages_per_sheet, 842.0, 595.0).unwrap()))
    }

    #[test]
    fn test_accept_returns_sheet_when_full() {
        let mut comp = compositor(4);

        for i in 0..3 {
            assert!(comp.accept(page(i)).is_none());
        }
        assert_eq!(comp.pending(), 3);

        let sheet = comp.accept(page(3)).expect("sheet should be sealed");
        assert!(sheet.is_sealed());
        assert!(sheet.is_full());
        assert_eq!(sheet.len(), 4);
        assert_eq!(comp.pending(), 0);

        let order: Vec<usize> = sheet.pages().iter().map(|p| p.page.content).collect();
        assert_eq!(order, vec![0, 1, 2, 3]);
        let cells: Vec<usize> = sheet.pages().iter().map(|p| p.placement.cell).collect();
        assert_eq!(cells, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_single_page_layout_seals_every_page() {
        let mut comp = compositor(1);
        for i in 0..3 {
            let sheet = comp.accept(page(i)).unwrap();
            assert_eq!(sheet.len(), 1);
        }
        assert!(comp.flush().is_none());
    }

    #[test]
    fn test_flush_returns_partial_sheet_once() {
        let mut comp = compositor(4);
        comp.accept(page(0));
        comp.accept(page(1));

        let sheet = comp.flush().expect("partial sheet");
        assert!(sheet.is_sealed());
        assert!(!sheet.is_full());
        assert_eq!(sheet.len(), 2);
        assert_eq!(sheet.blank_cells(), 2);

        assert!(comp.flush().is_none());
    }

    #[test]
    fn test_flush_on_fresh_compositor_is_empty() {
        let mut comp = compositor(6);
        assert!(comp.flush().is_none());
    }

    #[test]
    fn test_pages_after_seal_start_new_sheet() {
        let mut comp = compositor(2);
        assert!(comp.accept(page(0)).is_none());
        assert!(comp.accept(page(1)).is_some());
        assert!(comp.accept(page(2)).is_none());

        let tail = comp.flush().unwrap();
        assert_eq!(tail.pages()[0].page.content, 2);
        assert_eq!(tail.pages()[0].placement.cell, 0);
    }
}
