//! Grid planning for an output sheet
//!
//! A sheet is split into `rows x columns` equal cells. Cells are numbered
//! row-major starting at the top-left corner.

use crate::types::{MergeError, Result};

use super::{CellTransform, GridPosition, Placement, Rect};

// =============================================================================
// Pages Per Sheet
// =============================================================================

/// Supported numbers of source pages per output sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PagesPerSheet {
    One,
    Two,
    Four,
    Six,
    Nine,
}

impl PagesPerSheet {
    /// Grid dimensions as (columns, rows).
    ///
    /// Two pages sit side by side and six pages use two rows of three.
    pub fn grid_dimensions(self) -> (usize, usize) {
        match self {
            PagesPerSheet::One => (1, 1),
            PagesPerSheet::Two => (2, 1),
            PagesPerSheet::Four => (2, 2),
            PagesPerSheet::Six => (3, 2),
            PagesPerSheet::Nine => (3, 3),
        }
    }

    pub fn count(self) -> usize {
        match self {
            PagesPerSheet::One => 1,
            PagesPerSheet::Two => 2,
            PagesPerSheet::Four => 4,
            PagesPerSheet::Six => 6,
            PagesPerSheet::Nine => 9,
        }
    }
}

impl TryFrom<usize> for PagesPerSheet {
    type Error = MergeError;

    fn try_from(value: usize) -> Result<Self> {
        match value {
            1 => Ok(PagesPerSheet::One),
            2 => Ok(PagesPerSheet::Two),
            4 => Ok(PagesPerSheet::Four),
            6 => Ok(PagesPerSheet::Six),
            9 => Ok(PagesPerSheet::Nine),
            other => Err(MergeError::UnsupportedLayout(other)),
        }
    }
}

// =============================================================================
// Sheet Layout
// =============================================================================

/// Immutable grid description for every sheet of a run
#[derive(Debug, Clone, PartialEq)]
pub struct SheetLayout {
    pub pages_per_sheet: PagesPerSheet,
    /// Number of rows in the page grid
    pub rows: usize,
    /// Number of columns in the page grid
    pub columns: usize,
    /// Output sheet width in points
    pub sheet_width: f32,
    /// Output sheet height in points
    pub sheet_height: f32,
    /// Width of each cell in points
    pub cell_width: f32,
    /// Height of each cell in points
    pub cell_height: f32,
}

/// Plan the grid for `pages_per_sheet` pages on a sheet of the given size.
///
/// Fails with [`MergeError::UnsupportedLayout`] for anything other than
/// 1, 2, 4, 6 or 9 pages per sheet.
pub fn plan(pages_per_sheet: usize, sheet_width: f32, sheet_height: f32) -> Result<SheetLayout> {
    let pages_per_sheet = PagesPerSheet::try_from(pages_per_sheet)?;
    if !(sheet_width > 0.0 && sheet_height > 0.0) {
        return Err(MergeError::Config(format!(
            "Sheet size must be positive, got {} x {} pt",
            sheet_width, sheet_height
        )));
    }

    let (columns, rows) = pages_per_sheet.grid_dimensions();

    Ok(SheetLayout {
        pages_per_sheet,
        rows,
        columns,
        sheet_width,
        sheet_height,
        cell_width: sheet_width / columns as f32,
        cell_height: sheet_height / rows as f32,
    })
}

impl SheetLayout {
    /// Number of source pages a full sheet holds
    pub fn capacity(&self) -> usize {
        self.pages_per_sheet.count()
    }

    /// Total number of cells in the grid
    pub fn cell_count(&self) -> usize {
        self.rows * self.columns
    }

    /// Grid position of a cell index (row-major, left-to-right, top-to-bottom)
    pub fn cell_position(&self, index: usize) -> GridPosition {
        GridPosition::new(index / self.columns, index % self.columns)
    }

    /// Bounds of a cell in sheet coordinates.
    ///
    /// Row 0 is at the top of the sheet, so the y coordinate is inverted.
    pub fn cell_bounds(&self, index: usize) -> Rect {
        let pos = self.cell_position(index);
        let cell_x = pos.col as f32 * self.cell_width;
        let cell_y = (self.rows - pos.row - 1) as f32 * self.cell_height;

        Rect::new(cell_x, cell_y, self.cell_width, self.cell_height)
    }

    /// Uniform scale and centering offsets for a `source_width x source_height` page.
    pub fn transform(&self, source_width: f32, source_height: f32) -> CellTransform {
        let scale = fit_scale(source_width, source_height, self.cell_width, self.cell_height);

        CellTransform {
            scale,
            offset_x: (self.cell_width - source_width * scale) / 2.0,
            offset_y: (self.cell_height - source_height * scale) / 2.0,
        }
    }

    /// Place a source page into cell `index`.
    pub fn place(&self, index: usize, source_width: f32, source_height: f32) -> Placement {
        let cell = self.cell_bounds(index);
        let transform = self.transform(source_width, source_height);

        let scaled_width = source_width * transform.scale;
        let scaled_height = source_height * transform.scale;

        // Offsets are top-left based; convert back to a bottom-left origin
        let x = cell.x + transform.offset_x;
        let y = cell.top() - transform.offset_y - scaled_height;

        Placement {
            cell: index,
            content_rect: Rect::new(x, y, scaled_width, scaled_height),
            scale: transform.scale,
        }
    }
}

/// Largest uniform scale at which the source fits inside the target.
pub fn fit_scale(src_width: f32, src_height: f32, target_width: f32, target_height: f32) -> f32 {
    let scale_w = target_width / src_width;
    let scale_h = target_height / src_height;
    scale_w.min(scale_h)
}

// =============================================================================
// Tests
// =============================================================================
