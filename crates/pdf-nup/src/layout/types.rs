//! Layout data types shared by the planner and the compositor

/// Position within the grid (row, column)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridPosition {
    /// Row index (0 = top row)
    pub row: usize,
    /// Column index (0 = leftmost column)
    pub col: usize,
}

impl GridPosition {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// A rectangular area in points, PDF user space (origin bottom-left)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// X position (left edge)
    pub x: f32,
    /// Y position (bottom edge)
    pub y: f32,
    /// Width
    pub width: f32,
    /// Height
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge x coordinate
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Top edge y coordinate
    pub fn top(&self) -> f32 {
        self.y + self.height
    }
}

/// How one source page fits into one cell.
///
/// Offsets are measured from the cell's top-left corner, growing right and down.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellTransform {
    /// Uniform scale factor applied to the source page
    pub scale: f32,
    /// Horizontal gap between the cell's left edge and the scaled page
    pub offset_x: f32,
    /// Vertical gap between the cell's top edge and the scaled page
    pub offset_y: f32,
}

/// Final position of a source page on the output sheet
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Cell index the page occupies (row-major)
    pub cell: usize,
    /// Area covered by the scaled page, in sheet coordinates
    pub content_rect: Rect,
    /// Scale factor applied to the source page
    pub scale: f32,
}
