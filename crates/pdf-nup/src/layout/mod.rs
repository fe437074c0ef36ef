//! Layout calculation for N-up sheets
//!
//! - Grid selection per pages-per-sheet value
//! - Cell bounds in sheet coordinates
//! - Uniform scaling and centering of a source page inside a cell

mod grid;
mod types;

pub use grid::*;
pub use types::*;
