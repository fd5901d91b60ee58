//! Coordinate frames and footprint geometry.
//!
//! The arena frame puts `(0, 0)` at the south-west corner with rows growing
//! north.  The grid frame is what a display draws: row 0 is the northern
//! edge.  Every conversion between the two goes through [`to_grid`] and
//! [`to_arena`].
//!
//! # Example
//!
//! ```rust
//! use mazesim_perception::frame::{to_arena, to_grid};
//! use mazesim_types::{ArenaDims, Cell, GridIndex};
//!
//! let dims = ArenaDims::new(15, 20);
//! let idx = to_grid(dims, Cell::new(3, 0)).unwrap();
//! assert_eq!(idx, GridIndex::new(19, 3));
//! assert_eq!(to_arena(dims, idx), Some(Cell::new(3, 0)));
//! ```

use mazesim_types::{ArenaDims, Cell, GridIndex, Orientation};

// ────────────────────────────────────────────────────────────────────────────
// Frame conversion
// ────────────────────────────────────────────────────────────────────────────

/// Convert an arena-frame cell into its grid-frame index.
///
/// Returns `None` when `cell` lies outside the arena.
pub fn to_grid(dims: ArenaDims, cell: Cell) -> Option<GridIndex> {
    if !dims.contains(cell) {
        return None;
    }
    Some(GridIndex::new(
        dims.length - 1 - cell.row as usize,
        cell.col as usize,
    ))
}

/// Convert a grid-frame index back into the arena frame.
///
/// Returns `None` when `idx` lies outside the grid.
pub fn to_arena(dims: ArenaDims, idx: GridIndex) -> Option<Cell> {
    if idx.row >= dims.length || idx.col >= dims.width {
        return None;
    }
    Some(Cell::new(
        idx.col as i32,
        (dims.length - 1 - idx.row) as i32,
    ))
}

// ────────────────────────────────────────────────────────────────────────────
// Footprint geometry
// ────────────────────────────────────────────────────────────────────────────

/// The nine cells of the 3×3 footprint centred on `center`, south-west
/// first, row by row.
pub fn footprint(center: Cell) -> [Cell; 9] {
    let mut cells = [center; 9];
    let mut i = 0;
    for drow in -1..=1 {
        for dcol in -1..=1 {
            cells[i] = center.offset(dcol, drow);
            i += 1;
        }
    }
    cells
}

/// The three cells of the footprint edge facing `orientation`, with the
/// middle (lead) cell at index 1.
pub fn leading_edge(center: Cell, orientation: Orientation) -> [Cell; 3] {
    let front = center.step(orientation);
    let (dcol, drow) = orientation.turn_right().delta();
    [
        front.offset(-dcol, -drow),
        front,
        front.offset(dcol, drow),
    ]
}

/// The three cells just beyond the footprint edge facing `orientation`;
/// they become the leading edge after one forward move.
pub fn band_ahead(center: Cell, orientation: Orientation) -> [Cell; 3] {
    leading_edge(center.step(orientation), orientation)
}
