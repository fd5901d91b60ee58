//! [`DisplayGrid`] – rendered cell states.
//!
//! The display grid is what an operator sees and what coverage is computed
//! from.  It is stored in grid-frame order but addressed with arena-frame
//! [`Cell`]s; conversion happens in one place ([`crate::frame::to_grid`]).

use std::fmt;

use mazesim_types::{ArenaDims, Cell, GridIndex, Landmarks, SimError};

use crate::frame::{footprint, to_grid};

/// Rendered state of a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Paint {
    /// Nothing known yet.
    #[default]
    Unvisited,
    /// A START/GOAL zone that has not been revealed yet.
    LandmarkZone,
    /// Covered by the robot footprint.
    Footprint,
    /// The sensor-facing footprint edge cell.
    Lead,
    /// Classified empty.
    Explored,
    /// Classified empty inside a START/GOAL zone.
    Landmark,
    /// Classified obstacle.
    Obstacle,
}

impl Paint {
    /// Whether this cell contributes to the coverage percentage.
    pub fn counts_as_explored(self) -> bool {
        matches!(
            self,
            Paint::Footprint | Paint::Lead | Paint::Explored | Paint::Landmark
        )
    }

    /// Single-character glyph used for console rendering.
    pub fn glyph(self) -> char {
        match self {
            Paint::Unvisited => '.',
            Paint::LandmarkZone => '~',
            Paint::Footprint => 'o',
            Paint::Lead => '^',
            Paint::Explored => ' ',
            Paint::Landmark => '=',
            Paint::Obstacle => '#',
        }
    }
}

/// Rendered state for every arena cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayGrid {
    dims: ArenaDims,
    cells: Vec<Paint>,
}

impl DisplayGrid {
    /// A grid of `dims` with every cell [`Paint::Unvisited`].
    pub fn new(dims: ArenaDims) -> Self {
        Self {
            dims,
            cells: vec![Paint::Unvisited; dims.total_cells()],
        }
    }

    pub fn dims(&self) -> ArenaDims {
        self.dims
    }

    /// Full maze reset: everything unvisited except the landmark zones.
    pub fn reset(&mut self, landmarks: &Landmarks) {
        self.cells.iter_mut().for_each(|p| *p = Paint::Unvisited);
        for center in [landmarks.start, landmarks.goal] {
            // Landmarks near a small arena's edge may spill over; those cells are skipped.
            for idx in footprint(center)
                .into_iter()
                .filter_map(|cell| to_grid(self.dims, cell))
            {
                self.cells[idx.row * self.dims.width + idx.col] = Paint::LandmarkZone;
            }
        }
    }

    pub fn get(&self, cell: Cell) -> Option<Paint> {
        to_grid(self.dims, cell).map(|idx| self.get_at(idx))
    }

    /// Paint at a grid-frame index.  Panics if `idx` is outside the grid.
    pub fn get_at(&self, idx: GridIndex) -> Paint {
        self.cells[idx.row * self.dims.width + idx.col]
    }

    /// Set the paint of `cell`.
    pub fn paint(&mut self, cell: Cell, paint: Paint) -> Result<(), SimError> {
        let idx = to_grid(self.dims, cell).ok_or(SimError::OutOfBounds { cell })?;
        self.cells[idx.row * self.dims.width + idx.col] = paint;
        Ok(())
    }

    /// Number of cells with the given paint.
    pub fn count(&self, paint: Paint) -> usize {
        self.cells.iter().filter(|p| **p == paint).count()
    }

    /// Number of cells counted as explored.
    pub fn explored_count(&self) -> usize {
        self.cells.iter().filter(|p| p.counts_as_explored()).count()
    }

    /// `100 * explored / total`, rounded down.
    pub fn coverage_percent(&self) -> u8 {
        let total = self.dims.total_cells();
        if total == 0 {
            return 0;
        }
        (100 * self.explored_count() / total) as u8
    }

    /// Rows in grid-frame order (northern row first).
    pub fn rows(&self) -> impl Iterator<Item = &[Paint]> {
        self.cells.chunks(self.dims.width)
    }
}

impl fmt::Display for DisplayGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.rows() {
            let line: String = row.iter().map(|p| p.glyph()).collect();
            writeln!(f, "|{line}|")?;
        }
        Ok(())
    }
}
