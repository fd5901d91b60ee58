//! [`MazeRef`] – the explorer's classification grid.
//!
//! Each cell starts [`Classification::Unknown`] and may move to `Empty` or
//! `Obstacle` exactly once.  The explorer is the only writer; the rest of the
//! core reads owned snapshots.

use std::sync::{Arc, PoisonError, RwLock};

use mazesim_types::{ArenaDims, Cell, Classification, SimError};

use crate::frame::to_grid;

/// Owned copy of the classification state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassGrid {
    dims: ArenaDims,
    cells: Vec<Classification>,
}

impl ClassGrid {
    pub fn new(dims: ArenaDims) -> Self {
        Self {
            dims,
            cells: vec![Classification::Unknown; dims.total_cells()],
        }
    }

    pub fn dims(&self) -> ArenaDims {
        self.dims
    }

    /// Classification of `cell`, or `None` outside the arena.
    pub fn get(&self, cell: Cell) -> Option<Classification> {
        let idx = to_grid(self.dims, cell)?;
        Some(self.cells[idx.row * self.dims.width + idx.col])
    }

    /// Number of cells no longer `Unknown`.
    pub fn known_count(&self) -> usize {
        self.cells
            .iter()
            .filter(|c| **c != Classification::Unknown)
            .count()
    }

    fn set(&mut self, cell: Cell, requested: Classification) -> Result<bool, SimError> {
        let idx = to_grid(self.dims, cell).ok_or(SimError::OutOfBounds { cell })?;
        let slot = &mut self.cells[idx.row * self.dims.width + idx.col];
        match (*slot, requested) {
            (current, requested) if current == requested => Ok(false),
            (Classification::Unknown, requested) => {
                *slot = requested;
                Ok(true)
            }
            (current, requested) => Err(SimError::Reclassified {
                cell,
                current,
                requested,
            }),
        }
    }
}

/// Shared handle to the classification grid.  Clones share the same cells.
#[derive(Debug, Clone)]
pub struct MazeRef {
    inner: Arc<RwLock<ClassGrid>>,
}

impl MazeRef {
    /// A grid of `dims` with every cell `Unknown`.
    pub fn new(dims: ArenaDims) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ClassGrid::new(dims))),
        }
    }

    pub fn dims(&self) -> ArenaDims {
        self.read().dims
    }

    pub fn get(&self, cell: Cell) -> Option<Classification> {
        self.read().get(cell)
    }

    /// Record what the explorer learned about `cell`.
    ///
    /// Returns `Ok(true)` when the cell changed, `Ok(false)` when it already
    /// held `classification`.
    ///
    /// # Errors
    ///
    /// [`SimError::Reclassified`] when the cell is already known as something
    /// else (classification never reverts), [`SimError::OutOfBounds`] for
    /// cells outside the arena.
    pub fn classify(&self, cell: Cell, classification: Classification) -> Result<bool, SimError> {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .set(cell, classification)
    }

    /// Owned copy of the current state.
    pub fn snapshot(&self) -> ClassGrid {
        self.read().clone()
    }

    /// Forget everything, e.g. before a new run on a fresh layout.
    pub fn reset(&self) {
        let mut grid = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let dims = grid.dims;
        *grid = ClassGrid::new(dims);
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, ClassGrid> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }
}
