//! [`ArenaLayout`] – ground-truth obstacle map.
//!
//! The layout is edited before a run (obstacle toggling, clearing), then
//! loaded into a session and treated as read-only while the robot explores.
//!
//! # Descriptor format
//!
//! One text line per arena row, northern row first (grid-frame order).  Each
//! line holds `width` characters, `'1'` for an obstacle and `'0'` for free
//! space.
//!
//! ```text
//! 000000000000000
//! 000001110000000
//! ...
//! ```

use std::fs;
use std::io::Write;
use std::path::Path;

use mazesim_types::{ArenaDims, Cell, GridIndex, SimError};
use tracing::debug;

use crate::frame::{to_arena, to_grid};

/// Obstacle flag per cell, stored in grid-frame order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArenaLayout {
    dims: ArenaDims,
    obstacles: Vec<bool>,
}

impl ArenaLayout {
    /// An arena of the given size with no obstacles.
    pub fn empty(dims: ArenaDims) -> Self {
        Self {
            dims,
            obstacles: vec![false; dims.total_cells()],
        }
    }

    pub fn dims(&self) -> ArenaDims {
        self.dims
    }

    /// `true` when `cell` holds an obstacle.  Cells outside the arena read as
    /// obstacles so callers treat the boundary as a wall.
    pub fn is_obstacle(&self, cell: Cell) -> bool {
        match to_grid(self.dims, cell) {
            Some(idx) => self.obstacles[self.offset(idx)],
            None => true,
        }
    }

    /// Place or remove an obstacle.
    pub fn set_obstacle(&mut self, cell: Cell, present: bool) -> Result<(), SimError> {
        let idx = to_grid(self.dims, cell).ok_or(SimError::OutOfBounds { cell })?;
        let offset = self.offset(idx);
        self.obstacles[offset] = present;
        Ok(())
    }

    /// Flip the obstacle flag of `cell`, returning the new value.
    pub fn toggle_obstacle(&mut self, cell: Cell) -> Result<bool, SimError> {
        let present = !self.is_obstacle(cell);
        self.set_obstacle(cell, present)?;
        Ok(present)
    }

    /// Remove every obstacle.
    pub fn clear(&mut self) {
        self.obstacles.iter_mut().for_each(|o| *o = false);
    }

    /// Number of obstacle cells.
    pub fn obstacle_count(&self) -> usize {
        self.obstacles.iter().filter(|o| **o).count()
    }

    /// Arena-frame cells holding obstacles.
    pub fn obstacles(&self) -> impl Iterator<Item = Cell> + '_ {
        self.obstacles
            .iter()
            .enumerate()
            .filter(|(_, o)| **o)
            .filter_map(|(i, _)| {
                to_arena(
                    self.dims,
                    GridIndex::new(i / self.dims.width, i % self.dims.width),
                )
            })
    }

    // ------------------------------------------------------------------
    // Descriptor I/O
    // ------------------------------------------------------------------

    /// Render the layout as descriptor text (trailing newline included).
    pub fn to_descriptor(&self) -> String {
        let mut out = String::with_capacity(self.dims.total_cells() + self.dims.length);
        for row in self.obstacles.chunks(self.dims.width) {
            out.extend(row.iter().map(|o| if *o { '1' } else { '0' }));
            out.push('\n');
        }
        out
    }

    /// Parse descriptor text for an arena of size `dims`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Descriptor`] when the text has the wrong number of
    /// rows or columns, or contains a character other than `'0'` / `'1'`.
    pub fn from_descriptor(text: &str, dims: ArenaDims) -> Result<Self, SimError> {
        let lines: Vec<&str> = text
            .lines()
            .map(str::trim_end)
            .filter(|l| !l.is_empty())
            .collect();
        if lines.len() != dims.length {
            return Err(SimError::Descriptor {
                line: lines.len(),
                reason: format!("expected {} rows, found {}", dims.length, lines.len()),
            });
        }

        let mut obstacles = Vec::with_capacity(dims.total_cells());
        for (n, line) in lines.iter().enumerate() {
            let width = line.chars().count();
            if width != dims.width {
                return Err(SimError::Descriptor {
                    line: n + 1,
                    reason: format!("expected {} columns, found {}", dims.width, width),
                });
            }
            for ch in line.chars() {
                match ch {
                    '0' => obstacles.push(false),
                    '1' => obstacles.push(true),
                    other => {
                        return Err(SimError::Descriptor {
                            line: n + 1,
                            reason: format!("unexpected character {other:?}"),
                        });
                    }
                }
            }
        }
        Ok(Self { dims, obstacles })
    }

    /// Read and parse a descriptor file.
    pub fn read_descriptor(path: &Path, dims: ArenaDims) -> Result<Self, SimError> {
        let text = fs::read_to_string(path)
            .map_err(|e| SimError::Io(format!("failed to read {}: {e}", path.display())))?;
        Self::from_descriptor(&text, dims)
    }

    /// Write the descriptor to `path` atomically: the text goes to a sibling
    /// temporary file which is then renamed over the destination.
    pub fn write_descriptor(&self, path: &Path) -> Result<(), SimError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                SimError::Io(format!("failed to create {}: {e}", parent.display()))
            })?;
        }
        let tmp = path.with_extension("tmp");
        fs::File::create(&tmp)
            .and_then(|mut f| {
                f.write_all(self.to_descriptor().as_bytes())?;
                f.sync_all()
            })
            .and_then(|()| fs::rename(&tmp, path))
            .map_err(|e| SimError::Io(format!("failed to write {}: {e}", path.display())))?;
        debug!(path = %path.display(), obstacles = self.obstacle_count(), "arena descriptor written");
        Ok(())
    }

    fn offset(&self, idx: GridIndex) -> usize {
        idx.row * self.dims.width + idx.col
    }
}
