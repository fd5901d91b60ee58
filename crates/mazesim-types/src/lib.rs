use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Default arena width (number of columns).
pub const ARENA_WIDTH: usize = 15;
/// Default arena length (number of rows).
pub const ARENA_LENGTH: usize = 20;

/// A cell in the **arena frame**: `col` grows east, `row` grows north, and
/// `(0, 0)` is the south-west corner.
///
/// Coordinates are signed so neighbour arithmetic never wraps; use
/// [`ArenaDims::contains`] to check that a cell actually lies in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub col: i32,
    pub row: i32,
}

impl Cell {
    pub const fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    /// The cell displaced by `(dcol, drow)`.
    pub const fn offset(self, dcol: i32, drow: i32) -> Self {
        Self::new(self.col + dcol, self.row + drow)
    }

    /// The neighbouring cell one step towards `orientation`.
    pub fn step(self, orientation: Orientation) -> Self {
        let (dcol, drow) = orientation.delta();
        self.offset(dcol, drow)
    }

    /// `true` when `other` lies inside the 3×3 block centred on `self`.
    pub fn neighbourhood_contains(self, other: Cell) -> bool {
        (self.col - other.col).abs() <= 1 && (self.row - other.row).abs() <= 1
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.col, self.row)
    }
}

/// A cell in the **grid frame** used for display: row 0 is the northern edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridIndex {
    pub row: usize,
    pub col: usize,
}

impl GridIndex {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Size of the arena in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArenaDims {
    /// Number of columns (east–west extent).
    pub width: usize,
    /// Number of rows (north–south extent).
    pub length: usize,
}

impl ArenaDims {
    pub const fn new(width: usize, length: usize) -> Self {
        Self { width, length }
    }

    /// Total number of cells, the denominator of every coverage figure.
    pub const fn total_cells(&self) -> usize {
        self.width * self.length
    }

    /// `true` when `cell` lies inside the arena.
    pub fn contains(&self, cell: Cell) -> bool {
        cell.col >= 0
            && cell.row >= 0
            && (cell.col as usize) < self.width
            && (cell.row as usize) < self.length
    }

    /// `true` when a 3×3 robot footprint centred on `cell` fits entirely
    /// inside the arena, i.e. `cell` is at least one cell from every edge.
    pub fn footprint_fits(&self, cell: Cell) -> bool {
        self.contains(cell.offset(-1, -1)) && self.contains(cell.offset(1, 1))
    }
}

impl Default for ArenaDims {
    fn default() -> Self {
        Self::new(ARENA_WIDTH, ARENA_LENGTH)
    }
}

/// Facing direction of the robot.  Turning right advances clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Orientation {
    #[default]
    North,
    East,
    South,
    West,
}

impl Orientation {
    /// One step clockwise: N→E→S→W→N.
    pub fn turn_right(self) -> Self {
        match self {
            Orientation::North => Orientation::East,
            Orientation::East => Orientation::South,
            Orientation::South => Orientation::West,
            Orientation::West => Orientation::North,
        }
    }

    /// One step counter-clockwise: N→W→S→E→N.
    pub fn turn_left(self) -> Self {
        match self {
            Orientation::North => Orientation::West,
            Orientation::West => Orientation::South,
            Orientation::South => Orientation::East,
            Orientation::East => Orientation::North,
        }
    }

    pub fn reverse(self) -> Self {
        self.turn_right().turn_right()
    }

    /// `(dcol, drow)` of a single step in the arena frame.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Orientation::North => (0, 1),
            Orientation::East => (1, 0),
            Orientation::South => (0, -1),
            Orientation::West => (-1, 0),
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Orientation::North => "NORTH",
            Orientation::East => "EAST",
            Orientation::South => "SOUTH",
            Orientation::West => "WEST",
        };
        f.write_str(s)
    }
}

/// Robot pose.  `position` is the centre of the 3×3 footprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Cell,
    pub orientation: Orientation,
}

impl Pose {
    pub const fn new(position: Cell, orientation: Orientation) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// The footprint-edge cell facing the sensor direction.
    pub fn lead_cell(&self) -> Cell {
        self.position.step(self.orientation)
    }
}

/// Explorer knowledge about a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Classification {
    #[default]
    Unknown,
    Empty,
    Obstacle,
}

/// The START and GOAL landmark cells.  Each landmark owns the 3×3 block
/// around its centre.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Landmarks {
    pub start: Cell,
    pub goal: Cell,
}

impl Landmarks {
    /// START in the south-west corner zone, GOAL in the north-east one.
    pub fn for_arena(dims: ArenaDims) -> Self {
        Self {
            start: Cell::new(1, 1),
            goal: Cell::new(dims.width as i32 - 2, dims.length as i32 - 2),
        }
    }

    /// `true` when `cell` falls within either landmark's 3×3 zone.
    pub fn zone_contains(&self, cell: Cell) -> bool {
        self.start.neighbourhood_contains(cell) || self.goal.neighbourhood_contains(cell)
    }
}

/// Why an exploration run stopped (or that it has not).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TerminationReason {
    #[default]
    Running,
    ReachedCoverage,
    TimedOut,
    /// The explorer failed or an operator stopped the run.
    Aborted,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TerminationReason::Running => "running",
            TerminationReason::ReachedCoverage => "target coverage reached",
            TerminationReason::TimedOut => "time limit reached",
            TerminationReason::Aborted => "exploration aborted",
        };
        f.write_str(s)
    }
}

/// Unified event wrapper for display-sink traffic on the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// e.g., "mazesim-runtime::monitor"
    pub source: String,
    pub payload: EventPayload,
}

impl Event {
    /// Stamp `payload` with a fresh id and the current time.
    pub fn new(source: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.into(),
            payload,
        }
    }
}

/// Everything the core reports to a display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventPayload {
    /// Human-readable status line.
    Status(String),
    /// Percentage of the arena explored so far.
    Coverage(u8),
    /// Seconds left on the countdown.
    TimeRemaining(u32),
    /// Audible/visual alert (e.g. the countdown expired).
    Alert(String),
    PoseChanged(Pose),
    /// Input widgets should be re-read / cleared.
    InputRefreshed,
    RunFinished(TerminationReason),
}

/// Error taxonomy for the exploration core.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimError {
    #[error("robot position {cell} out of range: footprint must fit inside the arena")]
    OutOfRange { cell: Cell },

    #[error("cell {cell} is outside the arena")]
    OutOfBounds { cell: Cell },

    #[error("no layout loaded yet")]
    NoLayout,

    #[error("robot has not been placed in the maze")]
    RobotNotPlaced,

    #[error("an exploration run is already in progress")]
    RunInProgress,

    #[error("target coverage {0}% out of range (0-100)")]
    CoverageOutOfRange(u32),

    #[error("cell {cell} already classified as {current:?}, cannot become {requested:?}")]
    Reclassified {
        cell: Cell,
        current: Classification,
        requested: Classification,
    },

    #[error("arena descriptor line {line}: {reason}")]
    Descriptor { line: usize, reason: String },

    #[error("I/O failure: {0}")]
    Io(String),

    #[error("exploration task failed: {0}")]
    TaskFailed(String),
}

impl From<std::io::Error> for SimError {
    fn from(e: std::io::Error) -> Self {
        SimError::Io(e.to_string())
    }
}
