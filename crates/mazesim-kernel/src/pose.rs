//! [`PoseMachine`] – robot pose state machine.
//!
//! The robot occupies a 3×3 footprint centred on its position.  Every
//! command validates first and mutates second: a rejected command leaves
//! both the pose and the display grid untouched.
//!
//! | Command | Position | Orientation | Painting |
//! |---|---|---|---|
//! | [`initialize`][PoseMachine::initialize] | set | set | whole footprint, lead cell highlighted |
//! | [`turn_right`][PoseMachine::turn_right] / [`turn_left`][PoseMachine::turn_left] | unchanged | ±1 step | old lead → footprint, new lead → lead |
//! | [`move_forward`][PoseMachine::move_forward] | +1 cell | unchanged | whole new footprint, lead on the front edge |
//!
//! # Example
//!
//! ```rust
//! use mazesim_kernel::PoseMachine;
//! use mazesim_perception::{DisplayGrid, Paint};
//! use mazesim_types::{ArenaDims, Cell, Orientation};
//!
//! let mut grid = DisplayGrid::new(ArenaDims::default());
//! let mut robot = PoseMachine::new();
//! robot.initialize(&mut grid, Cell::new(7, 9), Orientation::North).unwrap();
//! assert_eq!(grid.get(Cell::new(7, 10)), Some(Paint::Lead));
//!
//! let pose = robot.move_forward(&mut grid).unwrap();
//! assert_eq!(pose.position, Cell::new(7, 10));
//! ```

use mazesim_perception::DisplayGrid;
use mazesim_perception::display::Paint;
use mazesim_perception::frame::footprint;
use mazesim_types::{Cell, Orientation, Pose, SimError};
use tracing::debug;

/// Owns the robot's current pose.
#[derive(Debug, Default)]
pub struct PoseMachine {
    pose: Option<Pose>,
}

impl PoseMachine {
    /// A machine with no robot placed yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current pose, or `None` before a successful [`initialize`][Self::initialize].
    pub fn pose(&self) -> Option<Pose> {
        self.pose
    }

    /// Forget the pose (the robot is no longer in the maze).
    pub fn clear(&mut self) {
        self.pose = None;
    }

    /// Place the robot with its footprint centred on `cell`.
    ///
    /// # Errors
    ///
    /// [`SimError::OutOfRange`] when `cell` is closer than one cell to an
    /// arena edge.
    pub fn initialize(
        &mut self,
        grid: &mut DisplayGrid,
        cell: Cell,
        orientation: Orientation,
    ) -> Result<Pose, SimError> {
        if !grid.dims().footprint_fits(cell) {
            return Err(SimError::OutOfRange { cell });
        }
        let pose = Pose::new(cell, orientation);
        paint_footprint(grid, pose)?;
        self.pose = Some(pose);
        debug!(position = %cell, orientation = %orientation, "robot placed");
        Ok(pose)
    }

    /// Rotate one step clockwise in place.
    pub fn turn_right(&mut self, grid: &mut DisplayGrid) -> Result<Pose, SimError> {
        self.rotate(grid, Orientation::turn_right)
    }

    /// Rotate one step counter-clockwise in place.
    pub fn turn_left(&mut self, grid: &mut DisplayGrid) -> Result<Pose, SimError> {
        self.rotate(grid, Orientation::turn_left)
    }

    /// Advance one cell in the facing direction.
    ///
    /// # Errors
    ///
    /// [`SimError::OutOfBounds`] (naming the first cell that would fall
    /// outside the arena) when the new footprint would not fit.
    /// [`SimError::RobotNotPlaced`] before initialisation.
    pub fn move_forward(&mut self, grid: &mut DisplayGrid) -> Result<Pose, SimError> {
        let pose = self.pose.ok_or(SimError::RobotNotPlaced)?;
        let next = Pose::new(pose.position.step(pose.orientation), pose.orientation);
        if !grid.dims().footprint_fits(next.position) {
            return Err(SimError::OutOfBounds {
                cell: next.lead_cell(),
            });
        }
        paint_footprint(grid, next)?;
        self.pose = Some(next);
        debug!(position = %next.position, orientation = %next.orientation, "robot moved");
        Ok(next)
    }

    fn rotate(
        &mut self,
        grid: &mut DisplayGrid,
        turn: fn(Orientation) -> Orientation,
    ) -> Result<Pose, SimError> {
        let pose = self.pose.ok_or(SimError::RobotNotPlaced)?;
        let next = Pose::new(pose.position, turn(pose.orientation));
        grid.paint(pose.lead_cell(), Paint::Footprint)?;
        grid.paint(next.lead_cell(), Paint::Lead)?;
        self.pose = Some(next);
        debug!(orientation = %next.orientation, "robot turned");
        Ok(next)
    }
}

fn paint_footprint(grid: &mut DisplayGrid, pose: Pose) -> Result<(), SimError> {
    let lead = pose.lead_cell();
    for cell in footprint(pose.position) {
        let paint = if cell == lead { Paint::Lead } else { Paint::Footprint };
        grid.paint(cell, paint)?;
    }
    Ok(())
}
