//! The explorer contract and a deterministic reference explorer.
//!
//! An [`Explorer`] owns the classification grid ([`MazeRef`]) and decides
//! where the robot goes.  It runs on a blocking worker thread and drives the
//! robot exclusively through the [`Session`] pose commands, so every step is
//! painted and reconciled exactly like an operator command would be.
//!
//! [`SweepExplorer`] is the bundled implementation: a boustrophedon sweep
//! that heads for the south-west corner and then combs the arena in lanes
//! three rows apart.
//!
//! ```text
//!  ┌───────────────┐
//!  │ ←←←←←←←←←←←←↰ │
//!  │ ↱→→→→→→→→→→→↑ │
//!  │ ↑←←←←←←←←←←←↰ │
//!  │ S→→→→→→→→→→→↑ │
//!  └───────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use mazesim_perception::frame::{band_ahead, footprint};
use mazesim_perception::{ArenaLayout, MazeRef};
use mazesim_types::{ArenaDims, Cell, Classification, Landmarks, Orientation, Pose, SimError};
use tracing::{debug, info};

use crate::session::Session;
use crate::termination::Termination;

/// Rows between two sweep lanes; one footprint height.
const LANE_SPACING: usize = 3;

/// A search strategy that reveals the maze.
///
/// `explore` is called once per run on a blocking thread.  It must return
/// soon after [`ExploreContext::should_stop`] turns `true`.
pub trait Explorer: Send + Sync {
    fn explore(&self, ctx: &ExploreContext, start: Pose) -> Result<(), SimError>;

    /// The classification grid this explorer writes.
    fn maze_ref(&self) -> MazeRef;

    fn landmarks(&self) -> Landmarks;
}

/// What an explorer gets to work with during a run.
#[derive(Clone)]
pub struct ExploreContext {
    session: Session,
    termination: Arc<Termination>,
    speed: u32,
}

impl ExploreContext {
    /// `speed` is in steps per second; `0` runs unthrottled.
    pub fn new(session: Session, termination: Arc<Termination>, speed: u32) -> Self {
        Self {
            session,
            termination,
            speed,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn speed(&self) -> u32 {
        self.speed
    }

    /// `true` once the run has ended for any reason.
    pub fn should_stop(&self) -> bool {
        !self.termination.is_running()
    }

    /// Pause between two steps.
    pub fn step_delay(&self) -> Option<Duration> {
        (self.speed > 0).then(|| Duration::from_secs(1) / self.speed)
    }

    /// Block the calling thread for one step delay.
    pub fn pace(&self) {
        if let Some(delay) = self.step_delay() {
            std::thread::sleep(delay);
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SweepExplorer
// ────────────────────────────────────────────────────────────────────────────

/// Lane-by-lane sweep over the loaded layout.
///
/// The explorer "senses" by reading the ground-truth layout for its own
/// footprint and the three cells just ahead of it.  It never enters a cell
/// it has seen to be an obstacle; a blocked lane simply ends early.
#[derive(Debug, Clone)]
pub struct SweepExplorer {
    maze: MazeRef,
    landmarks: Landmarks,
}

impl SweepExplorer {
    pub fn new(dims: ArenaDims) -> Self {
        Self {
            maze: MazeRef::new(dims),
            landmarks: Landmarks::for_arena(dims),
        }
    }
}

impl Explorer for SweepExplorer {
    fn explore(&self, ctx: &ExploreContext, start: Pose) -> Result<(), SimError> {
        let layout = ctx.session().layout().ok_or(SimError::NoLayout)?;
        let mut sweep = Sweep {
            ctx,
            layout: &layout,
            maze: &self.maze,
            pose: start,
            steps: 0,
        };
        info!(start = %start.position, "sweep started");

        sweep.sense()?;
        sweep.face(Orientation::West)?;
        sweep.advance(usize::MAX)?;
        sweep.face(Orientation::South)?;
        sweep.advance(usize::MAX)?;

        let mut heading = Orientation::East;
        while !ctx.should_stop() {
            sweep.face(heading)?;
            sweep.advance(usize::MAX)?;
            sweep.face(Orientation::North)?;
            if sweep.advance(LANE_SPACING)? == 0 {
                break;
            }
            heading = heading.reverse();
        }

        info!(
            steps = sweep.steps,
            known = self.maze.snapshot().known_count(),
            stopped = ctx.should_stop(),
            "sweep finished"
        );
        Ok(())
    }

    fn maze_ref(&self) -> MazeRef {
        self.maze.clone()
    }

    fn landmarks(&self) -> Landmarks {
        self.landmarks
    }
}

struct Sweep<'a> {
    ctx: &'a ExploreContext,
    layout: &'a ArenaLayout,
    maze: &'a MazeRef,
    pose: Pose,
    steps: usize,
}

impl Sweep<'_> {
    /// Rotate in place until facing `target`, taking the shorter way round.
    fn face(&mut self, target: Orientation) -> Result<(), SimError> {
        while self.pose.orientation != target {
            if self.ctx.should_stop() {
                return Ok(());
            }
            self.pose = if self.pose.orientation.turn_left() == target {
                self.ctx.session().turn_left()?
            } else {
                self.ctx.session().turn_right()?
            };
            self.step()?;
        }
        Ok(())
    }

    /// Move forward up to `max_steps` cells; returns how many were taken.
    fn advance(&mut self, max_steps: usize) -> Result<usize, SimError> {
        let mut taken = 0;
        while taken < max_steps && !self.ctx.should_stop() && self.path_clear() {
            self.pose = self.ctx.session().move_forward()?;
            self.step()?;
            taken += 1;
        }
        Ok(taken)
    }

    fn step(&mut self) -> Result<(), SimError> {
        self.steps += 1;
        self.sense()?;
        debug!(position = %self.pose.position, orientation = %self.pose.orientation, "sweep step");
        self.ctx.pace();
        Ok(())
    }

    fn path_clear(&self) -> bool {
        let next = self.pose.position.step(self.pose.orientation);
        self.layout.dims().footprint_fits(next)
            && band_ahead(self.pose.position, self.pose.orientation)
                .iter()
                .all(|cell| !self.layout.is_obstacle(*cell))
    }

    fn sense(&self) -> Result<(), SimError> {
        let dims = self.layout.dims();
        let ahead = band_ahead(self.pose.position, self.pose.orientation);
        for cell in footprint(self.pose.position).into_iter().chain(ahead) {
            if dims.contains(cell) {
                self.maze.classify(cell, self.truth(cell))?;
            }
        }
        Ok(())
    }

    fn truth(&self, cell: Cell) -> Classification {
        if self.layout.is_obstacle(cell) {
            Classification::Obstacle
        } else {
            Classification::Empty
        }
    }
}
