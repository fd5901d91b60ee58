//! [`Session`] – the lock-protected world shared by the operator, the
//! explorer thread and the coverage monitor.
//!
//! A session owns the rendered [`DisplayGrid`], the [`PoseMachine`] and the
//! loaded [`ArenaLayout`] behind one mutex, so a pose change and the
//! reconciliation pass that follows it are observed together: the monitor
//! never counts a half-painted footprint.
//!
//! The [`MazeRef`] is *read* here (snapshotted before each reconciliation)
//! and written by the explorer that owns it.  Loading or clearing a layout
//! are the points where the session clears it.
//!
//! While an exploration run holds the session (see [`Session::begin_run`])
//! the layout, the maze and the robot's placement are frozen: only pose
//! commands are accepted, and everything else fails with
//! [`SimError::RunInProgress`].

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use mazesim_kernel::{PoseMachine, reconcile};
use mazesim_middleware::DisplaySink;
use mazesim_perception::{ArenaLayout, DisplayGrid, MazeRef};
use mazesim_types::{ArenaDims, Cell, Landmarks, Orientation, Pose, SimError};
use tracing::{debug, info, warn};

struct World {
    grid: DisplayGrid,
    robot: PoseMachine,
    layout: Option<ArenaLayout>,
    exploring: bool,
}

/// Cheap-clone handle to the shared world.
#[derive(Clone)]
pub struct Session {
    world: Arc<Mutex<World>>,
    maze: MazeRef,
    landmarks: Landmarks,
    sink: Arc<dyn DisplaySink>,
}

impl Session {
    /// A fresh session over the arena `maze` describes, with both landmark
    /// zones painted and no robot placed.
    pub fn new(maze: MazeRef, landmarks: Landmarks, sink: Arc<dyn DisplaySink>) -> Self {
        let mut grid = DisplayGrid::new(maze.dims());
        grid.reset(&landmarks);
        Self {
            world: Arc::new(Mutex::new(World {
                grid,
                robot: PoseMachine::new(),
                layout: None,
                exploring: false,
            })),
            maze,
            landmarks,
            sink,
        }
    }

    pub fn dims(&self) -> ArenaDims {
        self.maze.dims()
    }

    pub fn landmarks(&self) -> Landmarks {
        self.landmarks
    }

    pub fn maze(&self) -> &MazeRef {
        &self.maze
    }

    pub fn sink(&self) -> &Arc<dyn DisplaySink> {
        &self.sink
    }

    /// Install `layout` as the ground truth for the next run and forget
    /// every classification made against the previous one.
    ///
    /// When `descriptor` is given the layout is also persisted there.  A
    /// failed write is reported but does not undo the load.
    ///
    /// # Errors
    ///
    /// - [`SimError::Descriptor`] when the layout's dimensions differ from
    ///   the session's arena.
    /// - [`SimError::RunInProgress`] while a run is exploring.
    pub fn load_map(&self, layout: ArenaLayout, descriptor: Option<&Path>) -> Result<(), SimError> {
        let dims = self.dims();
        if layout.dims() != dims {
            let got = layout.dims();
            return Err(SimError::Descriptor {
                line: 0,
                reason: format!(
                    "layout is {}x{}, arena is {}x{}",
                    got.width, got.length, dims.width, dims.length
                ),
            });
        }

        let mut world = self.lock();
        if world.exploring {
            drop(world);
            return Err(self.rejected("load map"));
        }

        if let Some(path) = descriptor {
            if let Err(e) = layout.write_descriptor(path) {
                warn!(path = %path.display(), error = %e, "failed to write arena descriptor");
                self.sink
                    .set_status(&format!("warning: failed to write arena descriptor: {e}"));
            }
        }

        let obstacles = layout.obstacle_count();
        world.layout = Some(layout);
        self.maze.reset();
        drop(world);
        info!(obstacles, "arena layout loaded");
        self.sink.set_status("finished map loading");
        Ok(())
    }

    /// Remove every obstacle from the loaded layout (or install an empty
    /// one when none is loaded yet).  Classifications made against the old
    /// obstacles are forgotten along with them.
    pub fn clear_map(&self) -> Result<(), SimError> {
        let dims = self.dims();
        let mut world = self.lock();
        if world.exploring {
            drop(world);
            return Err(self.rejected("clear map"));
        }
        world
            .layout
            .get_or_insert_with(|| ArenaLayout::empty(dims))
            .clear();
        self.maze.reset();
        drop(world);
        debug!("arena layout cleared");
        self.sink.set_status("finished map clearing");
        Ok(())
    }

    /// A copy of the loaded layout, if any.
    pub fn layout(&self) -> Option<ArenaLayout> {
        self.lock().layout.clone()
    }

    pub fn has_layout(&self) -> bool {
        self.lock().layout.is_some()
    }

    /// Place the robot facing north with its footprint centred on `cell`.
    ///
    /// An out-of-range cell resets the whole maze display and forgets any
    /// previous pose before the error is returned.  The robot cannot be
    /// moved this way while a run is exploring.
    pub fn place_robot(&self, cell: Cell) -> Result<Pose, SimError> {
        let snapshot = self.maze.snapshot();
        let placed = {
            let mut world = self.lock();
            if world.exploring {
                drop(world);
                return Err(self.rejected("place robot"));
            }
            let World { grid, robot, .. } = &mut *world;
            match robot.initialize(grid, cell, Orientation::North) {
                Ok(pose) => {
                    reconcile(grid, &snapshot, pose.position, &self.landmarks);
                    Ok(pose)
                }
                Err(e) => {
                    grid.reset(&self.landmarks);
                    robot.clear();
                    Err(e)
                }
            }
        };

        match placed {
            Ok(pose) => {
                info!(position = %pose.position, "robot initial position set");
                self.sink.set_status("robot initial position set");
                self.sink.pose_changed(pose);
                Ok(pose)
            }
            Err(e) => {
                warn!(cell = %cell, error = %e, "robot placement rejected");
                self.sink.set_status("warning: robot position out of range");
                Err(e)
            }
        }
    }

    /// Repaint the display from scratch: everything unvisited except the
    /// two landmark zones.  The robot is removed from the maze.
    pub fn reset_maze(&self) -> Result<(), SimError> {
        let mut world = self.lock();
        if world.exploring {
            drop(world);
            return Err(self.rejected("reset maze"));
        }
        world.grid.reset(&self.landmarks);
        world.robot.clear();
        debug!("maze display reset");
        Ok(())
    }

    pub fn turn_right(&self) -> Result<Pose, SimError> {
        self.drive(PoseMachine::turn_right)
    }

    pub fn turn_left(&self) -> Result<Pose, SimError> {
        self.drive(PoseMachine::turn_left)
    }

    pub fn move_forward(&self) -> Result<Pose, SimError> {
        self.drive(PoseMachine::move_forward)
    }

    /// Apply one pose command and reconcile the display under the same
    /// lock, then report the new pose.
    fn drive(
        &self,
        command: fn(&mut PoseMachine, &mut DisplayGrid) -> Result<Pose, SimError>,
    ) -> Result<Pose, SimError> {
        let snapshot = self.maze.snapshot();
        let pose = {
            let mut world = self.lock();
            let World { grid, robot, .. } = &mut *world;
            let pose = command(robot, grid)?;
            reconcile(grid, &snapshot, pose.position, &self.landmarks);
            pose
        };
        self.sink.pose_changed(pose);
        Ok(pose)
    }

    pub fn pose(&self) -> Option<Pose> {
        self.lock().robot.pose()
    }

    pub fn coverage_percent(&self) -> u8 {
        self.lock().grid.coverage_percent()
    }

    /// A copy of the rendered grid, for drawing.
    pub fn grid(&self) -> DisplayGrid {
        self.lock().grid.clone()
    }

    /// Hand the world to an exploration run.  Returns the robot's starting
    /// pose; from now until [`Session::end_run`] only pose commands are
    /// accepted.
    pub(crate) fn begin_run(&self) -> Result<Pose, SimError> {
        let mut world = self.lock();
        if world.exploring {
            return Err(SimError::RunInProgress);
        }
        if world.layout.is_none() {
            return Err(SimError::NoLayout);
        }
        let pose = world.robot.pose().ok_or(SimError::RobotNotPlaced)?;
        world.exploring = true;
        Ok(pose)
    }

    pub(crate) fn end_run(&self) {
        self.lock().exploring = false;
    }

    pub fn is_exploring(&self) -> bool {
        self.lock().exploring
    }

    fn rejected(&self, action: &'static str) -> SimError {
        warn!(action, "rejected while the robot is exploring");
        self.sink.set_status("warning: robot is exploring");
        SimError::RunInProgress
    }

    fn lock(&self) -> MutexGuard<'_, World> {
        // Every write leaves the grid consistent, so a panic elsewhere does
        // not invalidate the data.
        self.world.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
