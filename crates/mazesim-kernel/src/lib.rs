//! `mazesim-kernel` – Pose & Visibility Rules
//!
//! The part of the simulator that enforces invariants.  Nothing here is
//! concurrent; callers serialise access (see `mazesim-runtime::session`).
//!
//! # Modules
//!
//! - [`pose`] – [`PoseMachine`][pose::PoseMachine]: owns the robot's pose,
//!   validates placement and moves against the arena bounds, and paints the
//!   3×3 footprint with its sensor-facing lead cell.
//! - [`reconcile`] – [`reconcile`][reconcile::reconcile]: recolours every
//!   cell outside the footprint from the explorer's classification grid so
//!   the discovered map never regresses as the robot moves away.

pub mod pose;
pub mod reconcile;

pub use pose::PoseMachine;
pub use reconcile::reconcile;
