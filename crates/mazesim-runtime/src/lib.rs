//! `mazesim-runtime` – the exploration engine.
//!
//! Everything that runs concurrently during an exploration lives here.
//!
//! # Modules
//!
//! - [`session`] – [`Session`]: the lock-protected world (rendered grid,
//!   pose machine, loaded layout) shared by the operator, the explorer thread
//!   and the monitor.  Every pose command is reconciled against the
//!   explorer's [`MazeRef`][mazesim_perception::MazeRef] under the same lock.
//! - [`termination`] – [`Termination`]: one tagged termination cell with a
//!   first-writer-wins transition out of `Running`.
//! - [`timer`] – the one-tick-per-second countdown that ends a run with
//!   `TimedOut`.
//! - [`monitor`] – [`CoverageMonitor`]: samples coverage and ends a run with
//!   `ReachedCoverage`.
//! - [`explorer`] – the [`Explorer`] contract, [`ExploreContext`] and the
//!   bundled [`SweepExplorer`].
//! - [`orchestrator`] – [`Orchestrator`]: run configuration, validation and
//!   the supervisor that races the three activities above.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: `tracing`
//!   subscriber with optional OTLP span export.

pub mod explorer;
pub mod monitor;
pub mod orchestrator;
pub mod session;
pub mod telemetry;
pub mod termination;
pub mod timer;

pub use explorer::{ExploreContext, Explorer, SweepExplorer};
pub use monitor::CoverageMonitor;
pub use orchestrator::{Orchestrator, OrchestratorConfig, RunHandle, RunParams, RunState, StopHandle};
pub use session::Session;
pub use telemetry::{TracerProviderGuard, init_tracing};
pub use termination::Termination;
