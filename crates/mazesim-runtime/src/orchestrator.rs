//! [`Orchestrator`] – configures and launches exploration runs.
//!
//! A run is three concurrent activities racing on one [`Termination`] cell:
//!
//! | Activity | Executor | Finishes the run with |
//! |---|---|---|
//! | countdown | Tokio task | [`TerminationReason::TimedOut`] |
//! | explorer | `spawn_blocking` worker | [`TerminationReason::Aborted`] on error or panic |
//! | coverage monitor | Tokio task | [`TerminationReason::ReachedCoverage`] |
//!
//! A supervisor task owns all three.  It returns once the monitor has seen
//! the run end *and* the explorer thread has wound down, so the final grid
//! is stable by the time [`RunHandle::wait`] resolves.
//!
//! # Lifecycle
//!
//! ```text
//! Idle ──start()──▶ Running ──▶ Completed(reason)
//!                      │
//!                      └── explorer failure ──▶ Idle
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use mazesim_types::{Pose, SimError, TerminationReason};
use tokio::task::{JoinError, JoinHandle};
use tracing::{info, warn};

use crate::explorer::{ExploreContext, Explorer};
use crate::monitor::{CoverageMonitor, DEFAULT_POLL_INTERVAL};
use crate::session::Session;
use crate::termination::Termination;
use crate::timer::{self, DEFAULT_TICK};

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Operator-facing run parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunParams {
    /// Explorer steps per second; `0` runs unthrottled.
    pub speed: u32,
    /// Percentage of the arena that ends the run.
    pub target_coverage: u8,
    /// Seconds before the run times out.
    pub time_limit_secs: u32,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            speed: 10,
            target_coverage: 100,
            time_limit_secs: 360,
        }
    }
}

/// Scheduling knobs, mostly of interest to tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    pub poll_interval: Duration,
    pub timer_period: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            timer_period: DEFAULT_TICK,
        }
    }
}

/// Where the orchestrator is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Completed(TerminationReason),
}

// ─────────────────────────────────────────────────────────────────────────────
// Orchestrator
// ─────────────────────────────────────────────────────────────────────────────

pub struct Orchestrator {
    session: Session,
    explorer: Arc<dyn Explorer>,
    termination: Arc<Termination>,
    params: RunParams,
    state: Arc<Mutex<RunState>>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(session: Session, explorer: Arc<dyn Explorer>, config: OrchestratorConfig) -> Self {
        Self {
            session,
            explorer,
            termination: Arc::new(Termination::new()),
            params: RunParams::default(),
            state: Arc::new(Mutex::new(RunState::Idle)),
            config,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn params(&self) -> RunParams {
        self.params
    }

    pub fn state(&self) -> RunState {
        *lock(&self.state)
    }

    pub fn termination_reason(&self) -> TerminationReason {
        self.termination.reason()
    }

    pub fn is_timeout(&self) -> bool {
        self.termination.is_timeout()
    }

    pub fn has_reached_target_coverage(&self) -> bool {
        self.termination.has_reached_target_coverage()
    }

    /// Set the explorer speed (steps per second).
    pub fn configure_speed(&mut self, speed: u32) -> Result<(), SimError> {
        self.ensure_not_running()?;
        self.params.speed = speed;
        info!(speed, "robot speed set");
        self.session.sink().set_status("robot speed set");
        Ok(())
    }

    /// Set the coverage percentage that ends a run.
    ///
    /// `0` marks the run as having already reached its target.
    ///
    /// # Errors
    ///
    /// [`SimError::CoverageOutOfRange`] above 100; the previous target is
    /// kept.
    pub fn configure_target_coverage(&mut self, percent: u32) -> Result<(), SimError> {
        self.ensure_not_running()?;
        let Some(target) = u8::try_from(percent).ok().filter(|p| *p <= 100) else {
            warn!(percent, "target coverage out of range");
            self.session
                .sink()
                .set_status("warning: target coverage out of range");
            return Err(SimError::CoverageOutOfRange(percent));
        };
        self.params.target_coverage = target;
        if target == 0 {
            self.termination.finish(TerminationReason::ReachedCoverage);
        } else {
            self.termination.withdraw(TerminationReason::ReachedCoverage);
        }
        info!(target, "target coverage set");
        self.session.sink().set_status("target coverage set");
        Ok(())
    }

    /// Set the run's time budget in seconds.
    ///
    /// `0` marks the run as already timed out.
    pub fn configure_time_limit(&mut self, secs: u32) -> Result<(), SimError> {
        self.ensure_not_running()?;
        self.params.time_limit_secs = secs;
        if secs == 0 {
            self.termination.finish(TerminationReason::TimedOut);
        } else {
            self.termination.withdraw(TerminationReason::TimedOut);
        }
        info!(secs, "exploring time limit set");
        self.session.sink().set_status("exploring time limit set");
        Ok(())
    }

    /// A handle that can abort the current (or next) run from elsewhere.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            termination: Arc::clone(&self.termination),
        }
    }

    /// Launch a run.  Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`SimError::RunInProgress`] while a previous run is still going.
    /// - [`SimError::NoLayout`] before a layout is loaded.
    /// - [`SimError::RobotNotPlaced`] before the robot is placed.
    ///
    /// Until the run ends the session refuses layout changes, maze resets
    /// and robot placement.
    pub fn start(&self) -> Result<RunHandle, SimError> {
        let sink = self.session.sink().clone();
        sink.refresh_input();

        let mut state = lock(&self.state);
        if *state == RunState::Running {
            return Err(SimError::RunInProgress);
        }
        let start = match self.session.begin_run() {
            Ok(pose) => pose,
            Err(e) => {
                match e {
                    SimError::NoLayout => {
                        warn!("start requested without a layout");
                        sink.set_status("warning: no layout loaded yet");
                    }
                    SimError::RobotNotPlaced => {
                        warn!("start requested before the robot was placed");
                        sink.set_status("warning: robot not placed");
                    }
                    _ => {}
                }
                return Err(e);
            }
        };

        // An abort ends one run; it does not block the next.
        self.termination.withdraw(TerminationReason::Aborted);
        *state = RunState::Running;
        drop(state);

        info!(
            speed = self.params.speed,
            target = self.params.target_coverage,
            limit_secs = self.params.time_limit_secs,
            start = %start.position,
            "robot exploring"
        );
        sink.set_status("robot exploring");

        let supervisor = Supervisor {
            session: self.session.clone(),
            explorer: Arc::clone(&self.explorer),
            termination: Arc::clone(&self.termination),
            state: Arc::clone(&self.state),
            params: self.params,
            config: self.config,
            start,
        };
        Ok(RunHandle {
            inner: tokio::spawn(supervisor.run()),
        })
    }

    fn ensure_not_running(&self) -> Result<(), SimError> {
        if *lock(&self.state) == RunState::Running {
            return Err(SimError::RunInProgress);
        }
        Ok(())
    }
}

/// Aborts a run from another task or a signal handler.
#[derive(Debug, Clone)]
pub struct StopHandle {
    termination: Arc<Termination>,
}

impl StopHandle {
    /// Returns `true` if this call ended a run that was still going.
    pub fn stop(&self) -> bool {
        let stopped = self.termination.finish(TerminationReason::Aborted);
        if stopped {
            info!("exploration aborted by operator");
        }
        stopped
    }
}

/// Completion handle for a launched run.
pub struct RunHandle {
    inner: JoinHandle<Result<TerminationReason, SimError>>,
}

impl RunHandle {
    /// Wait for the run to end.  Resolves to the termination reason, or to
    /// the explorer's error if it failed.
    pub async fn wait(self) -> Result<TerminationReason, SimError> {
        self.inner
            .await
            .map_err(|e| SimError::TaskFailed(format!("supervisor: {e}")))?
    }

    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Supervisor
// ─────────────────────────────────────────────────────────────────────────────

struct Supervisor {
    session: Session,
    explorer: Arc<dyn Explorer>,
    termination: Arc<Termination>,
    state: Arc<Mutex<RunState>>,
    params: RunParams,
    config: OrchestratorConfig,
    start: Pose,
}

impl Supervisor {
    async fn run(self) -> Result<TerminationReason, SimError> {
        let sink = self.session.sink().clone();

        let timer = tokio::spawn(timer::run_countdown(
            self.params.time_limit_secs,
            self.config.timer_period,
            Arc::clone(&self.termination),
            sink.clone(),
        ));

        let ctx = ExploreContext::new(
            self.session.clone(),
            Arc::clone(&self.termination),
            self.params.speed,
        );
        let explorer = Arc::clone(&self.explorer);
        let start = self.start;
        let mut explore = tokio::task::spawn_blocking(move || explorer.explore(&ctx, start));

        let mut monitor = tokio::spawn(
            CoverageMonitor::new(
                self.session.clone(),
                Arc::clone(&self.termination),
                self.params.target_coverage,
                self.config.poll_interval,
            )
            .run(Some(timer.abort_handle())),
        );

        let mut failure: Option<SimError> = None;
        let mut explorer_done = false;
        let outcome = loop {
            tokio::select! {
                joined = &mut explore, if !explorer_done => {
                    explorer_done = true;
                    match flatten_explorer(joined) {
                        Ok(()) => {
                            info!("robot exploration completed");
                            sink.set_status("robot exploration completed");
                        }
                        Err(e) => {
                            warn!(error = %e, "explorer failed");
                            self.termination.finish(TerminationReason::Aborted);
                            failure = Some(e);
                        }
                    }
                }
                joined = &mut monitor => {
                    break joined.map_err(|e| SimError::TaskFailed(format!("coverage monitor: {e}")));
                }
            }
        };

        // Make sure the explorer thread sees the end of the run even if the
        // monitor itself died.
        self.termination.finish(TerminationReason::Aborted);
        timer.abort();
        if !explorer_done {
            if let Err(e) = flatten_explorer(explore.await) {
                warn!(error = %e, "explorer failed while winding down");
            }
        }

        let result = match (outcome, failure) {
            (Ok(reason), None) => Ok(reason),
            (Ok(_), Some(e)) | (Err(e), _) => Err(e),
        };
        self.session.end_run();
        match &result {
            Ok(reason) => {
                *lock(&self.state) = RunState::Completed(*reason);
                info!(%reason, coverage = self.session.coverage_percent(), "run completed");
                sink.run_finished(*reason);
            }
            Err(e) => {
                *lock(&self.state) = RunState::Idle;
                sink.set_status(&format!("exploration failed: {e}"));
            }
        }
        result
    }
}

fn flatten_explorer(joined: Result<Result<(), SimError>, JoinError>) -> Result<(), SimError> {
    joined.map_err(|e| SimError::TaskFailed(format!("explorer: {e}")))?
}

fn lock(state: &Mutex<RunState>) -> MutexGuard<'_, RunState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explorer::SweepExplorer;
    use mazesim_middleware::{BusSink, EventBus, Topic, TopicReceiver};
    use mazesim_perception::{ArenaLayout, MazeRef};
    use mazesim_types::{ArenaDims, Cell, Classification, EventPayload, Landmarks};
    use std::time::Instant;

    /// Places nothing, reveals nothing, waits for the run to end.
    struct IdleExplorer {
        maze: MazeRef,
    }

    impl Explorer for IdleExplorer {
        fn explore(&self, ctx: &ExploreContext, _start: Pose) -> Result<(), SimError> {
            while !ctx.should_stop() {
                std::thread::sleep(Duration::from_millis(2));
            }
            Ok(())
        }
        fn maze_ref(&self) -> MazeRef {
            self.maze.clone()
        }
        fn landmarks(&self) -> Landmarks {
            Landmarks::for_arena(self.maze.dims())
        }
    }

    struct FailingExplorer {
        maze: MazeRef,
        panic: bool,
    }

    impl Explorer for FailingExplorer {
        fn explore(&self, _ctx: &ExploreContext, start: Pose) -> Result<(), SimError> {
            if self.panic {
                panic!("sensor fault");
            }
            Err(SimError::OutOfBounds {
                cell: start.position,
            })
        }
        fn maze_ref(&self) -> MazeRef {
            self.maze.clone()
        }
        fn landmarks(&self) -> Landmarks {
            Landmarks::for_arena(self.maze.dims())
        }
    }

    fn fast() -> OrchestratorConfig {
        OrchestratorConfig {
            poll_interval: Duration::from_millis(5),
            timer_period: Duration::from_millis(20),
        }
    }

    fn orchestrator(explorer: Arc<dyn Explorer>, bus: &EventBus) -> Orchestrator {
        let sink = Arc::new(BusSink::new(bus.clone(), "mazesim-runtime::test"));
        let session = Session::new(explorer.maze_ref(), explorer.landmarks(), sink);
        Orchestrator::new(session, explorer, fast())
    }

    fn ready(o: &Orchestrator) {
        o.session()
            .load_map(ArenaLayout::empty(o.session().dims()), None)
            .unwrap();
        o.session().place_robot(Cell::new(7, 9)).unwrap();
    }

    fn drain(rx: &mut TopicReceiver) -> Vec<EventPayload> {
        std::iter::from_fn(|| rx.try_recv()).map(|e| e.payload).collect()
    }

    fn sweep() -> Arc<dyn Explorer> {
        Arc::new(SweepExplorer::new(ArenaDims::default()))
    }

    fn idle() -> Arc<dyn Explorer> {
        Arc::new(IdleExplorer {
            maze: MazeRef::new(ArenaDims::default()),
        })
    }

    #[tokio::test]
    async fn sweep_reaches_half_coverage_before_time_limit() {
        let bus = EventBus::default();
        let mut telemetry = bus.subscribe_to(Topic::Telemetry);
        let mut o = orchestrator(sweep(), &bus);
        o.config.timer_period = DEFAULT_TICK;
        ready(&o);
        o.configure_speed(0).unwrap();
        o.configure_target_coverage(50).unwrap();
        o.configure_time_limit(60).unwrap();

        let began = Instant::now();
        let reason = o.start().unwrap().wait().await.unwrap();

        assert_eq!(reason, TerminationReason::ReachedCoverage);
        assert!(began.elapsed() < Duration::from_secs(60));
        assert!(o.session().coverage_percent() >= 50);
        assert!(o.has_reached_target_coverage());
        assert!(!o.is_timeout());
        assert_eq!(o.state(), RunState::Completed(TerminationReason::ReachedCoverage));

        let coverage: Vec<u8> = drain(&mut telemetry)
            .into_iter()
            .filter_map(|p| match p {
                EventPayload::Coverage(c) => Some(c),
                _ => None,
            })
            .collect();
        assert!(!coverage.is_empty());
        assert!(coverage.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn idle_explorer_times_out() {
        let bus = EventBus::default();
        let mut timer = bus.subscribe_to(Topic::Timer);
        let mut o = orchestrator(idle(), &bus);
        ready(&o);
        o.configure_time_limit(2).unwrap();

        let reason = o.start().unwrap().wait().await.unwrap();

        assert_eq!(reason, TerminationReason::TimedOut);
        assert!(o.is_timeout());
        let payloads = drain(&mut timer);
        assert!(payloads.contains(&EventPayload::TimeRemaining(0)));
        assert!(payloads.iter().any(|p| matches!(p, EventPayload::Alert(_))));
    }

    #[tokio::test]
    async fn zero_time_limit_finishes_immediately() {
        let bus = EventBus::default();
        let mut o = orchestrator(idle(), &bus);
        ready(&o);
        o.configure_time_limit(0).unwrap();
        assert!(o.is_timeout());

        let reason = o.start().unwrap().wait().await.unwrap();
        assert_eq!(reason, TerminationReason::TimedOut);
    }

    #[tokio::test]
    async fn zero_target_coverage_finishes_immediately() {
        let bus = EventBus::default();
        let mut o = orchestrator(idle(), &bus);
        ready(&o);
        o.configure_target_coverage(0).unwrap();
        assert!(o.has_reached_target_coverage());

        let reason = o.start().unwrap().wait().await.unwrap();
        assert_eq!(reason, TerminationReason::ReachedCoverage);
    }

    #[test]
    fn nonzero_values_withdraw_sentinels() {
        let bus = EventBus::default();
        let mut o = orchestrator(idle(), &bus);
        o.configure_time_limit(0).unwrap();
        assert!(o.is_timeout());
        o.configure_target_coverage(40).unwrap();
        assert!(o.is_timeout());
        o.configure_time_limit(30).unwrap();
        assert_eq!(o.termination_reason(), TerminationReason::Running);
    }

    #[test]
    fn out_of_range_coverage_keeps_previous_target() {
        let bus = EventBus::default();
        let mut status = bus.subscribe_to(Topic::Status);
        let mut o = orchestrator(idle(), &bus);
        o.configure_target_coverage(70).unwrap();

        assert_eq!(
            o.configure_target_coverage(101),
            Err(SimError::CoverageOutOfRange(101))
        );
        assert_eq!(o.params().target_coverage, 70);
        assert_eq!(
            drain(&mut status),
            vec![
                EventPayload::Status("target coverage set".into()),
                EventPayload::Status("warning: target coverage out of range".into()),
            ]
        );
    }

    #[tokio::test]
    async fn start_requires_layout_and_robot() {
        let bus = EventBus::default();
        let mut status = bus.subscribe_to(Topic::Status);
        let o = orchestrator(idle(), &bus);

        assert!(matches!(o.start(), Err(SimError::NoLayout)));
        let seen = drain(&mut status);
        assert_eq!(seen[0], EventPayload::InputRefreshed);
        assert_eq!(
            seen[1],
            EventPayload::Status("warning: no layout loaded yet".into())
        );

        o.session()
            .load_map(ArenaLayout::empty(o.session().dims()), None)
            .unwrap();
        assert!(matches!(o.start(), Err(SimError::RobotNotPlaced)));
        assert_eq!(o.state(), RunState::Idle);
    }

    #[tokio::test]
    async fn second_start_and_configuration_rejected_while_running() {
        let bus = EventBus::default();
        let mut o = orchestrator(idle(), &bus);
        ready(&o);
        o.configure_time_limit(3600).unwrap();

        let handle = o.start().unwrap();
        assert_eq!(o.state(), RunState::Running);
        assert!(matches!(o.start(), Err(SimError::RunInProgress)));
        assert_eq!(o.configure_speed(5), Err(SimError::RunInProgress));

        assert!(o.stop_handle().stop());
        assert_eq!(handle.wait().await, Ok(TerminationReason::Aborted));
        assert_eq!(o.state(), RunState::Completed(TerminationReason::Aborted));
    }

    #[tokio::test]
    async fn session_is_frozen_until_the_run_ends() {
        let bus = EventBus::default();
        let mut o = orchestrator(idle(), &bus);
        ready(&o);
        o.configure_time_limit(3600).unwrap();
        let session = o.session().clone();
        session
            .maze()
            .classify(Cell::new(7, 9), Classification::Empty)
            .unwrap();

        let handle = o.start().unwrap();
        assert!(session.is_exploring());
        let layout = ArenaLayout::empty(session.dims());
        assert_eq!(
            session.load_map(layout.clone(), None),
            Err(SimError::RunInProgress)
        );
        assert_eq!(session.clear_map(), Err(SimError::RunInProgress));
        assert_eq!(
            session.place_robot(Cell::new(3, 3)),
            Err(SimError::RunInProgress)
        );
        assert_eq!(session.reset_maze(), Err(SimError::RunInProgress));
        assert_eq!(
            session.maze().get(Cell::new(7, 9)),
            Some(Classification::Empty)
        );
        assert_eq!(session.pose().unwrap().position, Cell::new(7, 9));

        o.stop_handle().stop();
        handle.wait().await.unwrap();
        assert!(!session.is_exploring());
        assert_eq!(session.load_map(layout, None), Ok(()));
    }

    #[tokio::test]
    async fn sweep_reruns_after_the_map_is_cleared() {
        let bus = EventBus::default();
        let mut o = orchestrator(sweep(), &bus);
        let mut layout = ArenaLayout::empty(o.session().dims());
        layout.set_obstacle(Cell::new(7, 12), true).unwrap();
        o.session().load_map(layout, None).unwrap();
        o.session().place_robot(Cell::new(7, 9)).unwrap();
        o.configure_speed(0).unwrap();
        o.configure_time_limit(5).unwrap();

        assert!(o.start().unwrap().wait().await.is_ok());

        o.session().clear_map().unwrap();
        o.session().place_robot(Cell::new(7, 9)).unwrap();
        o.configure_target_coverage(100).unwrap();
        o.configure_time_limit(5).unwrap();

        let second = o.start().unwrap().wait().await;
        assert!(second.is_ok(), "second run failed: {second:?}");
        assert_ne!(o.state(), RunState::Idle);
    }

    #[tokio::test]
    async fn aborted_run_can_be_restarted() {
        let bus = EventBus::default();
        let mut o = orchestrator(idle(), &bus);
        ready(&o);
        o.configure_time_limit(1).unwrap();

        let first = o.start().unwrap();
        o.stop_handle().stop();
        assert_eq!(first.wait().await, Ok(TerminationReason::Aborted));

        let second = o.start().unwrap().wait().await;
        assert_eq!(second, Ok(TerminationReason::TimedOut));
    }

    #[tokio::test]
    async fn explorer_error_aborts_and_returns_to_idle() {
        let bus = EventBus::default();
        let mut status = bus.subscribe_to(Topic::Status);
        let explorer = Arc::new(FailingExplorer {
            maze: MazeRef::new(ArenaDims::default()),
            panic: false,
        });
        let mut o = orchestrator(explorer, &bus);
        ready(&o);
        o.configure_time_limit(3600).unwrap();

        let result = o.start().unwrap().wait().await;

        assert!(matches!(result, Err(SimError::OutOfBounds { .. })));
        assert_eq!(o.state(), RunState::Idle);
        assert_eq!(o.termination_reason(), TerminationReason::Aborted);
        assert!(drain(&mut status).iter().any(|p| matches!(
            p,
            EventPayload::Status(s) if s.starts_with("exploration failed")
        )));
    }

    #[tokio::test]
    async fn explorer_panic_is_reported_as_task_failure() {
        let bus = EventBus::default();
        let explorer = Arc::new(FailingExplorer {
            maze: MazeRef::new(ArenaDims::default()),
            panic: true,
        });
        let mut o = orchestrator(explorer, &bus);
        ready(&o);
        o.configure_time_limit(3600).unwrap();

        let result = o.start().unwrap().wait().await;

        assert!(matches!(result, Err(SimError::TaskFailed(_))));
        assert_eq!(o.state(), RunState::Idle);
    }
}
