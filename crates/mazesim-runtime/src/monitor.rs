//! [`CoverageMonitor`] – watches the rendered grid and ends the run once the
//! target coverage is met.
//!
//! Coverage is computed from the *rendered* state, not the classification
//! grid: footprint cells count as explored before the explorer has formally
//! classified them.  Each iteration first checks the termination cell, then
//! samples coverage, then sleeps until the next poll tick or until the
//! termination cell changes, whichever comes first.

use std::sync::Arc;
use std::time::Duration;

use mazesim_types::TerminationReason;
use tokio::task::AbortHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::session::Session;
use crate::termination::Termination;

/// Default sampling period.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

pub struct CoverageMonitor {
    session: Session,
    termination: Arc<Termination>,
    target: u8,
    poll_interval: Duration,
}

impl CoverageMonitor {
    pub fn new(
        session: Session,
        termination: Arc<Termination>,
        target: u8,
        poll_interval: Duration,
    ) -> Self {
        Self {
            session,
            termination,
            target,
            poll_interval,
        }
    }

    /// Poll until the run ends, then cancel `timer` and report the final
    /// status.  Returns the reason the run ended.
    pub async fn run(self, timer: Option<AbortHandle>) -> TerminationReason {
        let sink = self.session.sink().clone();
        let mut changes = self.termination.subscribe();
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last: Option<u8> = None;

        loop {
            if *changes.borrow_and_update() != TerminationReason::Running {
                break;
            }

            let coverage = self.session.coverage_percent();
            if last != Some(coverage) {
                if let Some(previous) = last.filter(|p| coverage < *p) {
                    warn!(previous, coverage, "coverage went backwards");
                }
                debug!(coverage, "coverage changed");
                sink.set_coverage(coverage);
                last = Some(coverage);
            }

            if coverage >= self.target
                && self.termination.finish(TerminationReason::ReachedCoverage)
            {
                info!(coverage, target = self.target, "target coverage reached");
                continue;
            }

            tokio::select! {
                _ = ticker.tick() => {}
                changed = changes.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        if let Some(timer) = timer {
            timer.abort();
        }
        let reason = self.termination.reason();
        info!(%reason, coverage = self.session.coverage_percent(), "exploration stopped");
        sink.set_status(&reason.to_string());
        reason
    }
}
