//! Exploration countdown.
//!
//! [`Countdown`] is the pure counter; [`run_countdown`] drives it from a
//! [`tokio::time::interval`] and reports every remaining value through the
//! display sink.  Reaching zero finishes the run with
//! [`TerminationReason::TimedOut`] (unless something else finished it first)
//! and raises an alert.

use std::sync::Arc;
use std::time::Duration;

use mazesim_middleware::DisplaySink;
use mazesim_types::TerminationReason;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::termination::Termination;

/// One tick per second in normal operation.
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

/// Seconds left on the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    remaining: u32,
}

impl Countdown {
    pub fn new(limit_secs: u32) -> Self {
        Self {
            remaining: limit_secs,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_expired(&self) -> bool {
        self.remaining == 0
    }

    /// Consume one second.  Returns the new remaining value, or `None` when
    /// the countdown had already expired.
    pub fn tick(&mut self) -> Option<u32> {
        if self.is_expired() {
            return None;
        }
        self.remaining -= 1;
        Some(self.remaining)
    }
}

/// Run the countdown until it expires or the run ends for another reason.
///
/// A zero `limit_secs` returns immediately: the time-limit sentinel already
/// finished the run when it was configured.
pub async fn run_countdown(
    limit_secs: u32,
    period: Duration,
    termination: Arc<Termination>,
    sink: Arc<dyn DisplaySink>,
) {
    let mut countdown = Countdown::new(limit_secs);
    if countdown.is_expired() {
        return;
    }

    let mut stop = termination.subscribe();
    if !termination.is_running() {
        return;
    }
    sink.set_time_counter(countdown.remaining());

    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let Some(remaining) = countdown.tick() else { break };
                sink.set_time_counter(remaining);
                if remaining == 0 {
                    if termination.finish(TerminationReason::TimedOut) {
                        warn!(limit_secs, "time limit reached");
                        sink.alert("time limit reached");
                    }
                    break;
                }
            }
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow_and_update() != TerminationReason::Running {
                    debug!(remaining = countdown.remaining(), "countdown stopped early");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mazesim_middleware::{BusSink, EventBus, Topic};
    use mazesim_types::EventPayload;

    #[test]
    fn countdown_reaches_zero_then_stops() {
        let mut c = Countdown::new(3);
        assert_eq!(c.tick(), Some(2));
        assert_eq!(c.tick(), Some(1));
        assert_eq!(c.tick(), Some(0));
        assert!(c.is_expired());
        assert_eq!(c.tick(), None);
    }

    #[test]
    fn zero_limit_is_already_expired() {
        let mut c = Countdown::new(0);
        assert!(c.is_expired());
        assert_eq!(c.tick(), None);
    }

    fn sink(bus: &EventBus) -> Arc<dyn DisplaySink> {
        Arc::new(BusSink::new(bus.clone(), "mazesim-runtime::timer"))
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_finishes_with_timeout_and_alerts() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe_to(Topic::Timer);
        let termination = Arc::new(Termination::new());

        run_countdown(3, DEFAULT_TICK, termination.clone(), sink(&bus)).await;

        assert!(termination.is_timeout());
        let mut ticks = Vec::new();
        let mut alerts = 0;
        while let Some(e) = rx.try_recv() {
            match e.payload {
                EventPayload::TimeRemaining(n) => ticks.push(n),
                EventPayload::Alert(_) => alerts += 1,
                _ => {}
            }
        }
        assert_eq!(ticks, vec![3, 2, 1, 0]);
        assert_eq!(alerts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_exits_when_run_finishes_elsewhere() {
        let bus = EventBus::default();
        let termination = Arc::new(Termination::new());
        let task = tokio::spawn(run_countdown(
            600,
            DEFAULT_TICK,
            termination.clone(),
            sink(&bus),
        ));

        tokio::time::sleep(Duration::from_secs(5)).await;
        termination.finish(TerminationReason::ReachedCoverage);
        task.await.unwrap();

        assert!(termination.has_reached_target_coverage());
    }

    #[tokio::test]
    async fn zero_limit_returns_without_ticking() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe_to(Topic::Timer);
        let termination = Arc::new(Termination::new());
        termination.finish(TerminationReason::TimedOut);

        run_countdown(0, DEFAULT_TICK, termination.clone(), sink(&bus)).await;

        assert!(rx.try_recv().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn losing_the_race_does_not_alert() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe_to(Topic::Timer);
        let termination = Arc::new(Termination::new());
        let task = tokio::spawn(run_countdown(
            2,
            DEFAULT_TICK,
            termination.clone(),
            sink(&bus),
        ));
        tokio::time::sleep(Duration::from_millis(1500)).await;
        termination.finish(TerminationReason::Aborted);
        task.await.unwrap();

        assert_eq!(termination.reason(), TerminationReason::Aborted);
        while let Some(e) = rx.try_recv() {
            assert!(!matches!(e.payload, EventPayload::Alert(_)));
        }
    }
}
