//! The display-sink contract.
//!
//! The exploration core never renders anything itself.  It reports through a
//! [`DisplaySink`]; [`BusSink`] turns those reports into [`Event`]s on the
//! [`EventBus`] so any number of front-ends can follow a run.

use mazesim_types::{Event, EventPayload, Pose, TerminationReason};
use tracing::trace;

use crate::bus::EventBus;

/// Everything the core tells a display.  Implementations must be cheap and
/// non-blocking: calls arrive from the explorer's worker thread and from
/// async tasks alike.
pub trait DisplaySink: Send + Sync {
    /// Replace the status line.
    fn set_status(&self, message: &str);

    /// Show the explored percentage.
    fn set_coverage(&self, percent: u8);

    /// Show the countdown value.
    fn set_time_counter(&self, seconds_remaining: u32);

    /// Re-read or reset operator inputs before a run starts.
    fn refresh_input(&self);

    /// Raise an audible/visual alert.
    fn alert(&self, message: &str);

    /// The robot pose changed.
    fn pose_changed(&self, pose: Pose);

    /// A run stopped for `reason`.
    fn run_finished(&self, reason: TerminationReason);
}

/// A [`DisplaySink`] that publishes every report onto an [`EventBus`].
#[derive(Clone, Debug)]
pub struct BusSink {
    bus: EventBus,
    source: String,
}

impl BusSink {
    pub fn new(bus: EventBus, source: impl Into<String>) -> Self {
        Self {
            bus,
            source: source.into(),
        }
    }

    /// The bus this sink publishes to.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    fn emit(&self, payload: EventPayload) {
        let delivered = self.bus.publish(Event::new(self.source.clone(), payload));
        trace!(delivered, "display event published");
    }
}

impl DisplaySink for BusSink {
    fn set_status(&self, message: &str) {
        self.emit(EventPayload::Status(message.to_string()));
    }

    fn set_coverage(&self, percent: u8) {
        self.emit(EventPayload::Coverage(percent));
    }

    fn set_time_counter(&self, seconds_remaining: u32) {
        self.emit(EventPayload::TimeRemaining(seconds_remaining));
    }

    fn refresh_input(&self) {
        self.emit(EventPayload::InputRefreshed);
    }

    fn alert(&self, message: &str) {
        self.emit(EventPayload::Alert(message.to_string()));
    }

    fn pose_changed(&self, pose: Pose) {
        self.emit(EventPayload::PoseChanged(pose));
    }

    fn run_finished(&self, reason: TerminationReason) {
        self.emit(EventPayload::RunFinished(reason));
    }
}
