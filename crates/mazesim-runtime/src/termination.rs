//! [`Termination`] – the single source of truth for why a run stops.
//!
//! The countdown timer, the coverage monitor, the supervisor and an operator
//! may all try to end a run.  They race through one compare-and-swap: the
//! first [`finish`][Termination::finish] call that finds the cell in
//! [`TerminationReason::Running`] wins; every later call is a no-op.  There
//! is no "timed out *and* reached coverage" state.
//!
//! The cell lives in a [`tokio::sync::watch`] channel so async tasks can
//! wait for it to change instead of spinning on it, while the blocking
//! explorer thread simply reads the current value.
//!
//! # Example
//!
//! ```rust
//! use mazesim_runtime::termination::Termination;
//! use mazesim_types::TerminationReason;
//!
//! let t = Termination::new();
//! assert!(t.finish(TerminationReason::ReachedCoverage));
//! assert!(!t.finish(TerminationReason::TimedOut)); // too late
//! assert!(t.has_reached_target_coverage());
//! assert!(!t.is_timeout());
//! ```

use mazesim_types::TerminationReason;
use tokio::sync::watch;

/// Shared termination cell.  Wrap in an `Arc` to hand it to several tasks.
#[derive(Debug)]
pub struct Termination {
    tx: watch::Sender<TerminationReason>,
}

impl Termination {
    /// A cell in the [`TerminationReason::Running`] state.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(TerminationReason::Running);
        Self { tx }
    }

    pub fn reason(&self) -> TerminationReason {
        *self.tx.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.reason() == TerminationReason::Running
    }

    pub fn is_timeout(&self) -> bool {
        self.reason() == TerminationReason::TimedOut
    }

    pub fn has_reached_target_coverage(&self) -> bool {
        self.reason() == TerminationReason::ReachedCoverage
    }

    /// Move `Running → reason`.  Returns `true` if this call made the
    /// transition, `false` if the run had already stopped.
    pub fn finish(&self, reason: TerminationReason) -> bool {
        if reason == TerminationReason::Running {
            return false;
        }
        self.tx.send_if_modified(|current| {
            if *current == TerminationReason::Running {
                *current = reason;
                true
            } else {
                false
            }
        })
    }

    /// Move `reason → Running`, leaving any other state alone.  Returns
    /// `true` if the cell changed.
    pub fn withdraw(&self, reason: TerminationReason) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == reason && reason != TerminationReason::Running {
                *current = TerminationReason::Running;
                true
            } else {
                false
            }
        })
    }

    /// Unconditionally return to `Running`.
    pub fn reset(&self) {
        self.tx.send_replace(TerminationReason::Running);
    }

    /// A receiver that is notified on every transition.
    pub fn subscribe(&self) -> watch::Receiver<TerminationReason> {
        self.tx.subscribe()
    }
}

impl Default for Termination {
    fn default() -> Self {
        Self::new()
    }
}
