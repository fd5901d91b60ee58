//! `mazesim-middleware` – Display Plumbing
//!
//! Carries everything the exploration core reports (status lines, coverage,
//! countdown, pose) to whatever renders it, without caring what the
//! renderer is.
//!
//! # Modules
//!
//! - [`bus`] – headless, topic-based publish/subscribe event bus built on
//!   Tokio broadcast channels.
//! - [`sink`] – the [`DisplaySink`][sink::DisplaySink] contract the core
//!   talks to, and [`BusSink`][sink::BusSink], which forwards every call onto
//!   the bus.

pub mod bus;
pub mod sink;

pub use bus::{EventBus, Topic, TopicReceiver};
pub use sink::{BusSink, DisplaySink};
