//! `mazesim-perception` – the robot's model of the arena.
//!
//! Holds every grid the exploration core reasons about and the geometry that
//! maps between them.
//!
//! # Modules
//!
//! - [`frame`] – conversion between the arena frame ([`Cell`][mazesim_types::Cell],
//!   south-west origin) and the display grid frame
//!   ([`GridIndex`][mazesim_types::GridIndex], north row first), plus
//!   footprint geometry.
//! - [`layout`] – [`ArenaLayout`][layout::ArenaLayout]: the ground-truth
//!   obstacle map, its text descriptor format, and obstacle editing.
//! - [`maze_ref`] – [`MazeRef`][maze_ref::MazeRef]: the explorer's
//!   monotonic Unknown/Empty/Obstacle classification grid.
//! - [`display`] – [`DisplayGrid`][display::DisplayGrid]: rendered cell
//!   states and coverage counting.

pub mod display;
pub mod frame;
pub mod layout;
pub mod maze_ref;

pub use display::{DisplayGrid, Paint};
pub use layout::ArenaLayout;
pub use maze_ref::{ClassGrid, MazeRef};
