//! # Swarm Simulator
//!
//! Fixed-interval simulation engine for the drone swarm.
//!
//! ## Features
//!
//! - Owns every drone behind a single read/write lock
//! - Half-second clock that drops firings on overrun instead of queuing them
//! - Owned snapshots handed to a registered [`TickObserver`] after each tick
//! - Per-drone and swarm-wide `goto`/`recall` commands

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod engine;
pub mod observer;
pub mod summary;

pub use engine::{Engine, SimConfig, Snapshot};
pub use observer::{FnObserver, TickObserver};
pub use summary::FleetSummary;
