//! Beamtime Engine Abstraction Layer
//!
//! This crate is the boundary between the source scheduler and the
//! particle-transport engine that actually tracks primaries.
//!
//! # Core Concept: The Callback Contract
//!
//! The scheduler never talks to a physics engine directly. Everything it
//! needs is four calls:
//! - `begin_run()` opens a run for one configured time interval
//! - `generate_primary()` materializes one primary from a source
//! - `end_run()` closes the current run
//! - `confirm_no_primaries_in_flight()` is the final teardown check
//!
//! Any engine that implements [`TransportEngine`] can be driven by the
//! scheduler, and [`RecordingEngine`] lets the whole stack run without one.
//!
//! # Example
//!
//! ```ignore
//! use beamtime_env::{RecordingEngine, RunInterval, SourceHandle, TransportEngine};
//!
//! let mut engine = RecordingEngine::new();
//! engine.begin_run(MAX_PRIMARIES_PER_RUN, RunInterval::new(0.0, 10.0))?;
//! engine.generate_primary(SourceHandle(0), 1.5)?;
//! engine.end_run(false)?;
//! assert!(engine.confirm_no_primaries_in_flight());
//! ```

mod engine;
mod types;
mod error;
mod recording;

pub use engine::{TransportEngine, MAX_PRIMARIES_PER_RUN};
pub use types::{RunInterval, SourceHandle};
pub use error::EngineError;
pub use recording::{RecordingEngine, RecordedPrimary, RecordedRun};
