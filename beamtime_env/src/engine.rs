//! Callback contract between the scheduler and a transport engine.

use crate::error::EngineError;
use crate::types::{RunInterval, SourceHandle};

/// Per-run primary budget handed to [`TransportEngine::begin_run`].
///
/// Engines want a finite event count when a run starts. The scheduler decides
/// when a run really stops, so it asks for a count it will never reach.
pub const MAX_PRIMARIES_PER_RUN: u64 = i32::MAX as u64;

/// The engine side of the scheduler boundary.
///
/// # Implementations
///
/// - **Reference**: [`crate::RecordingEngine`] records every call and
///   enforces the run protocol
/// - **Physics**: an adapter around the real transport engine's run manager
///
/// # Run Protocol
///
/// ```text
/// Scheduler                         Engine
///   |-- begin_run(budget, [b, e)) --->|
///   |-- generate_primary(src, t) ---->|   (repeated)
///   |-- end_run(graceful) ----------->|
///   |            ...next interval...  |
///   |-- confirm_no_primaries_in_flight|
/// ```
pub trait TransportEngine {
    /// Opens a new run covering `interval`.
    ///
    /// # Arguments
    /// * `max_primaries` - Upper bound on primaries in this run, normally [`MAX_PRIMARIES_PER_RUN`]
    /// * `interval` - The time window the run covers
    fn begin_run(&mut self, max_primaries: u64, interval: RunInterval) -> Result<(), EngineError>;
    
    /// Materializes one primary from `source` at simulated time `event_time`.
    ///
    /// Particle construction is entirely the engine's business.
    fn generate_primary(&mut self, source: SourceHandle, event_time: f64) -> Result<(), EngineError>;
    
    /// Finishes the current run.
    ///
    /// `graceful = false` means: let the in-flight event complete, then stop
    /// and do not start another one.
    ///
    /// # Returns
    /// * `Ok(())` - The run is closed and nothing is being tracked
    /// * `Err(EngineError::PrimariesInFlight)` - The run could not be closed cleanly
    fn end_run(&mut self, graceful: bool) -> Result<(), EngineError>;
    
    /// Liveness check used once, at final teardown.
    fn confirm_no_primaries_in_flight(&self) -> bool;
}
