//! Simulation-level errors.
//!
//! Nothing here is retried. A scheduling decision cannot be replayed without
//! risking a different outcome or a primary counted twice, so every error
//! aborts the simulation with the scheduler state attached.

use beamtime_core::{ConfigError, ScheduleError, ScheduleSnapshot};
use beamtime_env::EngineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    
    #[error("Scheduling invariant violated: {0}")]
    Schedule(#[from] ScheduleError),
    
    #[error("Engine failure ({snapshot}): {source}")]
    Engine {
        snapshot: ScheduleSnapshot,
        #[source]
        source: EngineError,
    },
    
    #[error("Run could not terminate cleanly, {in_flight} primaries in flight ({snapshot})")]
    RunTermination { in_flight: u64, snapshot: ScheduleSnapshot },
    
    #[error("Primaries still in flight after the last run ({snapshot})")]
    PrimariesInFlightAtEnd { snapshot: ScheduleSnapshot },
    
    #[error("Simulation was aborted by an earlier error")]
    Aborted,
    
    #[error("Worker {worker} failed: {message}")]
    Worker { worker: usize, message: String },
    
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SimError {
    /// Scheduler state attached to the error, if any.
    pub fn snapshot(&self) -> Option<&ScheduleSnapshot> {
        match self {
            Self::Schedule(err) => Some(err.snapshot()),
            Self::Engine { snapshot, .. }
            | Self::RunTermination { snapshot, .. }
            | Self::PrimariesInFlightAtEnd { snapshot } => Some(snapshot),
            _ => None,
        }
    }
}
