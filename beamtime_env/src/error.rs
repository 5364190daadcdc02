//! Error types for the engine boundary.

use thiserror::Error;

/// Errors reported by a transport engine through the callback contract.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// `begin_run` was called while a run was still open
    #[error("Run already open: run {0} was never ended")]
    RunAlreadyOpen(usize),
    
    /// A primary or `end_run` arrived with no open run
    #[error("No run is open")]
    NoOpenRun,
    
    /// The run could not be terminated because primaries are still being tracked
    #[error("{0} primaries still in flight at run termination")]
    PrimariesInFlight(u64),
    
    /// The per-run primary budget handed to `begin_run` was exhausted
    #[error("Primary budget of {0} exhausted for the current run")]
    BudgetExhausted(u64),
    
    /// Engine-side failure
    #[error("Engine error: {0}")]
    Engine(String),
}

impl EngineError {
    /// Creates an engine-side error.
    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine(msg.into())
    }
}
