//! Reference engine that records calls instead of tracking particles.

use crate::engine::TransportEngine;
use crate::error::EngineError;
use crate::types::{RunInterval, SourceHandle};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One primary as seen by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecordedPrimary {
    /// Index of the run the primary was generated in
    pub run: usize,
    
    /// Source that emitted it
    pub source: SourceHandle,
    
    /// Simulated emission time (seconds)
    pub time: f64,
}

/// One run as seen by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedRun {
    /// Interval the run was opened for
    pub interval: RunInterval,
    
    /// Budget requested at `begin_run`
    pub max_primaries: u64,
    
    /// Primaries generated during the run
    pub primaries: u64,
    
    /// `graceful` flag passed to `end_run`, `None` while the run is open
    pub ended_gracefully: Option<bool>,
}

/// Transport engine stand-in.
///
/// Every primary is "tracked" instantly, so nothing is ever left in flight
/// unless a test injects stuck primaries with
/// [`RecordingEngine::inject_stuck_primaries`].
#[derive(Debug, Default)]
pub struct RecordingEngine {
    runs: Vec<RecordedRun>,
    primaries: Vec<RecordedPrimary>,
    open: bool,
    stuck: u64,
}

impl RecordingEngine {
    /// Creates an engine with no runs.
    pub fn new() -> Self {
        Self::default()
    }
    
    /// Makes `count` primaries hang in the tracking stage.
    ///
    /// The next `end_run` fails with [`EngineError::PrimariesInFlight`] and
    /// `confirm_no_primaries_in_flight` reports false.
    pub fn inject_stuck_primaries(&mut self, count: u64) {
        self.stuck = count;
    }
    
    /// All runs opened so far.
    pub fn runs(&self) -> &[RecordedRun] {
        &self.runs
    }
    
    /// All primaries generated so far, in call order.
    pub fn primaries(&self) -> &[RecordedPrimary] {
        &self.primaries
    }
    
    /// True while a run is open.
    pub fn is_run_open(&self) -> bool {
        self.open
    }
    
    /// Number of primaries emitted by `source`.
    pub fn count_for(&self, source: SourceHandle) -> usize {
        self.primaries.iter().filter(|p| p.source == source).count()
    }
}

impl TransportEngine for RecordingEngine {
    fn begin_run(&mut self, max_primaries: u64, interval: RunInterval) -> Result<(), EngineError> {
        if self.open {
            return Err(EngineError::RunAlreadyOpen(self.runs.len() - 1));
        }
        debug!("engine: begin run {} on {}", self.runs.len(), interval);
        self.runs.push(RecordedRun {
            interval,
            max_primaries,
            primaries: 0,
            ended_gracefully: None,
        });
        self.open = true;
        Ok(())
    }
    
    fn generate_primary(&mut self, source: SourceHandle, event_time: f64) -> Result<(), EngineError> {
        if !self.open {
            return Err(EngineError::NoOpenRun);
        }
        let run_index = self.runs.len() - 1;
        let run = &mut self.runs[run_index];
        if run.primaries >= run.max_primaries {
            return Err(EngineError::BudgetExhausted(run.max_primaries));
        }
        run.primaries += 1;
        self.primaries.push(RecordedPrimary {
            run: run_index,
            source,
            time: event_time,
        });
        Ok(())
    }
    
    fn end_run(&mut self, graceful: bool) -> Result<(), EngineError> {
        if !self.open {
            return Err(EngineError::NoOpenRun);
        }
        if self.stuck > 0 {
            return Err(EngineError::PrimariesInFlight(self.stuck));
        }
        if let Some(run) = self.runs.last_mut() {
            run.ended_gracefully = Some(graceful);
            debug!("engine: end run with {} primaries", run.primaries);
        }
        self.open = false;
        Ok(())
    }
    
    fn confirm_no_primaries_in_flight(&self) -> bool {
        !self.open && self.stuck == 0
    }
}
