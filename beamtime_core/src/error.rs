//! Configuration and scheduling errors.
//!
//! Both kinds are fatal. Configuration errors are raised before the first
//! run starts; scheduling errors mean the scheduler state is corrupt and the
//! simulation has to stop before it biases the results.

use beamtime_env::{RunInterval, SourceHandle};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Invalid user configuration, detected eagerly.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Run interval table is empty")]
    EmptyIntervalTable,
    
    #[error("Run interval {index} has a non-finite bound")]
    NonFiniteBound { index: usize },
    
    #[error("Run interval {index} is empty or reversed: [{begin}, {end})")]
    DegenerateInterval { index: usize, begin: f64, end: f64 },
    
    #[error("Run interval {index} begins at {begin}, before the previous interval begins at {previous_begin}")]
    UnsortedIntervals { index: usize, begin: f64, previous_begin: f64 },
    
    #[error("Run interval {index} begins at {begin}, overlapping the previous interval ending at {previous_end}")]
    OverlappingIntervals { index: usize, begin: f64, previous_end: f64 },
    
    #[error("No sources configured")]
    NoSources,
    
    #[error("Duplicate source name '{source_name}'")]
    DuplicateSourceName { source_name: String },
    
    #[error("Source '{source_name}' has no emission law (n and activity are both zero or unset)")]
    NoEmissionLaw { source_name: String },
    
    #[error("Source '{source_name}' has conflicting emission laws: {reason}")]
    ConflictingLaws { source_name: String, reason: String },
    
    #[error("Source '{source_name}' has invalid activity {value}")]
    InvalidActivity { source_name: String, value: f64 },
    
    #[error("Source '{source_name}' has invalid half-life {value}")]
    InvalidHalfLife { source_name: String, value: f64 },
    
    #[error("Source '{source_name}' has an empty time window [{start}, {end})")]
    EmptyTimeWindow { source_name: String, start: f64, end: f64 },
    
    #[error("Invalid worker {worker} of {workers}")]
    InvalidWorker { worker: usize, workers: usize },
}

/// Scheduler state at the moment an invariant failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSnapshot {
    pub current_time: f64,
    pub interval_index: usize,
    pub interval: RunInterval,
    
    /// Offending source, when one is involved
    pub source: Option<(SourceHandle, String)>,
}

impl std::fmt::Display for ScheduleSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "t={} interval={} {}",
            self.current_time, self.interval_index, self.interval
        )?;
        if let Some((handle, name)) = &self.source {
            write!(f, " source={} '{}'", handle, name)?;
        }
        Ok(())
    }
}

/// Internal scheduling invariant violation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScheduleError {
    #[error("Selected event at t={time} lies outside the current interval ({snapshot})")]
    EventOutsideInterval { time: f64, snapshot: ScheduleSnapshot },
    
    #[error("Selected event at t={time} is earlier than the clock ({snapshot})")]
    NegativeTimeDelta { time: f64, snapshot: ScheduleSnapshot },
    
    #[error("Terminated source selected ({snapshot})")]
    TerminatedSourceSelected { snapshot: ScheduleSnapshot },
    
    #[error("Event (t={time}, id={event_id}) does not follow the previous event ({snapshot})")]
    OrderingViolation { time: f64, event_id: u64, snapshot: ScheduleSnapshot },
    
    #[error("Cannot open interval {index} ({snapshot})")]
    IntervalOutOfRange { index: usize, snapshot: ScheduleSnapshot },
}

impl ScheduleError {
    /// Scheduler state captured when the error was raised.
    pub fn snapshot(&self) -> &ScheduleSnapshot {
        match self {
            Self::EventOutsideInterval { snapshot, .. }
            | Self::NegativeTimeDelta { snapshot, .. }
            | Self::TerminatedSourceSelected { snapshot }
            | Self::OrderingViolation { snapshot, .. }
            | Self::IntervalOutOfRange { snapshot, .. } => snapshot,
        }
    }
}
