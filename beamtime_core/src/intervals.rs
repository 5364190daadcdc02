//! Run interval table.
//!
//! An ordered list of `[begin, end)` windows during which the simulation is
//! live. Consecutive windows may touch (`[0, 10)`, `[10, 20)`) or leave a gap
//! (`[10, 20)`, `[30, 50)`). No primary is ever scheduled inside a gap; the
//! clock simply jumps to the next window's begin.

use crate::error::ConfigError;
use beamtime_env::RunInterval;
use serde::Serialize;

/// Validated, immutable run interval table.
///
/// Read-only after construction, so one instance is shared by every worker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunIntervalTable {
    intervals: Vec<RunInterval>,
}

impl RunIntervalTable {
    /// Validates `intervals` and builds the table.
    pub fn new(intervals: Vec<RunInterval>) -> Result<Self, ConfigError> {
        Self::validate(&intervals)?;
        Ok(Self { intervals })
    }
    
    /// Builds the table from `(begin, end)` pairs.
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Result<Self, ConfigError> {
        Self::new(pairs.iter().copied().map(RunInterval::from).collect())
    }
    
    /// Checks that the windows are finite, non-empty, sorted and disjoint.
    ///
    /// Pure: the same input always yields the same result and message.
    pub fn validate(intervals: &[RunInterval]) -> Result<(), ConfigError> {
        if intervals.is_empty() {
            return Err(ConfigError::EmptyIntervalTable);
        }
        
        for (index, interval) in intervals.iter().enumerate() {
            if !interval.begin.is_finite() || !interval.end.is_finite() {
                return Err(ConfigError::NonFiniteBound { index });
            }
            if interval.begin >= interval.end {
                return Err(ConfigError::DegenerateInterval {
                    index,
                    begin: interval.begin,
                    end: interval.end,
                });
            }
        }
        
        for (index, pair) in intervals.windows(2).enumerate() {
            let (previous, current) = (pair[0], pair[1]);
            let index = index + 1;
            if current.begin < previous.begin {
                return Err(ConfigError::UnsortedIntervals {
                    index,
                    begin: current.begin,
                    previous_begin: previous.begin,
                });
            }
            if current.begin < previous.end {
                return Err(ConfigError::OverlappingIntervals {
                    index,
                    begin: current.begin,
                    previous_end: previous.end,
                });
            }
        }
        
        Ok(())
    }
    
    /// Number of intervals (= number of runs).
    pub fn len(&self) -> usize {
        self.intervals.len()
    }
    
    /// Always false for a validated table.
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }
    
    /// Returns the interval at `index`.
    pub fn get(&self, index: usize) -> Option<RunInterval> {
        self.intervals.get(index).copied()
    }
    
    /// Iterates intervals in order.
    pub fn iter(&self) -> impl Iterator<Item = &RunInterval> {
        self.intervals.iter()
    }
    
    /// Begin of the first interval; the default source start time.
    pub fn first_begin(&self) -> f64 {
        self.intervals[0].begin
    }
    
    /// End of the last interval; the default source end time.
    pub fn last_end(&self) -> f64 {
        self.intervals[self.intervals.len() - 1].end
    }
    
    /// Total live time, gaps excluded.
    pub fn live_duration(&self) -> f64 {
        self.intervals.iter().map(RunInterval::duration).sum()
    }
    
    /// Non-empty gaps between consecutive intervals.
    pub fn gaps(&self) -> impl Iterator<Item = RunInterval> + '_ {
        self.intervals
            .windows(2)
            .filter(|pair| pair[1].begin > pair[0].end)
            .map(|pair| RunInterval::new(pair[0].end, pair[1].begin))
    }
    
    /// True when `t` falls strictly inside a gap.
    pub fn in_gap(&self, t: f64) -> bool {
        self.gaps().any(|gap| t > gap.begin && t < gap.end)
    }
    
    /// Index of the interval containing `t`, if any.
    pub fn index_of(&self, t: f64) -> Option<usize> {
        self.intervals.iter().position(|interval| interval.contains(t))
    }
}
