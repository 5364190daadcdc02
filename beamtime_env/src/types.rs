//! Common types shared between the scheduler and the engine.

use serde::{Deserialize, Serialize};

/// Handle to a source owned by a scheduler.
///
/// Sources live in a per-worker arena and are referenced by their index in
/// it, never by pointer. The handle is only meaningful to the scheduler that
/// issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceHandle(pub usize);

impl SourceHandle {
    /// Returns the arena index.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for SourceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A half-open `[begin, end)` window of simulated time (seconds).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunInterval {
    /// Start of the window (inclusive)
    pub begin: f64,
    
    /// End of the window (exclusive)
    pub end: f64,
}

impl RunInterval {
    /// Creates a new interval. No validation is done here.
    pub fn new(begin: f64, end: f64) -> Self {
        Self { begin, end }
    }
    
    /// Length of the window in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.begin
    }
    
    /// True when `t` lies in `[begin, end)`.
    pub fn contains(&self, t: f64) -> bool {
        t >= self.begin && t < self.end
    }
}

impl From<(f64, f64)> for RunInterval {
    fn from((begin, end): (f64, f64)) -> Self {
        Self::new(begin, end)
    }
}

impl std::fmt::Display for RunInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.begin, self.end)
    }
}
