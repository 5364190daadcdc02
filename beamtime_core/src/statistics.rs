//! Simulation statistics: what was emitted, when, and by whom.

use crate::scheduler::ScheduledEvent;
use beamtime_env::RunInterval;
use serde::{Deserialize, Serialize};

/// Counters for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStatistics {
    pub interval_index: usize,
    pub interval: RunInterval,
    pub events: u64,
    
    /// `None` for a run that emitted nothing
    pub first_event_time: Option<f64>,
    pub last_event_time: Option<f64>,
}

/// Counters for a whole simulation on one worker, or summed over workers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationStatistics {
    /// Source names, indexed like the scheduler's arena
    pub source_names: Vec<String>,
    
    /// Events per source
    pub events_per_source: Vec<u64>,
    
    /// One entry per run, in run order
    pub runs: Vec<RunStatistics>,
    
    pub total_events: u64,
    
    /// Clock value when the simulation ended
    pub final_time: f64,
}

impl SimulationStatistics {
    /// Creates empty counters for the given sources.
    pub fn new(source_names: Vec<String>) -> Self {
        let events_per_source = vec![0; source_names.len()];
        Self {
            source_names,
            events_per_source,
            ..Default::default()
        }
    }
    
    /// Starts counting a new run.
    pub fn record_run_start(&mut self, interval_index: usize, interval: RunInterval) {
        self.runs.push(RunStatistics {
            interval_index,
            interval,
            events: 0,
            first_event_time: None,
            last_event_time: None,
        });
    }
    
    /// Counts one emission against the current run.
    pub fn record_event(&mut self, event: &ScheduledEvent) {
        self.total_events += 1;
        if let Some(count) = self.events_per_source.get_mut(event.source.index()) {
            *count += 1;
        }
        if let Some(run) = self.runs.last_mut() {
            run.events += 1;
            run.first_event_time.get_or_insert(event.time);
            run.last_event_time = Some(event.time);
        }
    }
    
    /// Number of runs executed.
    pub fn run_count(&self) -> usize {
        self.runs.len()
    }
    
    /// Events emitted by the source called `name`.
    pub fn events_for(&self, name: &str) -> Option<u64> {
        self.source_names
            .iter()
            .position(|n| n == name)
            .map(|i| self.events_per_source[i])
    }
    
    /// Adds another worker's counters into these.
    ///
    /// Both sides must describe the same source list and interval table.
    pub fn merge(&mut self, other: &SimulationStatistics) {
        if self.source_names.is_empty() {
            *self = other.clone();
            return;
        }
        for (mine, theirs) in self.events_per_source.iter_mut().zip(&other.events_per_source) {
            *mine += theirs;
        }
        for (mine, theirs) in self.runs.iter_mut().zip(&other.runs) {
            mine.events += theirs.events;
            mine.first_event_time = min_opt(mine.first_event_time, theirs.first_event_time);
            mine.last_event_time = max_opt(mine.last_event_time, theirs.last_event_time);
        }
        self.total_events += other.total_events;
        self.final_time = self.final_time.max(other.final_time);
    }
}

fn min_opt(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

fn max_opt(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beamtime_env::SourceHandle;
    
    fn event(time: f64, source: usize) -> ScheduledEvent {
        ScheduledEvent {
            time,
            source: SourceHandle(source),
            event_id: 0,
        }
    }
    
    #[test]
    fn test_counts_per_run_and_source() {
        let mut stats = SimulationStatistics::new(vec!["a".into(), "b".into()]);
        stats.record_run_start(0, RunInterval::new(0.0, 1.0));
        stats.record_event(&event(0.2, 0));
        stats.record_event(&event(0.7, 1));
        stats.record_run_start(1, RunInterval::new(2.0, 3.0));
        
        assert_eq!(stats.total_events, 2);
        assert_eq!(stats.run_count(), 2);
        assert_eq!(stats.runs[0].first_event_time, Some(0.2));
        assert_eq!(stats.runs[0].last_event_time, Some(0.7));
        assert_eq!(stats.runs[1].events, 0);
        assert_eq!(stats.events_for("b"), Some(1));
        assert_eq!(stats.events_for("zzz"), None);
    }
    
    #[test]
    fn test_merge_sums_workers() {
        let mut a = SimulationStatistics::new(vec!["s".into()]);
        a.record_run_start(0, RunInterval::new(0.0, 1.0));
        a.record_event(&event(0.5, 0));
        a.final_time = 0.5;
        
        let mut b = SimulationStatistics::new(vec!["s".into()]);
        b.record_run_start(0, RunInterval::new(0.0, 1.0));
        b.record_event(&event(0.1, 0));
        b.record_event(&event(0.9, 0));
        b.final_time = 0.9;
        
        let mut total = SimulationStatistics::default();
        total.merge(&a);
        total.merge(&b);
        
        assert_eq!(total.total_events, 3);
        assert_eq!(total.events_per_source, vec![3]);
        assert_eq!(total.runs[0].first_event_time, Some(0.1));
        assert_eq!(total.runs[0].last_event_time, Some(0.9));
        assert_eq!(total.final_time, 0.9);
    }
}
