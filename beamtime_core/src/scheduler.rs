//! The event scheduler.
//!
//! Each time the engine wants a primary, [`EventScheduler::next_event_info`]
//! scans every live source and picks the single next `(time, source)` pair.
//!
//! # Selection Order
//!
//! ```text
//! candidate (t, id, k) beats best (t*, id*, k*) iff
//!     t < t*                     earlier emission
//!  or t == t* and id < id*       lower per-source sequence id
//! ```
//!
//! Sources are scanned in arena order and only a strictly better candidate
//! replaces the current best, so a full tie goes to the lowest source index.
//! The result is independent of anything but the seed and the configuration.

use crate::activity::EventInfo;
use crate::error::{ConfigError, ScheduleError, ScheduleSnapshot};
use crate::intervals::RunIntervalTable;
use crate::source::{Source, SourceConfig};
use beamtime_env::{RunInterval, SourceHandle};
use rand::Rng;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, trace};

/// One committed emission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledEvent {
    pub time: f64,
    pub source: SourceHandle,
    pub event_id: u64,
}

impl ScheduledEvent {
    /// Total-order key of the emission.
    pub fn key(&self) -> (f64, u64, usize) {
        (self.time, self.event_id, self.source.index())
    }
}

/// Per-worker scheduling state and selection algorithm.
///
/// Owns its sources and random stream outright. Only the interval table is
/// shared, read-only, between workers.
pub struct EventScheduler<R: Rng> {
    /// Shared, immutable run intervals
    table: Arc<RunIntervalTable>,
    
    /// Source arena, indexed by `SourceHandle`
    sources: Vec<Source>,
    
    /// This worker's random stream
    rng: R,
    
    /// Simulated clock (seconds), never decreases
    current_time: f64,
    
    /// Interval the clock is currently in
    interval_index: usize,
    interval: RunInterval,
    
    /// Key of the last committed event
    last_key: Option<(f64, u64, usize)>,
}

impl<R: Rng> EventScheduler<R> {
    /// Creates a scheduler positioned at the start of the first interval.
    ///
    /// The first interval is not opened yet; call
    /// [`EventScheduler::begin_interval`] with index 0.
    pub fn new(table: Arc<RunIntervalTable>, sources: Vec<Source>, rng: R) -> Result<Self, ConfigError> {
        if sources.is_empty() {
            return Err(ConfigError::NoSources);
        }
        let current_time = table.first_begin();
        let interval = RunInterval::new(table.first_begin(), table.first_begin());
        Ok(Self {
            table,
            sources,
            rng,
            current_time,
            interval_index: 0,
            interval,
            last_key: None,
        })
    }
    
    /// Builds every source of `configs` for one worker and creates the scheduler.
    pub fn from_configs(
        table: Arc<RunIntervalTable>,
        configs: &[SourceConfig],
        worker: usize,
        workers: usize,
        rng: R,
    ) -> Result<Self, ConfigError> {
        let mut names = HashSet::new();
        let mut sources = Vec::with_capacity(configs.len());
        for config in configs {
            if !names.insert(config.name.as_str()) {
                return Err(ConfigError::DuplicateSourceName { source_name: config.name.clone() });
            }
            sources.push(Source::for_worker(config, &table, worker, workers)?);
        }
        Self::new(table, sources, rng)
    }
    
    pub fn current_time(&self) -> f64 {
        self.current_time
    }
    
    pub fn interval_index(&self) -> usize {
        self.interval_index
    }
    
    /// The open interval; empty until the first one is opened.
    pub fn current_interval(&self) -> RunInterval {
        self.interval
    }
    
    pub fn table(&self) -> &Arc<RunIntervalTable> {
        &self.table
    }
    
    pub fn sources(&self) -> &[Source] {
        &self.sources
    }
    
    pub fn source(&self, handle: SourceHandle) -> Option<&Source> {
        self.sources.get(handle.index())
    }
    
    /// Handles of all sources, in arena order.
    pub fn handles(&self) -> impl Iterator<Item = SourceHandle> {
        (0..self.sources.len()).map(SourceHandle)
    }
    
    /// True when no source will ever emit again.
    pub fn all_terminated(&self) -> bool {
        self.sources.iter().all(|s| s.is_terminated(self.current_time))
    }
    
    /// True when the open run cannot produce anything more.
    pub fn is_run_exhausted(&self) -> bool {
        self.current_time >= self.current_interval().end || self.all_terminated()
    }
    
    /// Captures the scheduler state for a diagnostic.
    pub fn snapshot(&self, source: Option<SourceHandle>) -> ScheduleSnapshot {
        ScheduleSnapshot {
            current_time: self.current_time,
            interval_index: self.interval_index,
            interval: self.current_interval(),
            source: source.and_then(|h| self.source(h).map(|s| (h, s.name().to_string()))),
        }
    }
    
    /// Opens interval `index`: the clock jumps to its begin (skipping any
    /// gap) and every live source re-draws its candidate.
    pub fn begin_interval(&mut self, index: usize) -> Result<RunInterval, ScheduleError> {
        let interval = match self.table.get(index) {
            Some(interval) if index >= self.interval_index && interval.begin >= self.current_time => interval,
            _ => {
                return Err(ScheduleError::IntervalOutOfRange {
                    index,
                    snapshot: self.snapshot(None),
                })
            }
        };
        
        if interval.begin > self.current_time {
            debug!("clock jumps {} -> {}", self.current_time, interval.begin);
        }
        self.interval_index = index;
        self.interval = interval;
        self.current_time = interval.begin;
        
        let now = self.current_time;
        for source in &mut self.sources {
            if !source.is_terminated(now) {
                source.begin_interval(interval, now, &mut self.rng);
            }
        }
        Ok(interval)
    }
    
    /// Selects, commits and returns the next emission of the open interval.
    ///
    /// # Returns
    /// * `Ok(Some(event))` - The winner's event was consumed and the clock advanced
    /// * `Ok(None)` - No live source has anything left before the interval end
    /// * `Err(_)` - An invariant failed; the state must not be used further
    pub fn next_event_info(&mut self) -> Result<Option<ScheduledEvent>, ScheduleError> {
        let interval = self.current_interval();
        let now = self.current_time;
        
        let mut best = EventInfo {
            time: interval.end,
            event_id: u64::MAX,
        };
        let mut winner: Option<usize> = None;
        
        for (index, source) in self.sources.iter().enumerate() {
            if source.is_terminated(now) {
                continue;
            }
            let candidate = source.next_event_info(now);
            let better = candidate.time < best.time
                || (winner.is_some() && candidate.time == best.time && candidate.event_id < best.event_id);
            if better {
                best = candidate;
                winner = Some(index);
            }
        }
        
        let Some(index) = winner else {
            trace!("no candidate before {}", interval.end);
            return Ok(None);
        };
        let handle = SourceHandle(index);
        self.check_selection(handle, best)?;
        
        self.sources[index].consume_next_event(&mut self.rng);
        self.current_time = best.time;
        
        let event = ScheduledEvent {
            time: best.time,
            source: handle,
            event_id: best.event_id,
        };
        self.last_key = Some(event.key());
        trace!("t={} source={} id={}", event.time, handle, event.event_id);
        Ok(Some(event))
    }
    
    fn check_selection(&self, handle: SourceHandle, best: EventInfo) -> Result<(), ScheduleError> {
        let interval = self.current_interval();
        if best.time < self.current_time {
            return Err(ScheduleError::NegativeTimeDelta {
                time: best.time,
                snapshot: self.snapshot(Some(handle)),
            });
        }
        if !interval.contains(best.time) {
            return Err(ScheduleError::EventOutsideInterval {
                time: best.time,
                snapshot: self.snapshot(Some(handle)),
            });
        }
        if self.sources[handle.index()].is_terminated(self.current_time) {
            return Err(ScheduleError::TerminatedSourceSelected {
                snapshot: self.snapshot(Some(handle)),
            });
        }
        let key = (best.time, best.event_id, handle.index());
        if let Some(last) = self.last_key {
            if key <= last {
                return Err(ScheduleError::OrderingViolation {
                    time: best.time,
                    event_id: best.event_id,
                    snapshot: self.snapshot(Some(handle)),
                });
            }
        }
        Ok(())
    }
}
