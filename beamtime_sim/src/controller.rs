//! Run lifecycle controller.
//!
//! Sits between the engine's "give me the next primary" callback and the
//! scheduler, and drives the engine's run protocol across the interval table.
//!
//! ```text
//!            start()                 no candidate / clock at interval end
//!   Idle ─────────────► RunActive ───────────────────────► RunEnding
//!                          ▲                                   │
//!                          │   more intervals: jump the gap     │
//!                          └───────────────────────────────────┤
//!                                                              │ last interval
//!                                                              ▼
//!                                                            Ended
//! ```
//!
//! Any error moves the controller to `Aborted`; there is no recovery.

use crate::error::SimError;
use beamtime_core::{EventScheduler, ScheduledEvent, SimulationStatistics};
use beamtime_env::{EngineError, RunInterval, TransportEngine, MAX_PRIMARIES_PER_RUN};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

/// Lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    RunActive,
    /// Only held while a run is being torn down; never observed between requests
    RunEnding,
    Ended,
    Aborted,
}

/// What a primary request produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PrimaryOutcome {
    /// A primary was handed to the engine
    Generated(ScheduledEvent),
    
    /// The run for `interval_index` closed; `next_interval` is open if `Some`
    RunEnded {
        interval_index: usize,
        next_interval: Option<usize>,
    },
    
    /// The simulation is over
    SimulationEnded,
}

/// One emission with the run it belongs to, for export.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmissionRecord {
    pub run: usize,
    pub time: f64,
    pub source: usize,
    pub event_id: u64,
}

/// Drives one worker's scheduler through every run interval.
pub struct RunLifecycleController<R: Rng> {
    scheduler: EventScheduler<R>,
    state: ControllerState,
    statistics: SimulationStatistics,
    
    /// Emission log, only kept when requested
    log: Option<Vec<EmissionRecord>>,
}

impl<R: Rng> RunLifecycleController<R> {
    /// Wraps a scheduler that has not opened any interval yet.
    pub fn new(scheduler: EventScheduler<R>) -> Self {
        let names = scheduler.sources().iter().map(|s| s.name().to_string()).collect();
        Self {
            scheduler,
            state: ControllerState::Idle,
            statistics: SimulationStatistics::new(names),
            log: None,
        }
    }
    
    /// Keeps every emission in memory for [`RunLifecycleController::emissions`].
    pub fn with_emission_log(mut self) -> Self {
        self.log = Some(Vec::new());
        self
    }
    
    pub fn state(&self) -> ControllerState {
        self.state
    }
    
    pub fn scheduler(&self) -> &EventScheduler<R> {
        &self.scheduler
    }
    
    pub fn statistics(&self) -> &SimulationStatistics {
        &self.statistics
    }
    
    /// Recorded emissions; empty unless the log was enabled.
    pub fn emissions(&self) -> &[EmissionRecord] {
        self.log.as_deref().unwrap_or(&[])
    }
    
    /// Opens the first run.
    pub fn start<E: TransportEngine>(&mut self, engine: &mut E) -> Result<(), SimError> {
        if self.state != ControllerState::Idle {
            return Err(SimError::Aborted);
        }
        let result = self.open_run(engine, 0).map(|_| ());
        self.guard(result)
    }
    
    /// Handles one "generate next primary" request from the engine.
    pub fn on_primary_request<E: TransportEngine>(&mut self, engine: &mut E) -> Result<PrimaryOutcome, SimError> {
        let result = match self.state {
            ControllerState::Idle => self
                .open_run(engine, 0)
                .and_then(|_| self.step(engine)),
            ControllerState::RunActive => self.step(engine),
            ControllerState::Ended => Ok(PrimaryOutcome::SimulationEnded),
            // end_run leaves RunEnding before returning, or the guard aborts
            ControllerState::RunEnding | ControllerState::Aborted => Err(SimError::Aborted),
        };
        self.guard(result)
    }
    
    /// Answers primary requests until the simulation ends.
    pub fn run_to_completion<E: TransportEngine>(&mut self, engine: &mut E) -> Result<&SimulationStatistics, SimError> {
        while self.on_primary_request(engine)? != PrimaryOutcome::SimulationEnded {}
        Ok(&self.statistics)
    }
    
    /// Consumes the controller, keeping its results.
    pub fn into_results(self) -> (SimulationStatistics, Vec<EmissionRecord>) {
        (self.statistics, self.log.unwrap_or_default())
    }
    
    fn guard<T>(&mut self, result: Result<T, SimError>) -> Result<T, SimError> {
        if let Err(err) = &result {
            if !matches!(err, SimError::Aborted) {
                error!("simulation aborted: {}", err);
            }
            self.state = ControllerState::Aborted;
        }
        result
    }
    
    fn step<E: TransportEngine>(&mut self, engine: &mut E) -> Result<PrimaryOutcome, SimError> {
        if self.scheduler.is_run_exhausted() {
            return self.end_run(engine);
        }
        let Some(event) = self.scheduler.next_event_info()? else {
            return self.end_run(engine);
        };
        
        engine
            .generate_primary(event.source, event.time)
            .map_err(|source| SimError::Engine {
                snapshot: self.scheduler.snapshot(Some(event.source)),
                source,
            })?;
        
        self.statistics.record_event(&event);
        if let Some(log) = &mut self.log {
            log.push(EmissionRecord {
                run: self.scheduler.interval_index(),
                time: event.time,
                source: event.source.index(),
                event_id: event.event_id,
            });
        }
        Ok(PrimaryOutcome::Generated(event))
    }
    
    fn open_run<E: TransportEngine>(&mut self, engine: &mut E, index: usize) -> Result<RunInterval, SimError> {
        let interval = self.scheduler.begin_interval(index)?;
        engine
            .begin_run(MAX_PRIMARIES_PER_RUN, interval)
            .map_err(|source| SimError::Engine {
                snapshot: self.scheduler.snapshot(None),
                source,
            })?;
        self.statistics.record_run_start(index, interval);
        self.state = ControllerState::RunActive;
        info!("run {} started on {}", index, interval);
        Ok(interval)
    }
    
    fn end_run<E: TransportEngine>(&mut self, engine: &mut E) -> Result<PrimaryOutcome, SimError> {
        self.state = ControllerState::RunEnding;
        let index = self.scheduler.interval_index();
        
        // Abort the in-flight event: it completes, nothing new starts
        engine.end_run(false).map_err(|err| match err {
            EngineError::PrimariesInFlight(in_flight) => SimError::RunTermination {
                in_flight,
                snapshot: self.scheduler.snapshot(None),
            },
            source => SimError::Engine {
                snapshot: self.scheduler.snapshot(None),
                source,
            },
        })?;
        
        let events = self.statistics.runs.last().map_or(0, |run| run.events);
        info!(
            "run {} ended at t={} with {} events",
            index,
            self.scheduler.current_time(),
            events
        );
        
        let next = index + 1;
        if next < self.scheduler.table().len() {
            debug!("advancing to interval {}", next);
            self.open_run(engine, next)?;
            return Ok(PrimaryOutcome::RunEnded {
                interval_index: index,
                next_interval: Some(next),
            });
        }
        
        self.finish(engine)?;
        Ok(PrimaryOutcome::RunEnded {
            interval_index: index,
            next_interval: None,
        })
    }
    
    fn finish<E: TransportEngine>(&mut self, engine: &E) -> Result<(), SimError> {
        if !engine.confirm_no_primaries_in_flight() {
            return Err(SimError::PrimariesInFlightAtEnd {
                snapshot: self.scheduler.snapshot(None),
            });
        }
        self.statistics.final_time = self.scheduler.current_time();
        self.state = ControllerState::Ended;
        info!(
            "simulation ended: {} runs, {} events, t={}",
            self.statistics.run_count(),
            self.statistics.total_events,
            self.statistics.final_time
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beamtime_core::{RunIntervalTable, SourceConfig};
    use beamtime_env::{RecordingEngine, SourceHandle};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::sync::Arc;
    
    fn controller(pairs: &[(f64, f64)], configs: &[SourceConfig]) -> RunLifecycleController<ChaCha8Rng> {
        let table = Arc::new(RunIntervalTable::from_pairs(pairs).unwrap());
        let scheduler = EventScheduler::from_configs(table, configs, 0, 1, ChaCha8Rng::seed_from_u64(42)).unwrap();
        RunLifecycleController::new(scheduler).with_emission_log()
    }
    
    /// Engine that loses track of a primary right at teardown.
    struct LeakyEngine(RecordingEngine);
    
    impl TransportEngine for LeakyEngine {
        fn begin_run(&mut self, max_primaries: u64, interval: RunInterval) -> Result<(), EngineError> {
            self.0.begin_run(max_primaries, interval)
        }
        fn generate_primary(&mut self, source: SourceHandle, event_time: f64) -> Result<(), EngineError> {
            self.0.generate_primary(source, event_time)
        }
        fn end_run(&mut self, graceful: bool) -> Result<(), EngineError> {
            self.0.end_run(graceful)
        }
        fn confirm_no_primaries_in_flight(&self) -> bool {
            false
        }
    }
    
    #[test]
    fn test_gapped_table_runs_once_per_interval() {
        let mut ctrl = controller(
            &[(0.0, 10.0), (10.0, 20.0), (30.0, 50.0)],
            &[SourceConfig::constant("beam", 1.0)],
        );
        let mut engine = RecordingEngine::new();
        let stats = ctrl.run_to_completion(&mut engine).unwrap().clone();
        
        assert_eq!(ctrl.state(), ControllerState::Ended);
        assert_eq!(engine.runs().len(), 3);
        assert!(engine.runs().iter().all(|r| r.max_primaries == MAX_PRIMARIES_PER_RUN));
        assert!(engine.runs().iter().all(|r| r.ended_gracefully == Some(false)));
        assert_eq!(stats.total_events as usize, engine.primaries().len());
        assert!(engine.primaries().iter().all(|p| !(p.time > 20.0 && p.time < 30.0)));
        assert!(engine.confirm_no_primaries_in_flight());
        
        // Every primary lands in the run whose interval contains it
        for primary in engine.primaries() {
            assert!(engine.runs()[primary.run].interval.contains(primary.time));
        }
    }
    
    #[test]
    fn test_run_ends_when_sources_are_exhausted() {
        let mut ctrl = controller(
            &[(0.0, 10.0)],
            &[
                SourceConfig::fixed_count("a", 3).with_start_time(3.0),
                SourceConfig::fixed_count("b", 2).with_start_time(3.0),
            ],
        );
        let mut engine = RecordingEngine::new();
        let stats = ctrl.run_to_completion(&mut engine).unwrap().clone();
        
        assert_eq!(stats.total_events, 5);
        assert_eq!(stats.final_time, 3.0);
        assert_eq!(stats.runs[0].last_event_time, Some(3.0));
        assert_eq!(ctrl.scheduler().current_time(), 3.0);
    }
    
    #[test]
    fn test_outcome_sequence() {
        let mut ctrl = controller(&[(0.0, 1.0), (2.0, 3.0)], &[SourceConfig::fixed_count("a", 1)]);
        let mut engine = RecordingEngine::new();
        
        assert_eq!(ctrl.state(), ControllerState::Idle);
        assert!(matches!(ctrl.on_primary_request(&mut engine).unwrap(), PrimaryOutcome::Generated(_)));
        assert_eq!(
            ctrl.on_primary_request(&mut engine).unwrap(),
            PrimaryOutcome::RunEnded { interval_index: 0, next_interval: Some(1) }
        );
        assert_eq!(ctrl.state(), ControllerState::RunActive);
        assert_eq!(ctrl.scheduler().current_time(), 2.0);
        assert_eq!(
            ctrl.on_primary_request(&mut engine).unwrap(),
            PrimaryOutcome::RunEnded { interval_index: 1, next_interval: None }
        );
        assert_eq!(ctrl.on_primary_request(&mut engine).unwrap(), PrimaryOutcome::SimulationEnded);
        assert_eq!(ctrl.on_primary_request(&mut engine).unwrap(), PrimaryOutcome::SimulationEnded);
        assert_eq!(engine.runs().len(), 2);
    }
    
    #[test]
    fn test_run_ending_is_never_left_behind() {
        let mut ctrl = controller(
            &[(0.0, 1.0), (2.0, 3.0), (5.0, 6.0)],
            &[SourceConfig::constant("a", 4.0), SourceConfig::fixed_count("b", 3)],
        );
        let mut engine = RecordingEngine::new();
        
        loop {
            let outcome = ctrl.on_primary_request(&mut engine).unwrap();
            assert_ne!(ctrl.state(), ControllerState::RunEnding);
            if outcome == PrimaryOutcome::SimulationEnded {
                break;
            }
        }
        assert_eq!(ctrl.state(), ControllerState::Ended);
        
        // A teardown that fails part-way leaves Aborted, not RunEnding
        let mut ctrl = controller(&[(0.0, 1.0)], &[SourceConfig::fixed_count("a", 1)]);
        let mut engine = RecordingEngine::new();
        ctrl.on_primary_request(&mut engine).unwrap();
        engine.inject_stuck_primaries(1);
        assert!(ctrl.on_primary_request(&mut engine).is_err());
        assert_eq!(ctrl.state(), ControllerState::Aborted);
    }
    
    #[test]
    fn test_stuck_primary_aborts_simulation() {
        let mut ctrl = controller(&[(0.0, 1.0), (2.0, 3.0)], &[SourceConfig::fixed_count("a", 1)]);
        let mut engine = RecordingEngine::new();
        ctrl.start(&mut engine).unwrap();
        ctrl.on_primary_request(&mut engine).unwrap();
        engine.inject_stuck_primaries(1);
        
        let err = ctrl.on_primary_request(&mut engine).unwrap_err();
        assert!(matches!(err, SimError::RunTermination { in_flight: 1, .. }));
        assert_eq!(err.snapshot().unwrap().interval_index, 0);
        assert_eq!(ctrl.state(), ControllerState::Aborted);
        assert!(matches!(ctrl.on_primary_request(&mut engine), Err(SimError::Aborted)));
        // The second interval never started
        assert_eq!(engine.runs().len(), 1);
    }
    
    #[test]
    fn test_teardown_check_failure_is_fatal() {
        let mut ctrl = controller(&[(0.0, 1.0)], &[SourceConfig::fixed_count("a", 2)]);
        let mut engine = LeakyEngine(RecordingEngine::new());
        
        let err = ctrl.run_to_completion(&mut engine).unwrap_err();
        assert!(matches!(err, SimError::PrimariesInFlightAtEnd { .. }));
        assert_eq!(ctrl.state(), ControllerState::Aborted);
    }
    
    #[test]
    fn test_engine_refusal_carries_context() {
        let mut ctrl = controller(&[(0.0, 1.0)], &[SourceConfig::fixed_count("a", 2)]);
        let mut engine = RecordingEngine::new();
        // A run opened behind the controller's back
        engine.begin_run(1, RunInterval::new(0.0, 1.0)).unwrap();
        
        let err = ctrl.start(&mut engine).unwrap_err();
        assert!(matches!(
            err,
            SimError::Engine { source: EngineError::RunAlreadyOpen(0), .. }
        ));
        assert!(err.to_string().contains("interval=0"));
    }
    
    #[test]
    fn test_emission_log_matches_engine() {
        let mut ctrl = controller(
            &[(0.0, 5.0), (6.0, 9.0)],
            &[SourceConfig::constant("a", 2.0), SourceConfig::fixed_count("b", 3).with_start_time(5.5)],
        );
        let mut engine = RecordingEngine::new();
        ctrl.run_to_completion(&mut engine).unwrap();
        
        let log = ctrl.emissions();
        assert_eq!(log.len(), engine.primaries().len());
        for (record, primary) in log.iter().zip(engine.primaries()) {
            assert_eq!(record.time, primary.time);
            assert_eq!(record.source, primary.source.index());
            assert_eq!(record.run, primary.run);
        }
        assert_eq!(engine.count_for(SourceHandle(1)), 3);
        assert!(log.iter().filter(|r| r.source == 1).all(|r| r.time == 6.0));
    }
}
