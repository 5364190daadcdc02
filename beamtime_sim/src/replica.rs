//! Per-worker replicas and the drivers that run them.
//!
//! Each worker owns a complete, independent copy of the simulation state:
//! its own sources (activity scaled by 1/N, fixed counts split), its own
//! random stream, its own scheduler and controller, its own engine. The
//! only thing workers share is the read-only configuration and interval
//! table, behind an `Arc`.

use crate::config::SimulationConfig;
use crate::controller::{EmissionRecord, RunLifecycleController};
use crate::error::SimError;
use crate::seeds::DeterministicSeedProvider;

use beamtime_core::{EventScheduler, RunIntervalTable, SimulationStatistics};
use beamtime_env::{RecordingEngine, TransportEngine};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Result of one worker.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerReport {
    pub worker: usize,
    pub seed: u64,
    pub statistics: SimulationStatistics,
    
    /// Empty unless the emission log was requested
    pub emissions: Vec<EmissionRecord>,
}

/// Result of a whole simulation.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub seed: u64,
    pub workers: Vec<WorkerReport>,
    
    /// Counters summed over all workers
    pub total: SimulationStatistics,
}

impl SimulationReport {
    fn from_workers(seed: u64, mut workers: Vec<WorkerReport>) -> Self {
        workers.sort_by_key(|w| w.worker);
        let mut total = SimulationStatistics::default();
        for worker in &workers {
            total.merge(&worker.statistics);
        }
        Self { seed, workers, total }
    }
}

/// One worker's scheduler + controller, ready to run.
pub struct WorkerReplica {
    worker: usize,
    seed: u64,
    controller: RunLifecycleController<ChaCha8Rng>,
}

impl WorkerReplica {
    /// Builds worker `worker` of `config.workers`.
    pub fn new(
        config: &SimulationConfig,
        table: Arc<RunIntervalTable>,
        worker: usize,
        record_emissions: bool,
    ) -> Result<Self, SimError> {
        let mut seeds = DeterministicSeedProvider::new(config.seed);
        let seed = seeds.worker_seed(worker);
        let rng = seeds.worker_rng(worker);
        
        let scheduler = EventScheduler::from_configs(table, &config.sources, worker, config.workers, rng)?;
        let mut controller = RunLifecycleController::new(scheduler);
        if record_emissions {
            controller = controller.with_emission_log();
        }
        
        Ok(Self {
            worker,
            seed,
            controller,
        })
    }
    
    pub fn worker(&self) -> usize {
        self.worker
    }
    
    /// Drives the replica to the end against `engine`.
    pub fn run<E: TransportEngine>(mut self, engine: &mut E) -> Result<WorkerReport, SimError> {
        info!("worker {} starting (seed={})", self.worker, self.seed);
        self.controller.run_to_completion(engine)?;
        let (statistics, emissions) = self.controller.into_results();
        info!("worker {} finished: {} events", self.worker, statistics.total_events);
        
        Ok(WorkerReport {
            worker: self.worker,
            seed: self.seed,
            statistics,
            emissions,
        })
    }
}

/// Runs every worker one after the other on the calling thread.
pub fn run_sequential(config: &SimulationConfig, record_emissions: bool) -> Result<SimulationReport, SimError> {
    let table = config.validate()?;
    let reports = (0..config.workers)
        .map(|worker| {
            let mut engine = RecordingEngine::new();
            WorkerReplica::new(config, table.clone(), worker, record_emissions)?.run(&mut engine)
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(SimulationReport::from_workers(config.seed, reports))
}

/// Runs every worker on its own blocking task against a [`RecordingEngine`].
pub async fn run_parallel(config: Arc<SimulationConfig>, record_emissions: bool) -> Result<SimulationReport, SimError> {
    run_parallel_with(config, record_emissions, |_| RecordingEngine::new()).await
}

/// Runs every worker on its own blocking task, with an engine from `make_engine`.
///
/// The first failing worker's error is returned; there is no partial result.
pub async fn run_parallel_with<E, F>(
    config: Arc<SimulationConfig>,
    record_emissions: bool,
    make_engine: F,
) -> Result<SimulationReport, SimError>
where
    E: TransportEngine,
    F: Fn(usize) -> E + Send + Sync + 'static,
{
    let table = config.validate()?;
    let make_engine = Arc::new(make_engine);
    
    let mut handles = Vec::with_capacity(config.workers);
    for worker in 0..config.workers {
        let config = Arc::clone(&config);
        let table = Arc::clone(&table);
        let make_engine = Arc::clone(&make_engine);
        handles.push(tokio::task::spawn_blocking(move || {
            let mut engine = make_engine(worker);
            WorkerReplica::new(&config, table, worker, record_emissions)?.run(&mut engine)
        }));
    }
    
    let mut reports = Vec::with_capacity(handles.len());
    for (worker, handle) in handles.into_iter().enumerate() {
        let report = handle.await.map_err(|e| SimError::Worker {
            worker,
            message: e.to_string(),
        })??;
        reports.push(report);
    }
    
    Ok(SimulationReport::from_workers(config.seed, reports))
}

#[cfg(test)]
mod tests {
    use super::*;
    use beamtime_core::SourceConfig;
    use proptest::prelude::*;
    
    fn config(workers: usize) -> SimulationConfig {
        SimulationConfig::new(
            vec![(0.0, 10.0), (10.0, 20.0), (30.0, 50.0)],
            vec![
                SourceConfig::constant("beam", 50.0),
                SourceConfig::fixed_count("seed", 11).with_start_time(5.0),
                SourceConfig::decaying("ion", 40.0, 8.0),
            ],
        )
        .with_seed(1234)
        .with_workers(workers)
    }
    
    #[test]
    fn test_fixed_counts_split_exactly_across_workers() {
        let report = run_sequential(&config(4), false).unwrap();
        
        assert_eq!(report.workers.len(), 4);
        assert_eq!(report.total.events_for("seed"), Some(11));
        let shares: Vec<u64> = report
            .workers
            .iter()
            .map(|w| w.statistics.events_for("seed").unwrap())
            .collect();
        assert_eq!(shares, vec![3, 3, 3, 2]);
    }
    
    #[test]
    fn test_aggregate_rate_matches_configured_activity() {
        let single = run_sequential(&config(1), false).unwrap();
        let split = run_sequential(&config(4), false).unwrap();
        
        // 50 Bq over 40 s of live time: 2000 expected either way
        let one = single.total.events_for("beam").unwrap() as f64;
        let four = split.total.events_for("beam").unwrap() as f64;
        assert!((one - 2000.0).abs() < 200.0, "single worker: {}", one);
        assert!((four - 2000.0).abs() < 200.0, "four workers: {}", four);
    }
    
    #[test]
    fn test_workers_use_distinct_streams() {
        let report = run_sequential(&config(2), true).unwrap();
        let first: Vec<f64> = report.workers[0].emissions.iter().map(|e| e.time).collect();
        let second: Vec<f64> = report.workers[1].emissions.iter().map(|e| e.time).collect();
        assert_ne!(first, second);
        assert_ne!(report.workers[0].seed, report.workers[1].seed);
    }
    
    #[test]
    fn test_invalid_config_fails_before_any_worker() {
        let bad = SimulationConfig::new(vec![(0.0, 1.0)], vec![SourceConfig::fixed_count("a", 0)]);
        assert!(matches!(run_sequential(&bad, false), Err(SimError::Config(_))));
    }
    
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_parallel_matches_sequential() {
        let config = config(3);
        let sequential = run_sequential(&config, true).unwrap();
        let parallel = run_parallel(Arc::new(config), true).await.unwrap();
        
        assert_eq!(parallel.total, sequential.total);
        for (p, s) in parallel.workers.iter().zip(&sequential.workers) {
            assert_eq!(p.worker, s.worker);
            assert_eq!(p.emissions, s.emissions);
        }
    }
    
    #[tokio::test]
    async fn test_parallel_surfaces_worker_failure() {
        let config = Arc::new(config(2));
        let result = run_parallel_with(config, false, |worker| {
            let mut engine = RecordingEngine::new();
            if worker == 1 {
                engine.inject_stuck_primaries(1);
            }
            engine
        })
        .await;
        
        assert!(matches!(result, Err(SimError::RunTermination { .. })));
    }
    
    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]
        
        #[test]
        fn prop_fixed_count_survives_any_split(n in 1u64..200, workers in 1usize..9, seed in any::<u64>()) {
            let config = SimulationConfig::new(
                vec![(0.0, 1.0), (2.0, 3.0)],
                vec![SourceConfig::fixed_count("seed", n), SourceConfig::constant("beam", 5.0)],
            )
            .with_seed(seed)
            .with_workers(workers);
            
            let report = run_sequential(&config, false).unwrap();
            prop_assert_eq!(report.total.events_for("seed"), Some(n));
            prop_assert_eq!(report.workers.len(), workers);
        }
    }
}
