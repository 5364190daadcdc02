//! Simulation configuration, read from JSON.

use crate::error::SimError;
use beamtime_core::{ConfigError, RunIntervalTable, Source, SourceActivityModel, SourceConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

fn default_seed() -> u64 {
    42
}

fn default_workers() -> usize {
    1
}

fn default_intervals() -> Vec<(f64, f64)> {
    vec![(0.0, 1.0)]
}

/// Everything a simulation needs before the first run starts.
///
/// ```json
/// { "seed": 42, "workers": 4,
///   "intervals": [[0, 10], [10, 20], [30, 50]],
///   "sources": [{ "name": "beam", "activity": 1.0 }] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Master seed; every worker stream derives from it
    #[serde(default = "default_seed")]
    pub seed: u64,
    
    /// Number of parallel replicas
    #[serde(default = "default_workers")]
    pub workers: usize,
    
    /// Run intervals as `[begin, end]` pairs, seconds
    #[serde(default = "default_intervals")]
    pub intervals: Vec<(f64, f64)>,
    
    pub sources: Vec<SourceConfig>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            workers: default_workers(),
            intervals: default_intervals(),
            sources: Vec::new(),
        }
    }
}

impl SimulationConfig {
    /// Creates a single-worker configuration.
    pub fn new(intervals: Vec<(f64, f64)>, sources: Vec<SourceConfig>) -> Self {
        Self {
            intervals,
            sources,
            ..Default::default()
        }
    }
    
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
    
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }
    
    /// Parses a configuration from JSON text.
    pub fn from_json(json: &str) -> Result<Self, SimError> {
        Ok(serde_json::from_str(json)?)
    }
    
    /// Reads a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
    
    /// Checks the whole configuration and returns the shared interval table.
    ///
    /// Every check that can fail is done here, before any worker exists.
    pub fn validate(&self) -> Result<Arc<RunIntervalTable>, ConfigError> {
        let table = RunIntervalTable::from_pairs(&self.intervals)?;
        
        if self.workers == 0 {
            return Err(ConfigError::InvalidWorker { worker: 0, workers: 0 });
        }
        if self.sources.is_empty() {
            return Err(ConfigError::NoSources);
        }
        
        let mut names = HashSet::new();
        for source in &self.sources {
            if !names.insert(source.name.as_str()) {
                return Err(ConfigError::DuplicateSourceName { source_name: source.name.clone() });
            }
            Source::from_config(source, &table)?;
        }
        
        Ok(Arc::new(table))
    }
    
    /// Expected number of emissions per source over the whole simulation,
    /// all workers together.
    pub fn expected_events(&self) -> Result<Vec<(String, f64)>, ConfigError> {
        let table = RunIntervalTable::from_pairs(&self.intervals)?;
        self.sources
            .iter()
            .map(|config| {
                let source = Source::from_config(config, &table)?;
                if let SourceActivityModel::FixedCount { total } = source.model() {
                    return Ok((config.name.clone(), *total as f64));
                }
                let expected = table
                    .iter()
                    .map(|interval| {
                        let from = interval.begin.max(source.start_time());
                        let to = interval.end.min(source.end_time());
                        source.model().expected_events(from, to, source.start_time(), 0)
                    })
                    .fold(0.0, |acc, e| acc + e);
                Ok((config.name.clone(), expected))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_parses_json_with_defaults() {
        let config = SimulationConfig::from_json(
            r#"{
                "intervals": [[0, 10], [10, 20], [30, 50]],
                "sources": [
                    {"name": "beam", "activity": 1.0},
                    {"name": "seed", "particle": "e-", "n": 5, "start_time": 5.0},
                    {"name": "ion", "activity": 100.0, "half_life": 3.0}
                ]
            }"#,
        ).unwrap();
        
        assert_eq!(config.seed, 42);
        assert_eq!(config.workers, 1);
        assert_eq!(config.intervals.len(), 3);
        assert_eq!(config.sources[0].particle, "gamma");
        assert_eq!(config.sources[1].n, Some(5));
        assert_eq!(config.sources[2].half_life, Some(3.0));
        assert!(config.validate().is_ok());
    }
    
    #[test]
    fn test_missing_intervals_default_to_one_second() {
        let config = SimulationConfig::from_json(r#"{"sources": [{"name": "a", "n": 1}]}"#).unwrap();
        assert_eq!(config.intervals, vec![(0.0, 1.0)]);
    }
    
    #[test]
    fn test_validation_rejects_bad_configs() {
        let config = SimulationConfig::new(vec![(0.0, 10.0), (5.0, 20.0)], vec![SourceConfig::constant("a", 1.0)]);
        assert!(matches!(config.validate(), Err(ConfigError::OverlappingIntervals { .. })));
        
        let config = SimulationConfig::new(vec![(0.0, 10.0)], vec![]);
        assert_eq!(config.validate().unwrap_err(), ConfigError::NoSources);
        
        let config = SimulationConfig::new(vec![(0.0, 10.0)], vec![SourceConfig::constant("a", 1.0)]).with_workers(0);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidWorker { .. })));
        
        let config = SimulationConfig::new(
            vec![(0.0, 10.0)],
            vec![SourceConfig::constant("a", 1.0), SourceConfig::fixed_count("a", 2)],
        );
        assert!(matches!(config.validate(), Err(ConfigError::DuplicateSourceName { .. })));
    }
    
    #[test]
    fn test_validation_is_repeatable() {
        let config = SimulationConfig::new(vec![(5.0, 1.0)], vec![SourceConfig::constant("a", 1.0)]);
        let first = config.validate().unwrap_err().to_string();
        let second = config.validate().unwrap_err().to_string();
        assert_eq!(first, second);
    }
    
    #[test]
    fn test_expected_events_skip_gaps() {
        let config = SimulationConfig::new(
            vec![(0.0, 10.0), (10.0, 20.0), (30.0, 50.0)],
            vec![
                SourceConfig::constant("beam", 1.0),
                SourceConfig::fixed_count("seed", 5),
                SourceConfig::constant("late", 2.0).with_start_time(40.0),
            ],
        );
        let expected = config.expected_events().unwrap();
        
        assert_eq!(expected[0], ("beam".to_string(), 40.0));
        assert_eq!(expected[2], ("late".to_string(), 20.0));
        assert_eq!(expected[1], ("seed".to_string(), 5.0));
    }
    
    #[test]
    fn test_round_trips_through_file() {
        let config = SimulationConfig::new(vec![(0.0, 2.0)], vec![SourceConfig::decaying("ion", 5.0, 1.0)])
            .with_seed(7)
            .with_workers(3);
        let path = std::env::temp_dir().join(format!("beamtime_config_{}.json", std::process::id()));
        std::fs::write(&path, serde_json::to_string(&config).unwrap()).unwrap();
        
        let loaded = SimulationConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, config);
    }
    
    #[test]
    fn test_demo_config_is_valid() {
        let config = SimulationConfig::from_json(include_str!("../../demos/gapped_beam.json")).unwrap();
        assert_eq!(config.workers, 4);
        assert_eq!(config.sources.len(), 3);
        let table = config.validate().unwrap();
        assert_eq!(table.len(), 3);
    }
}
