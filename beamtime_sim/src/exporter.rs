//! JSON exporter for offline inspection of a simulation.
//!
//! Writes the emitted event stream of every worker plus the summed counters.

use crate::config::SimulationConfig;
use crate::replica::SimulationReport;
use beamtime_core::SimulationStatistics;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;

/// One emission, flattened for export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmissionRow {
    pub worker: usize,
    pub run: usize,
    pub time: f64,
    pub source: String,
    pub event_id: u64,
}

/// Complete simulation export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Scenario or configuration name
    pub label: String,
    
    /// Master seed
    pub seed: u64,
    
    pub workers: usize,
    
    /// Run intervals as configured
    pub intervals: Vec<(f64, f64)>,
    
    /// All emissions, worker by worker, each in emission order
    pub emissions: Vec<EmissionRow>,
    
    /// Counters summed over workers
    pub total: SimulationStatistics,
    
    /// Scenario verdict, when the export comes from a scenario
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passed: Option<bool>,
}

impl SimExport {
    /// Builds the export from a finished simulation.
    pub fn from_report(label: &str, config: &SimulationConfig, report: &SimulationReport) -> Self {
        let source_name = |index: usize| {
            config
                .sources
                .get(index)
                .map(|s| s.name.clone())
                .unwrap_or_else(|| format!("#{}", index))
        };
        
        let emissions = report
            .workers
            .iter()
            .flat_map(|worker| {
                worker.emissions.iter().map(move |e| (worker.worker, *e))
            })
            .map(|(worker, e)| EmissionRow {
                worker,
                run: e.run,
                time: e.time,
                source: source_name(e.source),
                event_id: e.event_id,
            })
            .collect();
        
        Self {
            label: label.to_string(),
            seed: report.seed,
            workers: report.workers.len(),
            intervals: config.intervals.clone(),
            emissions,
            total: report.total.clone(),
            passed: None,
        }
    }
    
    /// Records the scenario verdict.
    pub fn finalize(&mut self, passed: bool) {
        self.passed = Some(passed);
    }
    
    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
