//! Named scheduling scenarios.

use crate::config::SimulationConfig;
use beamtime_core::SourceConfig;

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// SCH-001: constant source across touching and gapped intervals
    GapScan,
    
    /// SCH-002: two fixed-count sources with staggered start times
    StaggeredSources,
    
    /// SCH-003: all sources exhausted long before the interval ends
    EarlyExhaustion,
    
    /// SCH-004: half-life decaying source running dry
    DecayingSource,
    
    /// SCH-005: mixed sources split over parallel workers
    MultiWorker,
    
    /// SCH-006: a source with no emission law must be rejected
    NoEmissionLaw,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::GapScan,
            ScenarioId::StaggeredSources,
            ScenarioId::EarlyExhaustion,
            ScenarioId::DecayingSource,
            ScenarioId::MultiWorker,
            ScenarioId::NoEmissionLaw,
        ]
    }
    
    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::GapScan => "gap_scan",
            ScenarioId::StaggeredSources => "staggered_sources",
            ScenarioId::EarlyExhaustion => "early_exhaustion",
            ScenarioId::DecayingSource => "decaying_source",
            ScenarioId::MultiWorker => "multi_worker",
            ScenarioId::NoEmissionLaw => "no_emission_law",
        }
    }
    
    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::GapScan => "1 Bq over [0,10) [10,20) [30,50): ~40 events, none in the gap",
            ScenarioId::StaggeredSources => "n=5 at t=0 and n=5 at t=5 on [0,20): exactly 10 events",
            ScenarioId::EarlyExhaustion => "two fixed sources done at t=3 on [0,10): run ends at t=3",
            ScenarioId::DecayingSource => "1 kBq, 2 s half-life on [0,40): yield A0/λ, then silence",
            ScenarioId::MultiWorker => "fixed + constant + decaying sources over 4 workers",
            ScenarioId::NoEmissionLaw => "n=0 and activity=0 must fail at construction",
        }
    }
    
    /// Number of workers the scenario is designed for.
    pub fn workers(&self) -> usize {
        match self {
            ScenarioId::MultiWorker => 4,
            _ => 1,
        }
    }
    
    /// Builds the scenario's configuration.
    pub fn config(&self, seed: u64) -> SimulationConfig {
        let (intervals, sources) = match self {
            ScenarioId::GapScan => (
                vec![(0.0, 10.0), (10.0, 20.0), (30.0, 50.0)],
                vec![SourceConfig::constant("beam", 1.0)],
            ),
            ScenarioId::StaggeredSources => (
                vec![(0.0, 20.0)],
                vec![
                    SourceConfig::fixed_count("a", 5).with_start_time(0.0),
                    SourceConfig::fixed_count("b", 5).with_start_time(5.0),
                ],
            ),
            ScenarioId::EarlyExhaustion => (
                vec![(0.0, 10.0)],
                vec![
                    SourceConfig::fixed_count("a", 4).with_start_time(3.0),
                    SourceConfig::fixed_count("b", 6).with_start_time(1.0),
                ],
            ),
            ScenarioId::DecayingSource => (
                vec![(0.0, 40.0)],
                vec![SourceConfig::decaying("ion", 1000.0, 2.0).with_particle("ion")],
            ),
            ScenarioId::MultiWorker => (
                vec![(0.0, 5.0), (8.0, 12.0)],
                vec![
                    SourceConfig::fixed_count("seed", 1001).with_start_time(1.0),
                    SourceConfig::constant("beam", 200.0).with_particle("proton"),
                    SourceConfig::decaying("ion", 300.0, 3.0).with_particle("ion"),
                ],
            ),
            ScenarioId::NoEmissionLaw => (
                vec![(0.0, 1.0)],
                vec![SourceConfig {
                    activity: Some(0.0),
                    ..SourceConfig::fixed_count("empty", 0)
                }],
            ),
        };
        SimulationConfig::new(intervals, sources)
            .with_seed(seed)
            .with_workers(self.workers())
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;
    
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gap_scan" | "gapscan" | "sch-001" => Ok(ScenarioId::GapScan),
            "staggered_sources" | "staggered" | "sch-002" => Ok(ScenarioId::StaggeredSources),
            "early_exhaustion" | "sch-003" => Ok(ScenarioId::EarlyExhaustion),
            "decaying_source" | "decay" | "sch-004" => Ok(ScenarioId::DecayingSource),
            "multi_worker" | "multiworker" | "sch-005" => Ok(ScenarioId::MultiWorker),
            "no_emission_law" | "sch-006" => Ok(ScenarioId::NoEmissionLaw),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}
