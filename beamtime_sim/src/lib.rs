//! Beamtime Simulation Driver
//!
//! This crate turns the scheduler into a running simulation: it drives the
//! transport engine's run protocol across the interval table, runs N
//! independent worker replicas, and checks named scenarios.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │               SimulationConfig (read-only, Arc)              │
//! │        intervals + sources + master seed + worker count      │
//! └──────────────────────────────────────────────────────────────┘
//!        │                         │
//!  ┌─────▼──────────┐        ┌─────▼──────────┐
//!  │  Worker #0     │        │  Worker #1     │     ...
//!  │  Controller    │        │  Controller    │
//!  │   └ Scheduler  │        │   └ Scheduler  │
//!  │      └ Sources │        │      └ Sources │  (activity / N)
//!  │  ChaCha8 rng   │        │  ChaCha8 rng   │
//!  └─────┬──────────┘        └─────┬──────────┘
//!        ▼                         ▼
//!   TransportEngine           TransportEngine
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use beamtime_sim::{SimulationConfig, run_sequential};
//!
//! let config = SimulationConfig::from_file("sources.json")?;
//! let report = run_sequential(&config, false)?;
//! println!("{} events", report.total.total_events);
//! ```

mod config;
mod controller;
mod error;
mod exporter;
mod replica;
mod runner;
mod seeds;
pub mod scenarios;

pub use config::SimulationConfig;
pub use controller::{ControllerState, EmissionRecord, PrimaryOutcome, RunLifecycleController};
pub use error::SimError;
pub use exporter::{EmissionRow, SimExport};
pub use replica::{run_parallel, run_parallel_with, run_sequential, SimulationReport, WorkerReplica, WorkerReport};
pub use runner::{ScenarioResult, ScenarioRunner};
pub use seeds::DeterministicSeedProvider;
