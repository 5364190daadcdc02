//! Beamtime Simulator CLI
//!
//! Run a source configuration, or the built-in scheduling scenarios.

use beamtime_sim::scenarios::ScenarioId;
use beamtime_sim::{run_parallel, ScenarioResult, ScenarioRunner, SimExport, SimulationConfig};
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Beamtime multi-source scheduler CLI
#[derive(Parser, Debug)]
#[command(name = "beamtime-sim")]
#[command(about = "Schedule primaries from multiple sources over run intervals", long_about = None)]
struct Args {
    /// JSON simulation config (intervals + sources); runs scenarios when absent
    #[arg(short, long)]
    config: Option<String>,
    
    /// Scenario to run (gap_scan, staggered_sources, early_exhaustion, decaying_source, multi_worker, no_emission_law, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,
    
    /// Master seed for determinism (0 = random from time; defaults to 42, or the config's seed)
    #[arg(short, long)]
    seed: Option<u64>,
    
    /// Number of consecutive seeds to test (scenario mode)
    #[arg(long, default_value = "1")]
    seeds: usize,
    
    /// Override the number of worker replicas (config mode)
    #[arg(short, long)]
    workers: Option<usize>,
    
    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
    
    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,
    
    /// Export emitted events to a JSON file
    #[arg(long)]
    export: Option<String>,
}

/// Runs a user configuration over parallel workers.
async fn run_config(path: &str, args: &Args, seed: Option<u64>) -> bool {
    let mut config = match SimulationConfig::from_file(path) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load {}: {}", path, e);
            return false;
        }
    };
    if let Some(seed) = seed {
        config = config.with_seed(seed);
    }
    if let Some(workers) = args.workers {
        config = config.with_workers(workers);
    }
    let seed = config.seed;
    
    let expected = match config.expected_events() {
        Ok(expected) => expected,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return false;
        }
    };
    
    info!("Running {} with {} workers (seed={})", path, config.workers, seed);
    let config = Arc::new(config);
    let report = match run_parallel(Arc::clone(&config), args.export.is_some()).await {
        Ok(report) => report,
        Err(e) => {
            error!("Simulation aborted: {}", e);
            return false;
        }
    };
    
    if args.json {
        let summary = serde_json::json!({
            "seed": seed,
            "workers": config.workers,
            "total_events": report.total.total_events,
            "runs": report.total.run_count(),
            "final_time": report.total.final_time,
            "sources": expected.iter().zip(&report.total.events_per_source).map(|((name, exp), got)| {
                serde_json::json!({ "name": name, "expected": exp, "emitted": got })
            }).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&summary).unwrap_or_default());
    } else {
        for ((name, exp), got) in expected.iter().zip(&report.total.events_per_source) {
            info!("  {:<16} emitted {:>10} (expected {:.1})", name, got, exp);
        }
        info!(
            "✓ {} events in {} runs, final t={}",
            report.total.total_events,
            report.total.run_count(),
            report.total.final_time
        );
    }
    
    if let Some(export_path) = &args.export {
        let export = SimExport::from_report(path, &config, &report);
        if let Err(e) = export.write_to_file(export_path) {
            error!("Failed to write export: {:?}", e);
            return false;
        }
        info!("Exported {} emissions to {}", export.emissions.len(), export_path);
    }
    true
}

/// Runs scenarios over `args.seeds` consecutive seeds.
fn run_scenarios(args: &Args, base_seed: u64) -> bool {
    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        match args.scenario.parse() {
            Ok(scenario) => vec![scenario],
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!("Available scenarios: gap_scan, staggered_sources, early_exhaustion, decaying_source, multi_worker, no_emission_law, all");
                return false;
            }
        }
    };
    
    if let Some(export_path) = &args.export {
        if scenarios.len() > 1 {
            eprintln!("Error: --export only supports a single scenario, not 'all'");
            return false;
        }
        let scenario = scenarios[0];
        let (result, report) = ScenarioRunner::new(base_seed).run_with_report(scenario);
        if let Some(report) = report {
            let mut export = SimExport::from_report(scenario.name(), &scenario.config(base_seed), &report);
            export.finalize(result.passed);
            if let Err(e) = export.write_to_file(export_path) {
                error!("Failed to write export: {:?}", e);
                return false;
            }
            info!("Exported {} emissions to {}", export.emissions.len(), export_path);
        }
        return result.passed;
    }
    
    let mut all_results: Vec<ScenarioResult> = Vec::new();
    for seed_offset in 0..args.seeds {
        let seed = base_seed.wrapping_add(seed_offset as u64);
        let runner = ScenarioRunner::new(seed);
        for scenario in &scenarios {
            all_results.push(runner.run(*scenario));
        }
    }
    
    let total = all_results.len();
    let failed: Vec<&ScenarioResult> = all_results.iter().filter(|r| !r.passed).collect();
    
    if args.json {
        let summary = serde_json::json!({
            "total": total,
            "passed": total - failed.len(),
            "failed": failed.len(),
            "results": all_results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario.name(),
                    "seed": r.seed,
                    "passed": r.passed,
                    "events": r.total_events,
                    "runs": r.runs,
                    "time_secs": r.final_time_secs,
                    "failure_reason": r.failure_reason,
                })
            }).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&summary).unwrap_or_default());
    } else {
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        if failed.is_empty() {
            info!("✅ All {} scenario runs passed!", total);
        } else {
            error!("❌ {}/{} scenario runs failed!", failed.len(), total);
            for result in &failed {
                error!("  - {} seed={}: {}",
                    result.scenario.name(),
                    result.seed,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }
    }
    
    failed.is_empty()
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    
    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
    
    if !args.json {
        info!("Beamtime Simulator v{}", env!("CARGO_PKG_VERSION"));
    }
    
    // Determine base seed
    let seed = args.seed.map(|seed| {
        if seed == 0 {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(42)
        } else {
            seed
        }
    });
    
    let ok = match &args.config {
        Some(path) => run_config(path, &args, seed).await,
        None => run_scenarios(&args, seed.unwrap_or(42)),
    };
    
    // Exit with proper code for CI
    if !ok {
        std::process::exit(1);
    }
}
