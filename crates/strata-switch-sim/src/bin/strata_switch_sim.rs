//! # Strata Switch Simulator
//!
//! Replays a switching scenario on a virtual clock and prints the commands
//! the engine issued to the executor.
//!
//! ## Usage
//!
//! ```bash
//! # Replay a scenario file
//! strata-switch-sim replay --scenario crates/strata-switch-sim/scenarios/default_outage.toml
//!
//! # Ten minutes of sub-threshold flapping, JSON report
//! strata-switch-sim flap --seed 7 --duration-secs 600 --json
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use strata_switch_sim::flap::{FlapConfig, FlapScenario};
use strata_switch_sim::replay::{replay, ReplayReport};
use strata_switch_sim::scenario::Scenario;
use tracing_subscriber::EnvFilter;

/// Strata switch scenario simulator.
#[derive(Parser, Debug)]
#[command(name = "strata-switch-sim", about = "Replay data-switch scenarios on a virtual clock")]
struct Cli {
    #[command(subcommand)]
    command: Mode,

    /// Print the full report as JSON instead of a command log.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Replay a TOML scenario file.
    Replay {
        #[arg(long)]
        scenario: PathBuf,
    },
    /// Generate and replay a seeded registration-flap soak.
    Flap {
        #[arg(long, default_value_t = 1)]
        seed: u64,
        #[arg(long, default_value_t = 600)]
        duration_secs: u64,
        #[arg(long, default_value_t = 10_000)]
        threshold_ms: u64,
        /// Longest outage as a fraction of the threshold.
        #[arg(long, default_value_t = 0.9)]
        max_outage_ratio: f64,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .compact()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let scenario = match cli.command {
        Mode::Replay { scenario } => {
            let text = std::fs::read_to_string(&scenario)
                .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", scenario.display(), e))?;
            Scenario::from_toml_str(&text)?
        }
        Mode::Flap {
            seed,
            duration_secs,
            threshold_ms,
            max_outage_ratio,
        } => FlapScenario::new(FlapConfig {
            seed,
            duration: Duration::from_secs(duration_secs),
            stability_threshold: Duration::from_millis(threshold_ms),
            max_outage_ratio,
            ..Default::default()
        })
        .build(),
    };

    tracing::info!(
        scenario = %scenario.name,
        events = scenario.events.len(),
        end_ms = u64::try_from(scenario.end().as_millis()).unwrap_or(u64::MAX),
        "replaying"
    );
    let report = replay(&scenario);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_log(&report)?;
    }
    Ok(())
}

fn print_log(report: &ReplayReport) -> anyhow::Result<()> {
    println!("scenario: {}", report.name);
    for rec in &report.commands {
        println!("  +{:>8}ms  {}", rec.at_ms, serde_json::to_string(&rec.command)?);
    }
    println!(
        "passes: {}  final active: {}  switch requests: {}",
        report.passes,
        report.final_active,
        report
            .commands
            .iter()
            .filter(|r| r.command.is_switch_request())
            .count()
    );
    Ok(())
}
