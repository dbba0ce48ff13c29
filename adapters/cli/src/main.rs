#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a Gridwalk navigation scenario headlessly.

mod scenario;
mod simulation;

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use scenario::Scenario;
use simulation::Outcome;

/// Command-line options accepted by the Gridwalk CLI.
#[derive(Debug, Parser)]
#[command(name = "gridwalk")]
#[command(about = "Walk an agent through a TOML scenario and report the outcome")]
struct Args {
    /// Scenario file describing the playfield, obstacles, agent, and target.
    #[arg(long)]
    scenario: PathBuf,

    /// Maximum number of frames to simulate.
    #[arg(long, default_value_t = 600)]
    frames: u32,

    /// Simulated time per frame in milliseconds.
    #[arg(long, default_value_t = 16)]
    dt_ms: u64,

    /// Print the report as JSON instead of plain text.
    #[arg(long)]
    json: bool,
}

/// Entry point for the Gridwalk command-line interface.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gridwalk=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let scenario = Scenario::load(&args.scenario)?;
    tracing::info!(path = %args.scenario.display(), "scenario loaded");

    let report = simulation::run(&scenario, args.frames, Duration::from_millis(args.dt_ms))?;

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("failed to encode report")?;
        println!("{json}");
        return Ok(());
    }

    match report.outcome {
        Outcome::Arrived => println!("arrived after {} frames", report.frames),
        Outcome::Walking => println!("still walking after {} frames", report.frames),
        Outcome::Rejected { reason } => println!("move rejected: {reason}"),
    }
    println!("grid: {}x{} cells", report.columns, report.rows);
    println!(
        "position: ({:.1}, {:.1})",
        report.position[0], report.position[1]
    );
    println!("initial route:");
    for point in &report.initial_route {
        println!("  ({:.1}, {:.1})", point[0], point[1]);
    }
    println!("blocked cells: {}", report.blocked_cells.len());
    println!(
        "repaths: {} ({} failed)",
        report.repaths, report.repath_failures
    );

    Ok(())
}
