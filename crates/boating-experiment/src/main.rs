//! Boating Experiment CLI.
//!
//! Commands:
//! - run: Run a single narrated session
//! - sweep: Run sessions over several fleet and crowd sizes

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use chrono::Local;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use boating_experiment::results::format_duration;
use boating_experiment::runner::{SessionRunner, SessionRunnerConfig};
use ride_kernel::SessionConfig;

/// Generate a timestamped output path from the given path.
/// e.g., "sweep.json" -> "sweep-20260108-010530.json"
fn timestamped_path(path: &Path) -> PathBuf {
    let timestamp = Local::now().format("%Y%m%d-%H%M%S");
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("results");
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("json");
    let parent = path.parent().unwrap_or(Path::new("."));
    parent.join(format!("{}-{}.{}", stem, timestamp, ext))
}

#[derive(Parser)]
#[command(name = "boating-experiment")]
#[command(version)]
#[command(about = "Boat ride rendezvous sessions")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single session
    Run {
        /// Number of boats (5-10)
        boats: usize,

        /// Number of visitors (20-100)
        visitors: usize,

        /// Wall-clock milliseconds per simulated minute
        #[arg(long, env = "BOATING_MINUTE_MS", default_value = "100")]
        minute_ms: u64,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,

        /// Write the session report to this JSON file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Run sessions over a grid of boat and visitor counts
    Sweep {
        /// Boat counts to test (comma-separated)
        #[arg(long, default_value = "5,10", value_delimiter = ',')]
        boats: Vec<usize>,

        /// Visitor counts to test (comma-separated)
        #[arg(long, default_value = "20,100", value_delimiter = ',')]
        visitors: Vec<usize>,

        /// Number of trials per configuration
        #[arg(long, default_value = "3")]
        trials: usize,

        /// Wall-clock milliseconds per simulated minute
        #[arg(long, env = "BOATING_MINUTE_MS", default_value = "1")]
        minute_ms: u64,

        /// Output file for results
        #[arg(long, default_value = "sweep.json")]
        output: PathBuf,
    },
}

/// Reject out-of-range counts through clap so the user sees the usage line.
fn validate_counts(boats: usize, visitors: usize) {
    if let Err(e) = SessionConfig::new(boats, visitors) {
        Cli::command().error(ErrorKind::ValueValidation, e).exit();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .init();

    match cli.command {
        Commands::Run {
            boats,
            visitors,
            minute_ms,
            seed,
            output,
        } => {
            validate_counts(boats, visitors);

            let runner = SessionRunner::new(SessionRunnerConfig {
                minute: Duration::from_millis(minute_ms),
                narrate: true,
                ..Default::default()
            });
            let report = runner.run(boats, visitors, 0, seed).await?;

            println!("\n=== Session Result ===");
            println!("Boats: {}", report.config.boats);
            println!("Visitors served: {}", report.visitors_served);
            println!("Seed: {}", report.config.seed);
            println!("Elapsed: {}", format_duration(report.elapsed_ms));
            println!("Closed by: Boat {}", report.closed_by);
            println!("Peak concurrent rides: {}", report.peak_concurrent_rides);
            println!("Claim retries: {}", report.claim_retries);
            println!("Total ride minutes: {}", report.total_ride_minutes());

            println!("\nRides per boat:");
            for (index, rides) in report.rides_per_boat.iter().enumerate() {
                println!("  Boat {:>2}: {}", index + 1, rides);
            }

            if let Some(output) = output {
                let output_path = timestamped_path(&output);
                report.save(&output_path)?;
                println!("\nReport saved to: {}", output_path.display());
            }
        }

        Commands::Sweep {
            boats,
            visitors,
            trials,
            minute_ms,
            output,
        } => {
            for &b in &boats {
                for &v in &visitors {
                    validate_counts(b, v);
                }
            }

            info!(
                boats = ?boats,
                visitors = ?visitors,
                trials = trials,
                "Starting sweep"
            );

            let runner = SessionRunner::new(SessionRunnerConfig {
                minute: Duration::from_millis(minute_ms),
                narrate: false,
                ..Default::default()
            });
            let results = runner.sweep(&boats, &visitors, trials).await?;

            let output_path = timestamped_path(&output);
            results.save(&output_path)?;

            println!("\n=== Sweep Complete ===");
            println!("Results saved to: {}", output_path.display());
            println!("\nSummary:");
            for (key, summary) in &results.summary {
                println!(
                    "  {}: avg_elapsed={}, peak_utilization={:.0}%, avg_claim_retries={:.1}",
                    key,
                    format_duration(summary.avg_elapsed_ms as u64),
                    summary.avg_peak_utilization * 100.0,
                    summary.avg_claim_retries
                );
            }
        }
    }

    Ok(())
}
