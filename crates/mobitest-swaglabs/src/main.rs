//! Runs the Swag Labs end-to-end suite against the simulated app.
//!
//! # Usage
//!
//! ```bash
//! # Run every scenario
//! swaglabs-e2e run
//!
//! # Run selected scenarios with JSON reports
//! swaglabs-e2e -f json run complete_order checkout_missing_info
//!
//! # Slow the checkout overview down and keep snapshots on disk
//! swaglabs-e2e run complete_order --render-delay-ms 3000 --snapshot-dir ./snapshots
//!
//! # List the scenarios
//! swaglabs-e2e list
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use mobitest_core::config::EngineConfig;
use mobitest_swaglabs::scenarios::{self, Scenario, ScenarioReport};
use mobitest_swaglabs::sim::SimOptions;
use tracing_subscriber::EnvFilter;

/// End-to-end suite for the Swag Labs app.
#[derive(Parser)]
#[command(name = "swaglabs-e2e")]
#[command(about = "Run the Swag Labs end-to-end scenarios")]
#[command(version)]
struct Cli {
    /// Output format: text or json
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Engine config file (defaults to ~/.mobitest/config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Run scenarios (all of them when none are named)
    Run {
        /// Scenarios to run, in order
        scenarios: Vec<Scenario>,
        /// How long the checkout overview takes to render
        #[arg(long, default_value = "800")]
        render_delay_ms: u64,
        /// Drop the session after this many driver commands
        #[arg(long)]
        disconnect_after: Option<u32>,
        /// Write diagnostic snapshots to this directory
        #[arg(long)]
        snapshot_dir: Option<PathBuf>,
    },

    /// List the available scenarios
    List,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}

#[derive(Debug)]
enum CliError {
    Config(String),
    ScenariosFailed { failed: usize, total: usize },
    Output(String),
}

impl CliError {
    fn exit_code(&self) -> ExitCode {
        match self {
            CliError::ScenariosFailed { .. } => ExitCode::from(1),
            CliError::Config(_) => ExitCode::from(2),
            CliError::Output(_) => ExitCode::from(3),
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Config error: {}", msg),
            CliError::ScenariosFailed { failed, total } => {
                write!(f, "{} of {} scenario(s) failed", failed, total)
            }
            CliError::Output(msg) => write!(f, "Output error: {}", msg),
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<EngineConfig, CliError> {
    match path {
        Some(path) if path.exists() => {
            EngineConfig::load_from(path).map_err(|e| CliError::Config(e.to_string()))
        }
        Some(path) => Err(CliError::Config(format!("{} does not exist", path.display()))),
        None => Ok(EngineConfig::load()),
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::List => {
            list(cli.format)?;
            Ok(())
        }
        Command::Run {
            ref scenarios,
            render_delay_ms,
            disconnect_after,
            ref snapshot_dir,
        } => {
            let mut config = load_config(cli.config.as_ref())?;
            if let Some(dir) = snapshot_dir {
                config.snapshot_dir = Some(dir.clone());
            }
            let options = SimOptions {
                render_delay: Duration::from_millis(render_delay_ms),
                disconnect_after,
            };
            let selected: Vec<Scenario> = if scenarios.is_empty() {
                Scenario::ALL.to_vec()
            } else {
                scenarios.clone()
            };

            let reports = scenarios::run_all(&selected, &options, &config).await;
            print_reports(&reports, cli.format)?;

            let failed = reports.iter().filter(|r| !r.passed).count();
            if failed > 0 {
                return Err(CliError::ScenariosFailed {
                    failed,
                    total: reports.len(),
                });
            }
            Ok(())
        }
    }
}

fn list(format: OutputFormat) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => {
            let entries: Vec<serde_json::Value> = Scenario::ALL
                .iter()
                .map(|s| serde_json::json!({ "name": s.name(), "description": s.description() }))
                .collect();
            let json = serde_json::to_string_pretty(&entries)
                .map_err(|e| CliError::Output(e.to_string()))?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            for scenario in Scenario::ALL {
                println!("{:<24} {}", scenario.name(), scenario.description());
            }
        }
    }
    Ok(())
}

fn print_reports(reports: &[ScenarioReport], format: OutputFormat) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(reports)
                .map_err(|e| CliError::Output(e.to_string()))?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            for report in reports {
                println!(
                    "{} {} ({} ms) {}",
                    if report.passed { "PASS" } else { "FAIL" },
                    report.name,
                    report.elapsed_ms,
                    report.detail
                );
            }
            let passed = reports.iter().filter(|r| r.passed).count();
            println!("{} passed, {} failed", passed, reports.len() - passed);
        }
    }
    Ok(())
}
