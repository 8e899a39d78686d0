//! Dropbox Connector Parity Harness CLI
//!
//! Runs the full parity suite against a live proxy and Dropbox account.

use clap::Parser;
use dropbox_connector_harness::config::HarnessConfig;
use dropbox_connector_harness::scenarios::{parity_plan, HarnessContext};
use dropbox_connector_harness::sequence::StepStatus;
use std::path::PathBuf;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Parity harness for the ESB Dropbox connector
#[derive(Parser, Debug)]
#[command(name = "dropbox-connector-harness")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "harness.yaml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!(
        "Starting Dropbox connector parity harness v{}",
        env!("CARGO_PKG_VERSION")
    );

    let config = HarnessConfig::load(&args.config)?;
    info!("Loaded configuration from {:?}", args.config);

    let ctx = HarnessContext::new(config)?;
    let plan = parity_plan()?;
    let report = plan.run(&ctx).await;

    for outcome in &report.outcomes {
        match &outcome.status {
            StepStatus::Passed => info!(step = %outcome.name, "passed"),
            StepStatus::Failed(err) => error!(step = %outcome.name, error = %err, "failed"),
            StepStatus::Skipped { blocked_by } => {
                warn!(step = %outcome.name, blocked_by = %blocked_by, "skipped")
            }
        }
    }

    info!(
        passed = report.passed(),
        failed = report.failed(),
        skipped = report.skipped(),
        "suite finished"
    );

    if !report.all_passed() {
        anyhow::bail!(
            "{} step(s) failed, {} skipped",
            report.failed(),
            report.skipped()
        );
    }

    Ok(())
}
