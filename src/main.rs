mod agent;
mod browser;
mod classifier;
mod config;
mod images;
mod models;
mod navigator;
mod pipeline;
mod storage;
mod taxonomy;
mod validate;

use agent::{ListingAgent, RunOptions};
use browser::PlaywrightRemote;
use clap::{Parser, Subcommand};
use config::AgentConfig;
use models::ItemStatus;
use navigator::ConsoleGate;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(
    name = "grailed-lister",
    version,
    about = "Create Grailed listings from a listings JSON file"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
    /// Verbose diagnostics.
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a listings file against the Grailed taxonomy and check
    /// that image paths exist.
    Validate { file: PathBuf },
    /// Report which metadata fields are still missing per item.
    Analyze { file: PathBuf },
    /// Submit listings through the browser session.
    Run {
        file: PathBuf,
        /// Perform every step except the final publish action.
        #[arg(long)]
        dry_run: bool,
        /// Start processing at this item index.
        #[arg(long, default_value_t = 0)]
        start_index: usize,
    },
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match cli.command {
        Command::Validate { file } => {
            let records = storage::load_listings(&file)?;
            let report = validate::file_report(&records);
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.valid {
                std::process::exit(1);
            }
        }
        Command::Analyze { file } => {
            let records = storage::load_listings(&file)?;
            let analysis = validate::requirements_analysis(&records);
            println!("{}", serde_json::to_string_pretty(&analysis)?);
        }
        Command::Run {
            file,
            dry_run,
            start_index,
        } => {
            let records = storage::load_listings(&file)?;
            let mut config = AgentConfig::from_env();
            config.report_path = Some(storage::default_report_path(&file));

            let cancel = Arc::new(AtomicBool::new(false));
            let cancel_flag = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!(target: "lister.cli", "interrupt received; stopping at the next item boundary");
                    cancel_flag.store(true, Ordering::Relaxed);
                }
            });

            let mode = if dry_run { "dry-run" } else { "live" };
            info!(
                target: "lister.cli",
                mode,
                start_index,
                items = records.len(),
                "starting submission run"
            );
            let browser = PlaywrightRemote::new(config.bridge_url.as_str());
            let mut agent = ListingAgent::new(browser, ConsoleGate, &config, cancel);
            let report = agent
                .run(&records, RunOptions {
                    start_index,
                    dry_run,
                })
                .await;

            println!("{}", serde_json::to_string_pretty(&report)?);
            info!(
                target: "lister.cli",
                succeeded = report.count(ItemStatus::Succeeded),
                failed = report.count(ItemStatus::Failed),
                skipped = report.count(ItemStatus::Skipped),
                "run finished"
            );
            if let Some(fatal) = &report.fatal {
                eyre::bail!("run aborted: {fatal}");
            }
        }
    }
    Ok(())
}

fn init_tracing(debug: bool) {
    let default_filter = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = fmt().with_env_filter(filter).try_init();
}
