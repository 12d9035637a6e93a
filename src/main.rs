//! Sumi-Snapshot main entry point
//!
//! This is the command-line interface for the Sumi-Snapshot capture engine.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use sumi_snapshot::capture::{
    CaptureOrchestrator, CapturePriority, CaptureRequestOptions, HttpScraper,
};
use sumi_snapshot::config::{load_config_with_hash, Config};
use sumi_snapshot::output::{print_batches, print_projects, print_result, print_status};
use sumi_snapshot::storage::{SqliteStorage, Storage};
use tracing_subscriber::EnvFilter;

/// Sumi-Snapshot: a polite competitor snapshot engine
///
/// Captures snapshots of competitor websites under global and per-project
/// concurrency limits, a per-domain request interval, a daily quota and an
/// error-rate circuit breaker.
#[derive(Parser, Debug)]
#[command(name = "sumi-snapshot")]
#[command(version = "1.0.0")]
#[command(about = "A polite competitor snapshot engine", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Capture snapshots of every competitor of a project
    Capture {
        /// Project id from the config file
        project_id: String,

        /// Time budget for the batch, overriding max-total-capture-time-ms
        #[arg(long, value_name = "MS")]
        max_wait_ms: Option<u64>,

        /// Batch priority (low, normal, high)
        #[arg(long, default_value = "normal")]
        priority: CapturePriority,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show circuit breaker, quota and concurrency state
    Status {
        /// Print the status as JSON
        #[arg(long)]
        json: bool,
    },

    /// List projects and their capture totals
    Projects,

    /// Show recent capture batches
    History {
        /// Number of batches to show
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Validate the config file and show what would be captured
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    match cli.command {
        Command::Capture {
            project_id,
            max_wait_ms,
            priority,
            json,
        } => handle_capture(&config, &project_id, max_wait_ms, priority, json).await,
        Command::Status { json } => {
            handle_status(&config, json)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Projects => {
            handle_projects(&config)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::History { limit } => {
            handle_history(&config, limit)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::CheckConfig => {
            handle_check_config(&config, &config_hash);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_snapshot=info,warn"),
            1 => EnvFilter::new("sumi_snapshot=debug,info"),
            2 => EnvFilter::new("sumi_snapshot=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Opens the database and syncs the projects listed in the config into it
fn open_storage(config: &Config) -> anyhow::Result<Arc<SqliteStorage>> {
    let path = Path::new(&config.storage.database_path);
    let storage = SqliteStorage::new(path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;

    for project in &config.projects {
        storage
            .upsert_project(project)
            .with_context(|| format!("Failed to store project {}", project.id))?;
    }

    Ok(Arc::new(storage))
}

fn build_orchestrator(
    config: &Config,
    storage: Arc<SqliteStorage>,
) -> anyhow::Result<CaptureOrchestrator> {
    let scraper = HttpScraper::new(&config.user_agent, storage.clone())
        .context("Failed to build HTTP client")?;
    let orchestrator =
        CaptureOrchestrator::new(config.capture.clone(), Arc::new(scraper), storage)?;
    Ok(orchestrator)
}

/// Handles the `capture` command
async fn handle_capture(
    config: &Config,
    project_id: &str,
    max_wait_ms: Option<u64>,
    priority: CapturePriority,
    json: bool,
) -> anyhow::Result<ExitCode> {
    let storage = open_storage(config)?;
    let orchestrator = build_orchestrator(config, storage.clone())?;

    let mut options = CaptureRequestOptions::default().with_priority(priority);
    if let Some(ms) = max_wait_ms {
        options = options.with_max_wait_time(Duration::from_millis(ms));
    }

    let started_at = chrono::Utc::now();
    let result = orchestrator.capture_snapshots(project_id, options).await;

    if let Err(e) = storage.record_batch(project_id, started_at, &result) {
        tracing::warn!("Failed to record batch history: {}", e);
    }

    print_result(project_id, &result, json)?;

    Ok(if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Handles the `status` command
fn handle_status(config: &Config, json: bool) -> anyhow::Result<()> {
    let storage = open_storage(config)?;
    let orchestrator = build_orchestrator(config, storage)?;
    print_status(&orchestrator.get_system_status(), json)?;
    Ok(())
}

/// Handles the `projects` command
fn handle_projects(config: &Config) -> anyhow::Result<()> {
    let storage = open_storage(config)?;
    print_projects(&storage.list_projects()?);
    Ok(())
}

/// Handles the `history` command
fn handle_history(config: &Config, limit: usize) -> anyhow::Result<()> {
    let storage = open_storage(config)?;
    print_batches(&storage.recent_batches(limit)?);
    Ok(())
}

/// Handles the `check-config` command: shows what would be captured
fn handle_check_config(config: &Config, config_hash: &str) {
    println!("=== Sumi-Snapshot Config Check ===\n");

    let capture = &config.capture;
    println!("Capture Limits:");
    println!(
        "  Max concurrent per project: {}",
        capture.max_concurrent_per_project
    );
    println!("  Max global concurrent: {}", capture.max_global_concurrent);
    println!("  Per-domain throttle: {}ms", capture.per_domain_throttle_ms);
    println!("  Daily snapshot limit: {}", capture.daily_snapshot_limit);
    println!(
        "  Circuit breaker: opens at {:.0}% errors, retries after {}ms",
        capture.circuit_breaker_error_threshold * 100.0,
        capture.circuit_breaker_window_ms
    );
    println!(
        "  Batch time budget: {}ms",
        capture.max_total_capture_time_ms
    );
    println!("  Fallback on timeout: {}", capture.fallback_on_timeout);

    println!("\nUser Agent:");
    println!("  Desktop: {}", config.user_agent.desktop());
    println!("  Mobile: {}", config.user_agent.mobile());

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);

    println!("\nProjects ({}):", config.projects.len());
    for project in &config.projects {
        println!(
            "  - {} ({}, {} competitors)",
            project.id,
            project.name,
            project.competitors.len()
        );
        for competitor in &project.competitors {
            println!("    * {}: {}", competitor.name, competitor.website);
        }
    }

    println!("\n✓ Configuration is valid (hash: {})", config_hash);
}
