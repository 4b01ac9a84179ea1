//! Codetrack Monitor - editing activity capture and daily statistics.
//!
//! This binary watches a workspace, records every quantified edit and
//! periodically merges the results into per-day snapshots.
//!
//! # Commands
//!
//! - `codetrack-monitor run`: Start the monitor daemon
//! - `codetrack-monitor status`: Show today's active coding time
//! - `codetrack-monitor report`: Print the snapshots of a date range
//!
//! # Environment Variables
//!
//! See the [`config`] module for available configuration options.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use tokio::signal;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use codetrack_monitor::config::Config;
use codetrack_monitor::flush::flush;
use codetrack_monitor::persistence::JsonFileStore;
use codetrack_monitor::report::{load_range, report_json, status_line};
use codetrack_monitor::summary::format_active_time;
use codetrack_monitor::trackers::{ActivityState, ChangeRecorder, DiffExtractor, GitCli, Observation};
use codetrack_monitor::types::PeriodSnapshot;
use codetrack_monitor::watcher::{FileWatcher, WatchEvent};

/// Graceful shutdown timeout for in-flight observations.
const SHUTDOWN_TIMEOUT_SECS: u64 = 5;

/// Capacity of the watch event channel.
const WATCH_CHANNEL_CAPACITY: usize = 1000;

/// Codetrack Monitor - editing activity capture and daily statistics.
///
/// Watches a workspace, measures each edit against the last commit and keeps
/// per-day activity snapshots.
#[derive(Parser, Debug)]
#[command(name = "codetrack-monitor")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "\
ENVIRONMENT VARIABLES:
    CODETRACK_DATA_DIR             Snapshot directory (default: ~/.code-tracking)
    CODETRACK_WATCH_DIR            Workspace to watch (default: current directory)
    CODETRACK_PROJECT_NAME         Project name (default: workspace directory name)
    CODETRACK_FLUSH_INTERVAL_MINS  Minutes between flushes (default: 5)
    CODETRACK_DEBOUNCE_MS          Change coalescing window (default: 500)
    CODETRACK_LINE_CACHE_SIZE      Fallback line-count cache size (default: 4096)

EXAMPLES:
    # Watch the current workspace
    codetrack-monitor run

    # Today's active time
    codetrack-monitor status

    # A week of activity as JSON
    codetrack-monitor report --from 2024-03-01 --to 2024-03-07 --json
")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Start the monitor daemon.
    ///
    /// Watches the workspace and flushes activity snapshots on a timer.
    Run,

    /// Show today's persisted active coding time.
    Status,

    /// Print the stored snapshots for a date range (inclusive).
    Report {
        /// First date, YYYY-MM-DD (default: today).
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last date, YYYY-MM-DD (default: same as --from).
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Print the snapshots as JSON.
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("Failed to create tokio runtime")?;

            runtime.block_on(run_monitor())
        }
        Command::Status => run_status(),
        Command::Report { from, to, json } => run_report(from, to, json),
    }
}

/// Runs the monitor daemon until a shutdown signal arrives.
async fn run_monitor() -> Result<()> {
    init_logging();

    info!("Starting Codetrack Monitor");

    let config = Config::from_env().context("Failed to load configuration")?;
    let project_name = config
        .project_name
        .clone()
        .or_else(|| workspace_name(&config.watch_dir));

    info!(
        data_dir = %config.data_dir.display(),
        watch_dir = %config.watch_dir.display(),
        project = project_name.as_deref().unwrap_or("(per directory)"),
        flush_interval_secs = config.flush_interval.as_secs(),
        "Configuration loaded"
    );

    let store = JsonFileStore::new(&config.data_dir);
    let state = Arc::new(Mutex::new(ActivityState::new()));

    let mut recorder = ChangeRecorder::new(DiffExtractor::with_cache_size(GitCli, config.line_cache_size))
        .with_ignored_root(&config.data_dir);
    if let Some(name) = project_name {
        recorder = recorder.with_project_name(name);
    }
    let recorder = Arc::new(recorder);

    let (watch_tx, mut watch_rx) = mpsc::channel::<WatchEvent>(WATCH_CHANNEL_CAPACITY);
    let _watcher = FileWatcher::new(
        config.watch_dir.clone(),
        Some(config.data_dir.clone()),
        config.debounce,
        watch_tx,
    )
    .with_context(|| format!("Failed to initialize file watcher for {}", config.watch_dir.display()))?;

    let mut flush_timer = interval_at(Instant::now() + config.flush_interval, config.flush_interval);
    flush_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut observations = JoinSet::new();
    let shutdown = wait_for_shutdown();
    tokio::pin!(shutdown);

    info!("Monitor running. Press Ctrl+C to stop.");

    loop {
        tokio::select! {
            () = &mut shutdown => {
                info!("Shutdown signal received");
                break;
            }

            _ = flush_timer.tick() => {
                run_flush(&state, &store).await;
            }

            Some(watch_event) = watch_rx.recv() => match watch_event {
                WatchEvent::FileChanged { path, observed_at } => {
                    let recorder = Arc::clone(&recorder);
                    let state = Arc::clone(&state);
                    observations.spawn(async move {
                        recorder.observe(&state, &path, observed_at).await
                    });
                }
                WatchEvent::FileRemoved(path) => {
                    debug!(path = %path.display(), "File removed");
                    recorder.forget(&path).await;
                }
            },

            Some(joined) = observations.join_next(), if !observations.is_empty() => {
                match joined {
                    Ok(Observation::Recorded(record)) => {
                        debug!(path = %record.file_path, minutes = record.duration_minutes, "Observation recorded");
                    }
                    Ok(Observation::Skipped(reason)) => {
                        debug!(?reason, "Observation skipped");
                    }
                    Err(e) => warn!(error = %e, "Observation task failed"),
                }
            }
        }
    }

    info!("Shutting down...");

    let drain = async { while observations.join_next().await.is_some() {} };
    if tokio::time::timeout(Duration::from_secs(SHUTDOWN_TIMEOUT_SECS), drain)
        .await
        .is_err()
    {
        warn!("In-flight observations did not finish, aborting them");
        observations.abort_all();
    }

    run_flush(&state, &store).await;

    info!("Monitor stopped");
    Ok(())
}

/// Runs one flush cycle, logging instead of failing.
async fn run_flush(state: &Mutex<ActivityState>, store: &JsonFileStore) {
    match flush(state, store).await {
        Ok(report) => info!(summary = %report.summary, "Activity flushed"),
        Err(e) => error!(error = %e, "Flush failed, changes stay buffered"),
    }
}

/// Prints today's active time from the snapshot store.
fn run_status() -> Result<()> {
    let line = status_line(Local::now().date_naive()).context("Failed to read today's snapshot")?;
    println!("{line}");
    Ok(())
}

/// Prints the snapshots of a date range.
fn run_report(from: Option<NaiveDate>, to: Option<NaiveDate>, json: bool) -> Result<()> {
    let start = from.unwrap_or_else(|| Local::now().date_naive());
    let end = to.unwrap_or(start);
    let snapshots = load_range(start, end).context("Failed to load configuration")?;

    if json {
        println!("{}", report_json(&snapshots)?);
        return Ok(());
    }

    if snapshots.is_empty() {
        println!("No activity recorded between {start} and {end}.");
        return Ok(());
    }
    for snapshot in &snapshots {
        print_snapshot(snapshot);
    }
    Ok(())
}

fn print_snapshot(snapshot: &PeriodSnapshot) {
    println!(
        "{}  {} active, {} files in {} projects",
        snapshot.date,
        format_active_time(snapshot.total_active_time),
        snapshot.total_files,
        snapshot.total_projects,
    );
    for (name, project) in &snapshot.projects {
        println!(
            "  {name}: +{} -{} lines, {}",
            project.total_lines_added,
            project.total_lines_removed,
            format_active_time(project.total_active_time),
        );
        for totals in project.file_totals() {
            println!(
                "    +{:<5} -{:<5} {}",
                totals.lines_added, totals.lines_removed, totals.file_path
            );
        }
    }
}

/// Name of the workspace directory, used as the default project name.
fn workspace_name(watch_dir: &Path) -> Option<String> {
    let dir = watch_dir.canonicalize().ok()?;
    dir.file_name().map(|n| n.to_string_lossy().into_owned())
}

/// Initializes the logging subsystem.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .init();
}

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
