//! Veriscan Daemon - Main entry point
//!
//! Polls the task intake file for qualification runs, executes each session
//! over the configured transport adapter, and writes the resulting report
//! and cumulative verified counter.

mod adapter;
mod config;
mod intake;
mod sink;

use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use veriscan_session::{Orchestrator, SessionEvent, SessionReport, SessionUpdate};

use crate::adapter::LoopbackAdapter;
use crate::config::Config;
use crate::intake::{TaskDefinition, TaskWatcher};

#[derive(Parser, Debug)]
#[command(name = "veriscan")]
#[command(about = "Wireless device qualification daemon")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "veriscan.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Run a single task from the intake file and exit
    #[arg(long)]
    once: bool,

    /// Write a starter configuration file and exit
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

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
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Veriscan v{}", env!("CARGO_PKG_VERSION"));

    if args.init_config {
        config::save_default_config(&args.config)?;
        info!(path = %args.config.display(), "Wrote starter configuration");
        return Ok(());
    }

    let config = config::load_config(&args.config)?;
    let mut watcher = TaskWatcher::new(
        &config.intake.task_path,
        Duration::from_secs(config.intake.poll_secs.max(1)),
    );

    loop {
        let task = tokio::select! {
            task = watcher.next_task() => task,
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                return Ok(());
            }
        };

        let report = run_task(&config, &task).await?;

        let report_path = sink::write_report(Path::new(&config.report.dir), &report)?;
        let total = sink::bump_counter(
            Path::new(&config.report.counter_path),
            &report.state.range().to_string(),
            report.state.verified_count() as u64,
        )?;
        info!(
            report = %report_path.display(),
            cause = %report.cause,
            total_verified = total,
            "Session report written"
        );

        if args.once {
            return Ok(());
        }
    }
}

/// Run one qualification session to termination
async fn run_task(config: &Config, task: &TaskDefinition) -> Result<SessionReport> {
    let (events_tx, events_rx) = mpsc::channel(256);
    let transport = LoopbackAdapter::new(events_tx.clone(), &config.sim_devices);

    let orchestrator = Orchestrator::new(
        Arc::clone(&transport),
        config.session_config(task.tag),
        task.range.clone(),
        task.tag,
        events_rx,
    );

    let mut updates = orchestrator.subscribe();
    tokio::spawn(async move {
        while let Ok(update) = updates.recv().await {
            if let SessionUpdate::Progress {
                processed,
                verified,
                rejected,
                remaining_budget,
            } = update
            {
                info!(processed, verified, rejected, remaining_budget, "Session progress");
            }
        }
    });

    let mut session = tokio::spawn(orchestrator.run());
    transport.announce().await;

    let report = tokio::select! {
        res = &mut session => res?,
        _ = tokio::signal::ctrl_c() => {
            info!("Stop requested, terminating session");
            let _ = events_tx.send(SessionEvent::Stop).await;
            (&mut session).await?
        }
    };
    Ok(report)
}
