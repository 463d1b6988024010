//! Concrete Dispatch - truck and pump scheduling for ready-mix deliveries
//!
//! Reads a run configuration, locates demand, runs the dispatch engine and
//! writes the schedule as JSON and/or a ZIP workbook.

mod cli;
mod config;
mod defaults;
mod error;
mod services;
mod types;

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use crate::cli::{Cli, Command};
use crate::services::aggregator::site_summaries;
use crate::services::run_history::{RunHistoryService, RunParameters};
use crate::types::{Constraint, DispatchMode, ImportedSite, SimulationConfig, SimulationResult};

/// Sites locked by default in a sample hybrid config
const SAMPLE_LOCKED_SITES: usize = 3;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs directory - use LOGS_DIR env var or default to ./logs
    let logs_dir = std::env::var("LOGS_DIR").unwrap_or_else(|_| "./logs".to_string());
    std::fs::create_dir_all(&logs_dir).ok();

    // File appender for persistent logs (daily rotation)
    let file_appender = RollingFileAppender::new(Rotation::DAILY, &logs_dir, "dispatch.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Initialize logging - both stdout and file
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,concrete_dispatch=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer()) // stdout
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false)) // file
        .init();

    let cli = Cli::parse();
    let config = config::Config::from_env()?;

    match cli.command {
        Command::Run {
            config: config_path,
            sites,
            export,
            per_pump,
            output,
            no_history,
        } => {
            let simulation = config::load_simulation_config(&config_path)?;
            let imported = sites.as_deref().map(import_or_empty);

            let history = (!no_history).then(|| RunHistoryService::open(&config.history_file));
            let run_id = Uuid::new_v4();
            let started_at = Utc::now();
            info!("Starting run {} from {}", run_id, config_path.display());

            let geocoder = services::geocoding::create_geocoder(&config)?;
            let outcome = services::simulation::run_simulation(
                &simulation,
                imported.as_deref(),
                geocoder.as_deref(),
            )
            .await;

            let result = match outcome {
                Ok(result) => result,
                Err(e) => {
                    error!("Run {} failed: {:#}", run_id, e);
                    if let Some(history) = &history {
                        let site_count = imported.as_ref().map_or(simulation.sites.len(), Vec::len);
                        let parameters = RunParameters::from_config(&simulation, site_count);
                        history.record_failed(run_id, started_at, parameters, format!("{:#}", e));
                    }
                    return Err(e);
                }
            };

            if let Some(history) = &history {
                let parameters = RunParameters::from_config(&simulation, result.sites.len());
                history.record_completed(run_id, started_at, parameters, result.summary.clone());
            }

            if let Some(path) = &output {
                write_json(path, &result)?;
            }
            if let Some(path) = &export {
                services::export::write_workbook(path, &result, per_pump)?;
            }

            print_result(&result);
        }
        Command::History { limit, clear } => {
            let history = RunHistoryService::open(&config.history_file);
            if clear {
                let removed = history.clear();
                println!("Removed {} recorded runs", removed);
            } else {
                print_history(&history, limit);
            }
        }
        Command::SampleConfig { mode, sites } => {
            let sample = sample_config(mode, sites);
            println!("{}", serde_json::to_string_pretty(&sample)?);
        }
    }

    Ok(())
}

/// Parse a demand file; an unreadable file falls back to synthetic demand
fn import_or_empty(path: &Path) -> Vec<ImportedSite> {
    match services::import::read_sites_file(path) {
        Ok(rows) => {
            if rows.is_empty() {
                warn!("No usable rows in {}, generating synthetic demand", path.display());
            }
            rows
        }
        Err(e) => {
            warn!("Import failed: {:#}, generating synthetic demand", e);
            Vec::new()
        }
    }
}

fn write_json(path: &Path, result: &SimulationResult) -> Result<()> {
    let json = serde_json::to_string_pretty(result)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote result to {}", path.display());
    Ok(())
}

fn sample_config(mode: DispatchMode, sites: usize) -> SimulationConfig {
    let mut sample = SimulationConfig::new(mode, Utc::now().date_naive());
    if mode == DispatchMode::Hybrid {
        sample.constraints = Constraint::defaults_for(
            sites,
            sample.total_pumps,
            sample.start_time,
            SAMPLE_LOCKED_SITES.min(sites),
        );
    }
    sample
}

fn print_result(result: &SimulationResult) {
    println!(
        "{:<6} {:<16} {:>5} {:>7} {:<8} {:<11} {:<11} {:>6}",
        "Site", "Name", "Loads", "Trucks", "Pump", "Start", "End", "Min"
    );
    for row in site_summaries(&result.sites, &result.schedule) {
        println!(
            "{:<6} {:<16} {:>5} {:>7} {:<8} {:<11} {:<11} {:>6}",
            row.site_id,
            row.name,
            row.loads,
            row.trucks,
            row.pump_id,
            row.start_time.format("%d/%m %H:%M"),
            row.end_time.format("%d/%m %H:%M"),
            row.duration_minutes
        );
    }
    println!();
    println!("Total trips:  {}", result.summary.total_trips);
    println!("Completion:   {}", result.summary.completion_time);
    println!("Efficiency:   {:.1}%", result.summary.efficiency);
}

fn print_history(history: &RunHistoryService, limit: usize) {
    let response = history.get_recent(limit);
    if response.runs.is_empty() {
        println!("No recorded runs");
        return;
    }
    for run in &response.runs {
        let outcome = match (&run.summary, &run.error) {
            (Some(summary), _) => format!(
                "{} trips, done {}",
                summary.total_trips, summary.completion_time
            ),
            (None, Some(err)) => err.clone(),
            (None, None) => String::new(),
        };
        println!(
            "{}  {}  {:<9} {:<9} {} trucks / {} pumps, {} sites  {}",
            run.started_at.format("%Y-%m-%d %H:%M:%S"),
            run.id,
            run.status,
            run.parameters.mode,
            run.parameters.total_trucks,
            run.parameters.total_pumps,
            run.parameters.site_count,
            outcome
        );
    }
    println!("Showing {} of {} runs", response.runs.len(), response.total);
}
