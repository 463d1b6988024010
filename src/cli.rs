//! CLI argument parsing for the concrete-dispatch binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::types::DispatchMode;

#[derive(Parser)]
#[command(name = "concrete-dispatch", about = "Ready-mix concrete truck and pump dispatch")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a dispatch simulation from a JSON config
    Run {
        /// Run configuration (JSON)
        #[arg(long)]
        config: PathBuf,
        /// Demand file (CSV/TSV of loads and addresses); overrides sites in the config
        #[arg(long)]
        sites: Option<PathBuf>,
        /// Write a ZIP workbook of the schedule
        #[arg(long)]
        export: Option<PathBuf>,
        /// Add one sheet per pump to the export
        #[arg(long, requires = "export")]
        per_pump: bool,
        /// Write the full result as JSON
        #[arg(long)]
        output: Option<PathBuf>,
        /// Do not record this run in the history
        #[arg(long)]
        no_history: bool,
    },
    /// Show or clear recorded runs
    History {
        /// Number of runs to show
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Remove all recorded runs
        #[arg(long)]
        clear: bool,
    },
    /// Print a starter run configuration
    SampleConfig {
        #[arg(long, default_value = "optimizer")]
        mode: DispatchMode,
        /// Number of placeholder constraints (hybrid mode)
        #[arg(long, default_value_t = 5)]
        sites: usize,
    },
}
