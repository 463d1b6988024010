//! Run history service
//!
//! Keeps the most recent dispatch runs in memory with file-backed
//! persistence so history survives between invocations.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::types::{ScheduleSummary, SimulationConfig};

const MAX_HISTORY_SIZE: usize = 100;

/// Run parameters worth keeping next to the outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunParameters {
    pub mode: String,
    pub total_trucks: u32,
    pub total_pumps: u32,
    pub load_time_minutes: f64,
    pub unload_time_minutes: f64,
    pub site_count: usize,
}

impl RunParameters {
    pub fn from_config(config: &SimulationConfig, site_count: usize) -> Self {
        Self {
            mode: config.mode.as_str().to_string(),
            total_trucks: config.total_trucks,
            total_pumps: config.total_pumps,
            load_time_minutes: config.load_time_minutes,
            unload_time_minutes: config.unload_time_minutes,
            site_count,
        }
    }
}

/// Run entry in history
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunHistoryEntry {
    pub id: Uuid,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub parameters: RunParameters,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<ScheduleSummary>,
    pub error: Option<String>,
}

/// Response for listing run history
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunHistoryResponse {
    pub runs: Vec<RunHistoryEntry>,
    pub total: usize,
}

/// Run history storage backed by an in-memory deque + JSON file on disk.
pub struct RunHistoryService {
    history: Arc<RwLock<VecDeque<RunHistoryEntry>>>,
    path: Option<PathBuf>,
}

impl RunHistoryService {
    /// Open the history stored at `path`, starting empty if it is missing
    /// or unreadable
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut deque = VecDeque::with_capacity(MAX_HISTORY_SIZE);
        if let Some(loaded) = Self::load_from_disk(&path) {
            deque.extend(loaded.into_iter().take(MAX_HISTORY_SIZE));
            info!("Loaded {} run history entries from {}", deque.len(), path.display());
        }
        Self {
            history: Arc::new(RwLock::new(deque)),
            path: Some(path),
        }
    }

    /// History that is never written to disk
    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self {
            history: Arc::new(RwLock::new(VecDeque::with_capacity(MAX_HISTORY_SIZE))),
            path: None,
        }
    }

    /// Record a successful run
    pub fn record_completed(
        &self,
        id: Uuid,
        started_at: DateTime<Utc>,
        parameters: RunParameters,
        summary: ScheduleSummary,
    ) {
        let completed_at = Utc::now();
        self.add_entry(RunHistoryEntry {
            id,
            status: "completed".to_string(),
            started_at,
            completed_at,
            duration_ms: elapsed_ms(started_at, completed_at),
            parameters,
            summary: Some(summary),
            error: None,
        });
    }

    /// Record a failed run
    pub fn record_failed(
        &self,
        id: Uuid,
        started_at: DateTime<Utc>,
        parameters: RunParameters,
        error: String,
    ) {
        let completed_at = Utc::now();
        self.add_entry(RunHistoryEntry {
            id,
            status: "failed".to_string(),
            started_at,
            completed_at,
            duration_ms: elapsed_ms(started_at, completed_at),
            parameters,
            summary: None,
            error: Some(error),
        });
    }

    fn add_entry(&self, entry: RunHistoryEntry) {
        let mut history = self.history.write();

        if history.len() >= MAX_HISTORY_SIZE {
            history.pop_back();
        }

        history.push_front(entry);

        self.save_to_disk(&history);
    }

    /// Most recent runs, newest first
    pub fn get_recent(&self, limit: usize) -> RunHistoryResponse {
        let history = self.history.read();
        let runs: Vec<RunHistoryEntry> = history.iter().take(limit).cloned().collect();
        let total = history.len();

        RunHistoryResponse { runs, total }
    }

    /// Drop all entries; returns how many were removed
    pub fn clear(&self) -> usize {
        let mut history = self.history.write();
        let removed = history.len();
        history.clear();
        self.save_to_disk(&history);
        removed
    }

    fn load_from_disk(path: &Path) -> Option<Vec<RunHistoryEntry>> {
        if !path.exists() {
            return None;
        }
        match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<Vec<RunHistoryEntry>>(&content) {
                Ok(entries) => Some(entries),
                Err(e) => {
                    warn!("Failed to parse run history file: {}", e);
                    None
                }
            },
            Err(e) => {
                warn!("Failed to read run history file: {}", e);
                None
            }
        }
    }

    fn save_to_disk(&self, history: &VecDeque<RunHistoryEntry>) {
        let Some(path) = self.path.as_deref() else {
            return;
        };
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            if let Err(e) = std::fs::create_dir_all(dir) {
                warn!("Failed to create run history directory: {}", e);
                return;
            }
        }
        let entries: Vec<&RunHistoryEntry> = history.iter().collect();
        match serde_json::to_string_pretty(&entries) {
            Ok(json) => {
                if let Err(e) = std::fs::write(path, json) {
                    warn!("Failed to write run history file: {}", e);
                }
            }
            Err(e) => warn!("Failed to serialize run history: {}", e),
        }
    }
}

fn elapsed_ms(started_at: DateTime<Utc>, completed_at: DateTime<Utc>) -> u64 {
    u64::try_from((completed_at - started_at).num_milliseconds()).unwrap_or(0)
}
