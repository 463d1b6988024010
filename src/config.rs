//! Process configuration

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::types::SimulationConfig;

/// Which geocoding backend resolves addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeocoderBackend {
    /// No lookups; every site gets a fallback coordinate
    None,
    Mock,
    Here,
}

impl GeocoderBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "none" | "off" => Some(GeocoderBackend::None),
            "mock" => Some(GeocoderBackend::Mock),
            "here" => Some(GeocoderBackend::Here),
            _ => None,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub geocoder_backend: GeocoderBackend,

    /// HERE Geocoding API key (optional, lookups are skipped without it)
    pub here_api_key: Option<String>,

    /// HERE Geocoding API base URL
    pub here_base_url: String,

    /// Minimum interval between HERE requests
    pub here_rate_limit_ms: u64,

    /// Consecutive failures before the circuit breaker opens
    pub here_cb_threshold: u32,

    /// Seconds before an open circuit breaker allows a retry
    pub here_cb_recovery_secs: u64,

    /// Where run history is persisted
    pub history_file: PathBuf,
}

pub const DEFAULT_HERE_BASE_URL: &str = "https://geocode.search.hereapi.com";
pub const DEFAULT_HERE_RATE_LIMIT_MS: u64 = 200;
pub const DEFAULT_CIRCUIT_BREAKER_THRESHOLD: u32 = 3;
pub const DEFAULT_CIRCUIT_BREAKER_RECOVERY_SECS: u64 = 300;

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let backend_raw = std::env::var("GEOCODER_BACKEND").unwrap_or_default();
        let geocoder_backend = GeocoderBackend::parse(&backend_raw)
            .with_context(|| format!("GEOCODER_BACKEND '{}' must be one of none, mock, here", backend_raw))?;

        let here_api_key = std::env::var("HERE_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());

        let here_base_url = std::env::var("HERE_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_HERE_BASE_URL.to_string());

        let here_rate_limit_ms = parse_env_or("HERE_RATE_LIMIT_MS", DEFAULT_HERE_RATE_LIMIT_MS)?;
        let here_cb_threshold = parse_env_or("HERE_CB_THRESHOLD", DEFAULT_CIRCUIT_BREAKER_THRESHOLD)?;
        let here_cb_recovery_secs =
            parse_env_or("HERE_CB_RECOVERY_SECS", DEFAULT_CIRCUIT_BREAKER_RECOVERY_SECS)?;

        let history_file = std::env::var("HISTORY_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("logs/run-history.json"));

        if geocoder_backend == GeocoderBackend::Here && here_api_key.is_none() {
            tracing::warn!("GEOCODER_BACKEND=here but HERE_API_KEY is not set; addresses will use fallback coordinates");
        }

        Ok(Self {
            geocoder_backend,
            here_api_key,
            here_base_url,
            here_rate_limit_ms,
            here_cb_threshold,
            here_cb_recovery_secs,
            history_file,
        })
    }
}

fn parse_env_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has invalid value '{}'", name, raw)),
        Err(_) => Ok(default),
    }
}

/// Read and validate a run configuration file
pub fn load_simulation_config(path: &std::path::Path) -> Result<SimulationConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: SimulationConfig = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid config file {}", path.display()))?;
    Ok(config)
}
