//! Run configuration types

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use super::{Coordinates, ImportedSite};
use crate::defaults;
use crate::error::ConfigError;

/// Which scheduling strategy a run uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Fully automatic greedy allocation
    Optimizer,
    /// User-locked sites first, remaining sites auto-assigned
    #[serde(alias = "simulator")]
    Hybrid,
}

impl DispatchMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            DispatchMode::Optimizer => "optimizer",
            DispatchMode::Hybrid => "hybrid",
        }
    }

    /// How many synthetic sites to generate when nothing was imported
    pub const fn synthetic_site_count(self) -> usize {
        match self {
            DispatchMode::Optimizer => 15,
            DispatchMode::Hybrid => 5,
        }
    }
}

impl std::str::FromStr for DispatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "optimizer" => Ok(DispatchMode::Optimizer),
            "hybrid" | "simulator" => Ok(DispatchMode::Hybrid),
            other => Err(format!("unknown mode '{}'", other)),
        }
    }
}

/// Depot location: explicit coordinates win over an address to geocode
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepotInput {
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
    #[serde(default)]
    pub address: Option<String>,
}

impl DepotInput {
    pub fn explicit(&self) -> Option<Coordinates> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite() => {
                Some(Coordinates::new(lat, lng))
            }
            _ => None,
        }
    }
}

/// User-pinned assignment for one site (hybrid mode)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraint {
    /// 0-based position of the site in the site list
    pub site_index: usize,
    pub forced_trucks: u32,
    /// 1-based pump id
    pub forced_pump_id: u32,
    #[serde(with = "hhmm")]
    pub forced_start_time: NaiveTime,
    #[serde(default)]
    pub locked: bool,
}

impl Constraint {
    /// Placeholder constraints for `site_count` sites: four trucks, pumps
    /// round-robin, start at the shift start, the first `locked_count` locked.
    pub fn defaults_for(
        site_count: usize,
        total_pumps: u32,
        start_time: NaiveTime,
        locked_count: usize,
    ) -> Vec<Constraint> {
        let pumps = total_pumps.max(1) as usize;
        (0..site_count)
            .map(|idx| Constraint {
                site_index: idx,
                forced_trucks: defaults::DEFAULT_FORCED_TRUCKS,
                forced_pump_id: (idx % pumps) as u32 + 1,
                forced_start_time: start_time,
                locked: idx < locked_count,
            })
            .collect()
    }
}

/// Everything a single dispatch run needs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationConfig {
    pub mode: DispatchMode,
    #[serde(default)]
    pub depot: DepotInput,
    #[serde(default = "defaults::default_load_time")]
    pub load_time_minutes: f64,
    #[serde(default = "defaults::default_unload_time")]
    pub unload_time_minutes: f64,
    /// m³ carried per truck
    #[serde(default = "defaults::default_truck_capacity")]
    pub truck_capacity: f64,
    #[serde(default = "defaults::default_total_trucks")]
    pub total_trucks: u32,
    #[serde(default = "defaults::default_total_pumps")]
    pub total_pumps: u32,
    pub start_date: NaiveDate,
    #[serde(with = "hhmm", default = "defaults::default_start_time")]
    pub start_time: NaiveTime,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
    /// Seed for fallback coordinates and synthetic demand
    #[serde(default = "defaults::default_seed")]
    pub seed: u64,
    /// Max jitter (degrees, full width) applied to fallback coordinates
    #[serde(default = "defaults::default_fallback_jitter")]
    pub fallback_jitter_degrees: f64,
    /// Appended to addresses before geocoding unless already present
    #[serde(default)]
    pub region_suffix: Option<String>,
    /// Inline demand; a `--sites` file takes precedence
    #[serde(default)]
    pub sites: Vec<ImportedSite>,
    /// Accepted for compatibility, not used by the greedy dispatcher
    #[serde(default)]
    pub generations: Option<u32>,
    /// Accepted for compatibility, not used by the greedy dispatcher
    #[serde(default)]
    pub pop_size: Option<u32>,
}

impl SimulationConfig {
    /// Default parameters for `mode` on `start_date`
    pub fn new(mode: DispatchMode, start_date: NaiveDate) -> Self {
        Self {
            mode,
            depot: DepotInput::default(),
            load_time_minutes: defaults::default_load_time(),
            unload_time_minutes: defaults::default_unload_time(),
            truck_capacity: defaults::default_truck_capacity(),
            total_trucks: defaults::default_total_trucks(),
            total_pumps: defaults::default_total_pumps(),
            start_date,
            start_time: defaults::default_start_time(),
            constraints: Vec::new(),
            seed: defaults::default_seed(),
            fallback_jitter_degrees: defaults::default_fallback_jitter(),
            region_suffix: None,
            sites: Vec::new(),
            generations: None,
            pop_size: None,
        }
    }

    /// Instant the schedule starts; all minute offsets are relative to it
    pub fn schedule_start(&self) -> NaiveDateTime {
        self.start_date.and_time(self.start_time)
    }

    pub fn timing(&self) -> CycleTiming {
        CycleTiming {
            load_minutes: self.load_time_minutes,
            unload_minutes: self.unload_time_minutes,
        }
    }

    /// Reject configurations the dispatch engine cannot handle
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.total_pumps == 0 {
            return Err(ConfigError::NoPumps);
        }
        if self.total_trucks < self.total_pumps {
            return Err(ConfigError::FleetTooSmall {
                trucks: self.total_trucks,
                pumps: self.total_pumps,
            });
        }
        if !(self.truck_capacity.is_finite() && self.truck_capacity > 0.0) {
            return Err(ConfigError::InvalidCapacity(self.truck_capacity));
        }
        for (field, value) in [
            ("loadTimeMinutes", self.load_time_minutes),
            ("unloadTimeMinutes", self.unload_time_minutes),
        ] {
            if !(value.is_finite() && (0.0..=defaults::MAX_STAGE_MINUTES).contains(&value)) {
                return Err(ConfigError::InvalidDuration {
                    field,
                    value,
                    max: defaults::MAX_STAGE_MINUTES,
                });
            }
        }
        if !(self.fallback_jitter_degrees.is_finite() && self.fallback_jitter_degrees >= 0.0) {
            return Err(ConfigError::InvalidJitter(self.fallback_jitter_degrees));
        }
        validate_demand(&self.sites)?;
        if let Some(depot) = self.depot.explicit() {
            if !depot.is_valid() {
                return Err(ConfigError::InvalidDepot {
                    lat: depot.lat,
                    lng: depot.lng,
                });
            }
        }
        Ok(())
    }
}

/// Reject demand rows with more loads than a single site can take
pub fn validate_demand(sites: &[ImportedSite]) -> Result<(), ConfigError> {
    match sites
        .iter()
        .enumerate()
        .find(|(_, row)| row.loads >= defaults::MAX_SITE_LOADS)
    {
        Some((index, row)) => Err(ConfigError::TooManyLoads {
            index,
            loads: row.loads,
            max: defaults::MAX_SITE_LOADS - 1,
        }),
        None => Ok(()),
    }
}

/// Per-load fixed durations shared by both dispatch loops
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleTiming {
    pub load_minutes: f64,
    pub unload_minutes: f64,
}

/// `HH:MM` (seconds optional) serde format for times of day
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse(s: &str) -> Option<NaiveTime> {
        let s = s.trim();
        NaiveTime::parse_from_str(s, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
            .ok()
    }

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid time '{}', expected HH:MM", raw)))
    }
}
