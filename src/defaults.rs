use chrono::NaiveTime;

use crate::types::Coordinates;

/// Depot used when neither coordinates nor a resolvable address are given
pub const DEFAULT_DEPOT: Coordinates = Coordinates::new(-26.8955, -48.6757);

pub const DEFAULT_FORCED_TRUCKS: u32 = 4;

/// Exclusive upper bound on loads for a single site
pub const MAX_SITE_LOADS: i64 = 500;

/// Upper bound for the load and unload durations of one truck cycle
pub const MAX_STAGE_MINUTES: f64 = 24.0 * 60.0;

/// Placeholder `efficiency` reported in every run summary
pub const REPORTED_EFFICIENCY: f64 = 94.5;

pub fn default_load_time() -> f64 {
    30.0
}

pub fn default_unload_time() -> f64 {
    10.0
}

pub fn default_truck_capacity() -> f64 {
    8.0
}

pub fn default_total_trucks() -> u32 {
    27
}

pub fn default_total_pumps() -> u32 {
    6
}

pub fn default_seed() -> u64 {
    42
}

pub fn default_fallback_jitter() -> f64 {
    0.002
}

pub fn default_start_time() -> NaiveTime {
    NaiveTime::from_hms_opt(5, 0, 0).unwrap_or(NaiveTime::MIN)
}
