//! Domain error types

use thiserror::Error;

/// Rejected run configuration. Checked before any dispatch loop starts.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("at least one pump is required")]
    NoPumps,

    #[error("fleet of {trucks} trucks cannot give every one of the {pumps} pumps a truck")]
    FleetTooSmall { trucks: u32, pumps: u32 },

    #[error("truck capacity must be positive (got {0})")]
    InvalidCapacity(f64),

    #[error("{field} must be between 0 and {max} minutes (got {value})")]
    InvalidDuration { field: &'static str, value: f64, max: f64 },

    #[error("fallback jitter must be a non-negative number of degrees (got {0})")]
    InvalidJitter(f64),

    #[error("site {index} has {loads} loads; at most {max} are allowed")]
    TooManyLoads { index: usize, loads: i64, max: i64 },

    #[error("depot coordinates out of range: ({lat}, {lng})")]
    InvalidDepot { lat: f64, lng: f64 },
}

/// Engine-level failures. These indicate inputs that bypassed validation.
#[derive(Debug, Error, PartialEq)]
pub enum DispatchError {
    #[error("cannot allocate trucks across zero pumps")]
    NoPumps,

    #[error("fleet of {trucks} trucks is smaller than the {pumps} pump slots")]
    FleetTooSmall { trucks: u32, pumps: usize },

    #[error("no pump can take the {pending} remaining sites (pump availability is not a number)")]
    NoFreePump { pending: usize },

    #[error("pump {0} does not exist")]
    UnknownPump(u32),

    #[error("event {minutes} minutes after schedule start is outside the representable date range")]
    TimestampOutOfRange { minutes: f64 },
}
