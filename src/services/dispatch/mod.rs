//! Dispatch engine: fleet allocation and the two scheduling loops.
//!
//! Both loops are synchronous, single-threaded state machines over a set of
//! pump resources. They read a frozen snapshot of site coordinates and return
//! updated site copies plus the emitted delivery events.

pub mod allocator;
pub mod automatic;
pub mod hybrid;
pub mod timing;

pub use allocator::{allocate_fleet, FleetSlot};
pub use automatic::run_automatic;
pub use hybrid::run_hybrid;

use chrono::{NaiveDateTime, NaiveTime};

use crate::error::DispatchError;
use crate::types::{
    Assignment, Constraint, Coordinates, CycleTiming, DeliveryEvent, DispatchMode, Site,
    SimulationConfig,
};

/// A pump and the slice of the fleet it owns during a run
#[derive(Debug, Clone, PartialEq)]
pub struct PumpResource {
    /// 1-based
    pub id: u32,
    pub trucks: u32,
    pub location: Coordinates,
    /// Minutes from schedule start at which the pump may leave for its next job
    pub available_at: f64,
}

impl PumpResource {
    pub fn at_depot(id: u32, trucks: u32, depot: Coordinates) -> Self {
        Self {
            id,
            trucks,
            location: depot,
            available_at: 0.0,
        }
    }
}

/// Engine inputs derived from a validated `SimulationConfig`
#[derive(Debug, Clone)]
pub struct DispatchParams {
    pub mode: DispatchMode,
    pub depot: Coordinates,
    pub timing: CycleTiming,
    pub total_trucks: u32,
    pub total_pumps: u32,
    pub schedule_start: NaiveDateTime,
    pub constraints: Vec<Constraint>,
}

impl DispatchParams {
    pub fn from_config(config: &SimulationConfig, depot: Coordinates) -> Self {
        Self {
            mode: config.mode,
            depot,
            timing: config.timing(),
            total_trucks: config.total_trucks,
            total_pumps: config.total_pumps,
            schedule_start: config.schedule_start(),
            constraints: config.constraints.clone(),
        }
    }

    /// Minutes from schedule start to `time` on the schedule date
    pub fn minutes_until(&self, time: NaiveTime) -> f64 {
        let at = self.schedule_start.date().and_time(time);
        (at - self.schedule_start).num_seconds() as f64 / 60.0
    }
}

/// What a dispatch loop produced
#[derive(Debug, Clone, Default)]
pub struct DispatchOutcome {
    /// Input sites, in input order, with `trucks_assigned` filled in
    pub sites: Vec<Site>,
    /// Events in emission order
    pub events: Vec<DeliveryEvent>,
    pub assignments: Vec<Assignment>,
}

/// Run the loop selected by `params.mode`
pub fn dispatch(params: &DispatchParams, sites: &[Site]) -> Result<DispatchOutcome, DispatchError> {
    match params.mode {
        DispatchMode::Optimizer => run_automatic(params, sites),
        DispatchMode::Hybrid => run_hybrid(params, sites),
    }
}
