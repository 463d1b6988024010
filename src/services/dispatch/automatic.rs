//! Automatic (optimizer) dispatch loop.
//!
//! Repeatedly takes every pump that is free at the earliest availability
//! instant, pairs the pump with the most trucks with the heaviest pending
//! site, the next with the next, and so on. No backtracking: ties keep
//! their current order.

use tracing::debug;

use super::timing::{emit_events, plan_leg};
use super::{allocate_fleet, DispatchOutcome, DispatchParams, PumpResource};
use crate::error::DispatchError;
use crate::services::geo::travel_time_minutes;
use crate::types::{Assignment, Site};

/// Pumps within this many minutes of the reference time count as free
const FREE_TOLERANCE_MINUTES: f64 = 0.01;

/// A site still waiting for a pump, with its workload estimate from the depot
#[derive(Debug, Clone, Copy)]
struct PendingSite {
    index: usize,
    unit_time_est: f64,
    loads: u32,
}

impl PendingSite {
    fn workload(&self) -> f64 {
        self.unit_time_est * self.loads as f64
    }
}

fn estimate_pending(params: &DispatchParams, sites: &[Site]) -> Vec<PendingSite> {
    let mut pending: Vec<PendingSite> = sites
        .iter()
        .enumerate()
        .map(|(index, site)| {
            let travel = travel_time_minutes(&params.depot, &site.location);
            PendingSite {
                index,
                unit_time_est: params.timing.load_minutes + 2.0 * travel + params.timing.unload_minutes,
                loads: site.loads,
            }
        })
        .collect();
    sort_by_workload(&mut pending);
    pending
}

fn sort_by_workload(pending: &mut [PendingSite]) {
    pending.sort_by(|a, b| b.workload().total_cmp(&a.workload()));
}

/// Indices of pumps free at `reference`
fn free_pumps(pumps: &[PumpResource], reference: f64) -> Vec<usize> {
    pumps
        .iter()
        .enumerate()
        .filter(|(_, p)| p.available_at <= reference + FREE_TOLERANCE_MINUTES)
        .map(|(i, _)| i)
        .collect()
}

/// Schedule every site with the greedy most-available-pump strategy
pub fn run_automatic(params: &DispatchParams, sites: &[Site]) -> Result<DispatchOutcome, DispatchError> {
    let mut pending = estimate_pending(params, sites);

    let workloads: Vec<f64> = pending.iter().map(PendingSite::workload).collect();
    let slots = allocate_fleet(&workloads, params.total_pumps as usize, params.total_trucks)?;
    debug!(
        "Fleet split across {} pumps: {:?}",
        slots.len(),
        slots.iter().map(|s| s.trucks).collect::<Vec<_>>()
    );

    let mut pumps: Vec<PumpResource> = slots
        .iter()
        .map(|slot| PumpResource::at_depot(slot.pump_id, slot.trucks, params.depot))
        .collect();

    let mut outcome = DispatchOutcome {
        sites: sites.to_vec(),
        ..Default::default()
    };

    while !pending.is_empty() {
        pumps.sort_by(|a, b| a.available_at.total_cmp(&b.available_at));
        let next_time = pumps[0].available_at;

        let mut free = free_pumps(&pumps, next_time);
        if free.is_empty() {
            let earliest = pumps
                .iter()
                .map(|p| p.available_at)
                .fold(f64::INFINITY, f64::min);
            free = free_pumps(&pumps, earliest);
        }
        if free.is_empty() {
            return Err(DispatchError::NoFreePump {
                pending: pending.len(),
            });
        }

        free.sort_by(|&a, &b| pumps[b].trucks.cmp(&pumps[a].trucks));
        sort_by_workload(&mut pending);

        let take = free.len().min(pending.len());
        let selected: Vec<PendingSite> = pending.drain(..take).collect();

        for (pump_idx, work) in free.into_iter().zip(selected) {
            let pump = &mut pumps[pump_idx];
            let site = &sites[work.index];

            let depart_at = pump.available_at.max(next_time);
            let plan = plan_leg(params.timing, &pump.location, site, pump.trucks, depart_at, None);

            debug!(
                "Pump {} ({} trucks) -> {}: arrive {:.1}, finish {:.1}",
                pump.id, pump.trucks, site.id, plan.arrival, plan.finish
            );

            outcome.events.extend(emit_events(
                site,
                pump.id,
                pump.trucks,
                &plan,
                params.timing,
                params.schedule_start,
            )?);
            outcome.assignments.push(Assignment {
                site_id: site.id.clone(),
                pump_id: pump.id,
                trucks: pump.trucks,
                available_at: pump.available_at,
                travel_minutes: plan.travel_minutes,
                arrival: plan.arrival,
                finish: plan.finish,
                locked: false,
            });
            outcome.sites[work.index] = site.with_trucks(pump.trucks);

            pump.available_at = plan.finish;
            pump.location = site.location;
        }
    }

    Ok(outcome)
}
