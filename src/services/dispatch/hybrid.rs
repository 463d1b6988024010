//! Hybrid dispatch loop: user-locked sites first, the rest auto-filled.
//!
//! Locked sites are commitments (pump, crew size, desired start). They are
//! honored in order of desired start, subject only to the pump finishing its
//! previous job and driving over. Unlocked sites then go, heaviest first, to
//! whichever pump frees up earliest, using the trucks left over after the
//! locked commitments.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use super::timing::{emit_events, plan_leg};
use super::{DispatchOutcome, DispatchParams, PumpResource};
use crate::error::DispatchError;
use crate::types::{Assignment, Constraint, Site};

/// A locked site with its constraint resolved against the pump set
#[derive(Debug, Clone, Copy)]
struct LockedSite {
    index: usize,
    pump_id: u32,
    trucks: u32,
    not_before: f64,
}

/// First constraint per in-range site index
fn constraints_by_site<'a>(constraints: &'a [Constraint], site_count: usize) -> HashMap<usize, &'a Constraint> {
    let mut by_site = HashMap::new();
    for constraint in constraints {
        if constraint.site_index >= site_count {
            warn!(
                "Ignoring constraint for site index {} (only {} sites)",
                constraint.site_index, site_count
            );
            continue;
        }
        by_site.entry(constraint.site_index).or_insert(constraint);
    }
    by_site
}

/// Forced pump id if it exists, otherwise pump 1
fn resolve_pump_id(forced: u32, total_pumps: u32, site_id: &str) -> u32 {
    if (1..=total_pumps).contains(&forced) {
        forced
    } else {
        warn!(
            "Site {} pinned to pump {} but only {} pumps exist; using pump 1",
            site_id, forced, total_pumps
        );
        1
    }
}

fn pump_mut(pumps: &mut [PumpResource], id: u32) -> Result<&mut PumpResource, DispatchError> {
    pumps
        .iter_mut()
        .find(|p| p.id == id)
        .ok_or(DispatchError::UnknownPump(id))
}

/// Trucks per pump for auto-assigned sites: what the locked sites leave of
/// the fleet, split evenly over pumps no locked site names (every pump when
/// all are named). Never below one.
pub fn residual_trucks_per_pump(total_trucks: u32, total_pumps: u32, locked_trucks: u32, locked_pumps: usize) -> u32 {
    let free_slots = (total_pumps as usize).saturating_sub(locked_pumps);
    let slots = if free_slots == 0 { total_pumps.max(1) } else { free_slots as u32 };
    (total_trucks.saturating_sub(locked_trucks) / slots).max(1)
}

/// Schedule locked sites exactly as pinned, then fill in the rest
pub fn run_hybrid(params: &DispatchParams, sites: &[Site]) -> Result<DispatchOutcome, DispatchError> {
    if params.total_pumps == 0 {
        return Err(DispatchError::NoPumps);
    }

    let by_site = constraints_by_site(&params.constraints, sites.len());

    let mut locked: Vec<LockedSite> = Vec::new();
    let mut unlocked: Vec<usize> = Vec::new();
    for (index, site) in sites.iter().enumerate() {
        match by_site.get(&index) {
            Some(c) if c.locked => locked.push(LockedSite {
                index,
                pump_id: resolve_pump_id(c.forced_pump_id, params.total_pumps, &site.id),
                trucks: c.forced_trucks.max(1),
                not_before: params.minutes_until(c.forced_start_time),
            }),
            _ => unlocked.push(index),
        }
    }
    locked.sort_by(|a, b| a.not_before.total_cmp(&b.not_before));

    let locked_trucks: u32 = locked.iter().map(|l| l.trucks).sum();
    let locked_pumps: HashSet<u32> = locked.iter().map(|l| l.pump_id).collect();
    let auto_trucks = residual_trucks_per_pump(
        params.total_trucks,
        params.total_pumps,
        locked_trucks,
        locked_pumps.len(),
    );
    debug!(
        "Hybrid run: {} locked sites ({} trucks), {} auto sites at {} trucks per pump",
        locked.len(),
        locked_trucks,
        unlocked.len(),
        auto_trucks
    );

    let mut pumps: Vec<PumpResource> = (1..=params.total_pumps)
        .map(|id| PumpResource::at_depot(id, auto_trucks, params.depot))
        .collect();

    let mut outcome = DispatchOutcome {
        sites: sites.to_vec(),
        ..Default::default()
    };

    for pin in &locked {
        let site = &sites[pin.index];
        let pump = pump_mut(&mut pumps, pin.pump_id)?;

        let plan = plan_leg(
            params.timing,
            &pump.location,
            site,
            pin.trucks,
            pump.available_at,
            Some(pin.not_before),
        );

        debug!(
            "Locked {} on pump {} ({} trucks): arrive {:.1} (pinned {:.1}), finish {:.1}",
            site.id, pump.id, pin.trucks, plan.arrival, pin.not_before, plan.finish
        );

        outcome.events.extend(emit_events(
            site,
            pump.id,
            pin.trucks,
            &plan,
            params.timing,
            params.schedule_start,
        )?);
        outcome.assignments.push(Assignment {
            site_id: site.id.clone(),
            pump_id: pump.id,
            trucks: pin.trucks,
            available_at: pump.available_at,
            travel_minutes: plan.travel_minutes,
            arrival: plan.arrival,
            finish: plan.finish,
            locked: true,
        });
        outcome.sites[pin.index] = site.with_trucks(pin.trucks);

        pump.available_at = plan.finish;
        pump.location = site.location;
    }

    unlocked.sort_by(|&a, &b| sites[b].loads.cmp(&sites[a].loads));

    for index in unlocked {
        let site = &sites[index];
        pumps.sort_by(|a, b| a.available_at.total_cmp(&b.available_at));
        let pump = &mut pumps[0];

        let plan = plan_leg(params.timing, &pump.location, site, pump.trucks, pump.available_at, None);

        debug!(
            "Auto {} on pump {} ({} trucks): arrive {:.1}, finish {:.1}",
            site.id, pump.id, pump.trucks, plan.arrival, plan.finish
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
        outcome.sites[index] = site.with_trucks(pump.trucks);

        pump.available_at = plan.finish;
        pump.location = site.location;
    }

    Ok(outcome)
}
