//! Folds dispatch output into the final schedule and its summary.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::defaults::REPORTED_EFFICIENCY;
use crate::services::dispatch::DispatchOutcome;
use crate::types::{Coordinates, DeliveryEvent, ScheduleSummary, SimulationResult, Site};

/// Display format of the completion time
const COMPLETION_FORMAT: &str = "%d/%m %H:%M";

/// Build the run result: events sorted by start time plus summary.
///
/// With no events the completion time is the schedule start.
pub fn build_result(
    outcome: DispatchOutcome,
    depot: Coordinates,
    schedule_start: NaiveDateTime,
) -> SimulationResult {
    let DispatchOutcome {
        sites,
        mut events,
        assignments,
    } = outcome;

    events.sort_by(|a, b| a.start_time.cmp(&b.start_time));

    let completion_at = events
        .iter()
        .map(|e| e.end_time)
        .max()
        .unwrap_or(schedule_start);

    SimulationResult {
        sites,
        depot,
        summary: ScheduleSummary {
            total_trips: events.len(),
            completion_time: completion_at.format(COMPLETION_FORMAT).to_string(),
            completion_at,
            efficiency: REPORTED_EFFICIENCY,
        },
        schedule: events,
        assignments,
    }
}

/// Per-site rollup of a finished schedule
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteSummary {
    pub site_id: String,
    pub name: String,
    pub address: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub duration_minutes: i64,
    pub pump_id: String,
    pub loads: u32,
    pub volume: f64,
    pub trucks: u32,
}

/// One row per site that received deliveries, in site order
pub fn site_summaries(sites: &[Site], schedule: &[DeliveryEvent]) -> Vec<SiteSummary> {
    sites
        .iter()
        .filter_map(|site| {
            let mut events = schedule.iter().filter(|e| e.site_id == site.id);
            let first = events.next()?;
            let (start, end, pump_id) = events.fold(
                (first.start_time, first.end_time, &first.pump_id),
                |(start, end, pump), e| {
                    if e.start_time < start {
                        (e.start_time, end.max(e.end_time), &e.pump_id)
                    } else {
                        (start, end.max(e.end_time), pump)
                    }
                },
            );
            Some(SiteSummary {
                site_id: site.id.clone(),
                name: site.name.clone(),
                address: site.address.clone(),
                start_time: start,
                end_time: end,
                duration_minutes: (end - start).num_minutes(),
                pump_id: pump_id.clone(),
                loads: site.loads,
                volume: site.volume,
                trucks: site.trucks_assigned.unwrap_or(0),
            })
        })
        .collect()
}
