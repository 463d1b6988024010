//! Per-assignment timing shared by both dispatch loops.
//!
//! One pump with `trucks` trucks serves all loads of one site. Trucks cycle
//! between plant and site, so the site is busy for
//! `cycle × loads / trucks` minutes after the pump arrives, and the loads are
//! staggered evenly over that window.

use chrono::{Duration, NaiveDateTime};

use crate::error::DispatchError;
use crate::services::geo::travel_time_minutes;
use crate::types::{
    pump_label, truck_label, Coordinates, CycleTiming, DeliveryEvent, DeliveryStatus, Site,
};

/// Computed timing of one pump → site assignment (minutes from schedule start)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LegPlan {
    pub travel_minutes: f64,
    /// load + round trip + unload for a single load
    pub cycle_minutes: f64,
    /// Time the pump spends on site for all loads
    pub duration_minutes: f64,
    pub arrival: f64,
    pub finish: f64,
    /// Spacing between consecutive load starts
    pub interval: f64,
}

/// Plan a pump leaving `from` at `depart_at` for `site`.
///
/// `not_before` holds the arrival back (a pinned start time); the pump idles
/// on site until then.
pub fn plan_leg(
    timing: CycleTiming,
    from: &Coordinates,
    site: &Site,
    trucks: u32,
    depart_at: f64,
    not_before: Option<f64>,
) -> LegPlan {
    let travel_minutes = travel_time_minutes(from, &site.location);
    let cycle_minutes = timing.load_minutes + 2.0 * travel_minutes + timing.unload_minutes;
    let loads = site.loads as f64;
    let duration_minutes = cycle_minutes * loads / trucks as f64;

    let earliest = depart_at + travel_minutes;
    let arrival = match not_before {
        Some(pinned) if pinned > earliest => pinned,
        _ => earliest,
    };

    LegPlan {
        travel_minutes,
        cycle_minutes,
        duration_minutes,
        arrival,
        finish: arrival + duration_minutes,
        interval: duration_minutes / loads,
    }
}

/// Emit one unloading event per load of `site`, round-robin over the
/// pump's trucks.
pub fn emit_events(
    site: &Site,
    pump_id: u32,
    trucks: u32,
    plan: &LegPlan,
    timing: CycleTiming,
    schedule_start: NaiveDateTime,
) -> Result<Vec<DeliveryEvent>, DispatchError> {
    let unload_span = plan.interval.min(timing.unload_minutes);

    (0..site.loads)
        .map(|l| {
            let start = plan.arrival + l as f64 * plan.interval;
            let end = start + unload_span;
            Ok(DeliveryEvent {
                id: format!("{}-L{}", site.id, l + 1),
                site_id: site.id.clone(),
                truck_id: truck_label(pump_id, l % trucks + 1),
                pump_id: pump_label(pump_id),
                load_number: l + 1,
                start_time: offset_timestamp(schedule_start, start)?,
                end_time: offset_timestamp(schedule_start, end)?,
                start_offset_minutes: start,
                end_offset_minutes: end,
                status: DeliveryStatus::Unloading,
            })
        })
        .collect()
}

/// Wall-clock time `minutes` after `start`, at millisecond precision
pub fn offset_timestamp(start: NaiveDateTime, minutes: f64) -> Result<NaiveDateTime, DispatchError> {
    let millis = (minutes * 60_000.0).round();
    // i64 bounds are exclusive at the top after the f64 round trip
    if !(millis.is_finite() && millis > i64::MIN as f64 && millis < i64::MAX as f64) {
        return Err(DispatchError::TimestampOutOfRange { minutes });
    }
    Duration::try_milliseconds(millis as i64)
        .and_then(|offset| start.checked_add_signed(offset))
        .ok_or(DispatchError::TimestampOutOfRange { minutes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(5, 0, 0)
            .unwrap()
    }

    fn timing() -> CycleTiming {
        CycleTiming { load_minutes: 30.0, unload_minutes: 10.0 }
    }

    fn site_at(lat: f64, lng: f64, loads: u32) -> Site {
        Site {
            id: "W-1".to_string(),
            name: "Site 1".to_string(),
            address: "Rua Geral 100".to_string(),
            location: Coordinates::new(lat, lng),
            loads,
            volume: loads as f64 * 8.0,
            trucks_assigned: None,
        }
    }

    #[test]
    fn test_plan_leg_worked_example() {
        let depot = Coordinates::new(-26.8955, -48.6757);
        let site = site_at(-26.8900, -48.6800, 4);

        let plan = plan_leg(timing(), &depot, &site, 2, 0.0, None);

        assert!((plan.travel_minutes - 11.49112).abs() < 1e-4);
        assert!((plan.cycle_minutes - 62.98225).abs() < 1e-4);
        assert!((plan.duration_minutes - 125.96450).abs() < 1e-4);
        assert!((plan.arrival - plan.travel_minutes).abs() < 1e-12);
        assert!((plan.finish - (plan.arrival + plan.duration_minutes)).abs() < 1e-12);
        assert!((plan.interval - plan.duration_minutes / 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_plan_leg_waits_for_pinned_start() {
        let here = Coordinates::new(-26.8955, -48.6757);
        let site = site_at(-26.8955, -48.6757, 2);

        // Zero distance: travel is the 10 minute base.
        let early = plan_leg(timing(), &here, &site, 1, 0.0, Some(120.0));
        assert_eq!(early.arrival, 120.0);

        let late = plan_leg(timing(), &here, &site, 1, 200.0, Some(120.0));
        assert_eq!(late.arrival, 210.0);
    }

    #[test]
    fn test_emit_events_staggers_loads() {
        let depot = Coordinates::new(-26.8955, -48.6757);
        let site = site_at(-26.8900, -48.6800, 4);
        let plan = plan_leg(timing(), &depot, &site, 2, 0.0, None);

        let events = emit_events(&site, 1, 2, &plan, timing(), start()).unwrap();

        assert_eq!(events.len(), 4);
        for (l, event) in events.iter().enumerate() {
            let expected = plan.arrival + l as f64 * plan.interval;
            assert!((event.start_offset_minutes - expected).abs() < 1e-9);
            // interval (~31.5 min) exceeds unload time, so each event spans the unload
            assert!((event.end_offset_minutes - event.start_offset_minutes - 10.0).abs() < 1e-9);
            assert_eq!(event.load_number, l as u32 + 1);
            assert_eq!(event.pump_id, "Pump 1");
            assert_eq!(event.status, DeliveryStatus::Unloading);
        }
        assert_eq!(events[0].truck_id, "Pump 1-T1");
        assert_eq!(events[1].truck_id, "Pump 1-T2");
        assert_eq!(events[2].truck_id, "Pump 1-T1");
        assert_eq!(events[3].id, "W-1-L4");

        // Last load starts one interval before the pump leaves.
        let last = events[3].start_offset_minutes;
        assert!((plan.finish - last - plan.interval).abs() < 1e-9);
    }

    #[test]
    fn test_event_end_capped_by_interval() {
        let here = Coordinates::new(-26.8955, -48.6757);
        let site = site_at(-26.8955, -48.6757, 3);
        // cycle = 30 + 20 + 10 = 60, 12 trucks: 3 loads in 15 min, interval 5 < unload 10
        let plan = plan_leg(timing(), &here, &site, 12, 0.0, None);
        let events = emit_events(&site, 2, 12, &plan, timing(), start()).unwrap();

        for event in &events {
            assert!((event.end_offset_minutes - event.start_offset_minutes - 5.0).abs() < 1e-9);
            assert!(event.end_time >= event.start_time);
        }
    }

    #[test]
    fn test_offset_timestamp() {
        let t = offset_timestamp(start(), 90.5).unwrap();
        assert_eq!(
            t,
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap().and_hms_opt(6, 30, 30).unwrap()
        );
    }

    #[test]
    fn test_offset_timestamp_out_of_range_is_an_error() {
        for minutes in [1.0e12, -1.0e12, 1.0e300, f64::NAN, f64::INFINITY] {
            assert!(
                matches!(
                    offset_timestamp(start(), minutes),
                    Err(DispatchError::TimestampOutOfRange { .. })
                ),
                "{} minutes accepted",
                minutes
            );
        }
    }

    #[test]
    fn test_emit_events_reports_overflow() {
        let here = Coordinates::new(-26.8955, -48.6757);
        let site = site_at(-26.8955, -48.6757, 2);
        let slow = CycleTiming { load_minutes: 1.0e12, unload_minutes: 10.0 };
        let plan = plan_leg(slow, &here, &site, 1, 0.0, None);

        assert!(emit_events(&site, 1, 1, &plan, slow, start()).is_err());
    }
}
