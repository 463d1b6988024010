//! Proportional fleet allocation across pumps.
//!
//! The heaviest sites (one per pump) decide how the fleet is split: each of
//! the first pumps gets a share of trucks proportional to one of those sites'
//! estimated total service time. A balancing pass then adds or removes single
//! trucks round-robin until the split sums to the fleet size exactly.

use serde::Serialize;

use crate::error::DispatchError;

/// Trucks owned by one pump for the whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FleetSlot {
    /// 1-based
    pub pump_id: u32,
    pub trucks: u32,
}

/// Split `total_trucks` across `pump_count` pumps.
///
/// `workloads` are estimated total service minutes per site, sorted
/// descending. Every pump gets at least one truck.
pub fn allocate_fleet(
    workloads: &[f64],
    pump_count: usize,
    total_trucks: u32,
) -> Result<Vec<FleetSlot>, DispatchError> {
    if pump_count == 0 {
        return Err(DispatchError::NoPumps);
    }
    if (total_trucks as usize) < pump_count {
        return Err(DispatchError::FleetTooSmall {
            trucks: total_trucks,
            pumps: pump_count,
        });
    }

    let top_n = pump_count.min(workloads.len());
    let sum_top: f64 = workloads[..top_n].iter().sum();

    let mut trucks: Vec<u32> = (0..pump_count)
        .map(|i| {
            if i < top_n {
                let share = if sum_top > 0.0 { workloads[i] / sum_top } else { 0.0 };
                ((share * total_trucks as f64).round() as u32).max(1)
            } else {
                1
            }
        })
        .collect();

    let target = total_trucks as i64;
    let mut current: i64 = trucks.iter().map(|&t| t as i64).sum();
    let mut cursor = 0usize;

    while current != target {
        let slot = &mut trucks[cursor % pump_count];
        if current < target {
            *slot += 1;
            current += 1;
        } else if *slot > 1 {
            *slot -= 1;
            current -= 1;
        }
        cursor += 1;
    }

    Ok(trucks
        .into_iter()
        .enumerate()
        .map(|(i, trucks)| FleetSlot {
            pump_id: i as u32 + 1,
            trucks,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn totals(slots: &[FleetSlot]) -> u32 {
        slots.iter().map(|s| s.trucks).sum()
    }

    #[test]
    fn test_proportional_split() {
        // 300 / 200 / 100 of 12 trucks -> 6 / 4 / 2
        let slots = allocate_fleet(&[300.0, 200.0, 100.0], 3, 12).unwrap();
        let trucks: Vec<u32> = slots.iter().map(|s| s.trucks).collect();
        assert_eq!(trucks, vec![6, 4, 2]);
        assert_eq!(slots[0].pump_id, 1);
        assert_eq!(slots[2].pump_id, 3);
    }

    #[test]
    fn test_rounding_surplus_is_removed() {
        // shares 1/3 each of 10 -> round(3.33) = 3 each, sum 9, one added to pump 1
        let slots = allocate_fleet(&[100.0, 100.0, 100.0], 3, 10).unwrap();
        let trucks: Vec<u32> = slots.iter().map(|s| s.trucks).collect();
        assert_eq!(trucks, vec![4, 3, 3]);
    }

    #[test]
    fn test_rounding_up_is_trimmed() {
        // shares 0.5 / 0.5 of 5 -> round(2.5) = 3 each, sum 6, pump 1 gives one back
        let slots = allocate_fleet(&[50.0, 50.0], 2, 5).unwrap();
        let trucks: Vec<u32> = slots.iter().map(|s| s.trucks).collect();
        assert_eq!(trucks, vec![2, 3]);
    }

    #[test]
    fn test_more_pumps_than_sites() {
        let slots = allocate_fleet(&[400.0], 4, 10).unwrap();
        let trucks: Vec<u32> = slots.iter().map(|s| s.trucks).collect();
        // top site takes all 10, other pumps get 1 each, then 3 are trimmed from pump 1
        assert_eq!(trucks, vec![7, 1, 1, 1]);
    }

    #[test]
    fn test_tiny_share_floors_to_one() {
        let slots = allocate_fleet(&[1000.0, 1.0], 2, 6).unwrap();
        assert!(slots.iter().all(|s| s.trucks >= 1));
        assert_eq!(totals(&slots), 6);
    }

    #[test]
    fn test_no_sites_gives_even_ones_then_balances() {
        let slots = allocate_fleet(&[], 3, 5).unwrap();
        let trucks: Vec<u32> = slots.iter().map(|s| s.trucks).collect();
        assert_eq!(trucks, vec![2, 2, 1]);
    }

    #[test]
    fn test_sum_matches_fleet_across_inputs() {
        let workloads = [812.0, 640.5, 611.0, 402.2, 380.0, 120.0, 95.5, 60.0];
        for pumps in 1..=8usize {
            for fleet in pumps as u32..=40 {
                let slots = allocate_fleet(&workloads, pumps, fleet).unwrap();
                assert_eq!(slots.len(), pumps);
                assert_eq!(totals(&slots), fleet, "pumps={} fleet={}", pumps, fleet);
                assert!(slots.iter().all(|s| s.trucks >= 1));
            }
        }
    }

    #[test]
    fn test_rejects_zero_pumps() {
        assert_eq!(allocate_fleet(&[10.0], 0, 5), Err(DispatchError::NoPumps));
    }

    #[test]
    fn test_rejects_fleet_smaller_than_pumps() {
        assert_eq!(
            allocate_fleet(&[10.0, 5.0], 3, 2),
            Err(DispatchError::FleetTooSmall { trucks: 2, pumps: 3 })
        );
    }
}
