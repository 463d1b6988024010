//! Schedule output types

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{Coordinates, Site};

/// Lifecycle tag of a delivery event. Only `Unloading` is produced today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Loading,
    Traveling,
    Unloading,
    Returning,
}

impl DeliveryStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            DeliveryStatus::Loading => "loading",
            DeliveryStatus::Traveling => "traveling",
            DeliveryStatus::Unloading => "unloading",
            DeliveryStatus::Returning => "returning",
        }
    }
}

/// One truck load delivered to a site (a schedule row)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryEvent {
    pub id: String,
    pub site_id: String,
    pub truck_id: String,
    pub pump_id: String,
    /// 1-based within the site
    pub load_number: u32,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    /// Minutes from schedule start
    pub start_offset_minutes: f64,
    pub end_offset_minutes: f64,
    pub status: DeliveryStatus,
}

/// Display label for a 1-based pump id
pub fn pump_label(pump_id: u32) -> String {
    format!("Pump {}", pump_id)
}

/// Display label for the `truck`-th (1-based) truck of a pump
pub fn truck_label(pump_id: u32, truck: u32) -> String {
    format!("Pump {}-T{}", pump_id, truck)
}

/// Record of one pump being sent to one site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub site_id: String,
    pub pump_id: u32,
    pub trucks: u32,
    /// Pump availability when the assignment was made
    pub available_at: f64,
    pub travel_minutes: f64,
    pub arrival: f64,
    pub finish: f64,
    pub locked: bool,
}

/// Headline numbers for a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSummary {
    pub total_trips: usize,
    /// `dd/mm HH:MM` of the last event end
    pub completion_time: String,
    pub completion_at: NaiveDateTime,
    pub efficiency: f64,
}

/// Full output of a dispatch run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub sites: Vec<Site>,
    pub depot: Coordinates,
    /// Sorted by start time
    pub schedule: Vec<DeliveryEvent>,
    pub assignments: Vec<Assignment>,
    pub summary: ScheduleSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(pump_label(3), "Pump 3");
        assert_eq!(truck_label(3, 2), "Pump 3-T2");
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&DeliveryStatus::Unloading).unwrap();
        assert_eq!(json, "\"unloading\"");
        assert_eq!(DeliveryStatus::Returning.as_str(), "returning");
    }
}
