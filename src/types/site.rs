//! Site and location types

use serde::{Deserialize, Serialize};

/// Geographic coordinates in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// A demand point (worksite) requiring a fixed number of truck loads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub id: String,
    pub name: String,
    pub address: String,
    pub location: Coordinates,
    pub loads: u32,
    /// Total volume in m³ (loads × truck capacity)
    pub volume: f64,
    /// Trucks serving this site; set once a dispatch loop has assigned it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trucks_assigned: Option<u32>,
}

impl Site {
    /// Site id for the 0-based position in the site list
    pub fn id_for_index(index: usize) -> String {
        format!("W-{}", index + 1)
    }

    /// Copy of this site with its truck assignment recorded
    pub fn with_trucks(&self, trucks: u32) -> Self {
        Self {
            trucks_assigned: Some(trucks),
            ..self.clone()
        }
    }
}

/// Raw imported demand row: how many loads and where
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedSite {
    pub loads: i64,
    pub address: String,
}
