//! Demand preparation: turn imported or synthetic rows into located sites.
//!
//! Addresses are geocoded concurrently when a geocoder is configured and the
//! address looks real. Anything that cannot be located gets a deterministic
//! fallback coordinate near the depot.

use futures::future::join_all;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::defaults::DEFAULT_DEPOT;
use crate::services::geocoding::Geocoder;
use crate::types::{Coordinates, DepotInput, DispatchMode, ImportedSite, Site, SimulationConfig};

/// Inland points around Navegantes / Itajaí used when an address can't be located
const FALLBACK_POINTS: [Coordinates; 10] = [
    Coordinates::new(-26.8826, -48.6658),
    Coordinates::new(-26.8900, -48.6800),
    Coordinates::new(-26.8700, -48.6550),
    Coordinates::new(-26.9100, -48.6900),
    Coordinates::new(-26.9050, -48.6700),
    Coordinates::new(-26.8950, -48.7000),
    Coordinates::new(-26.8600, -48.6500),
    Coordinates::new(-26.9200, -48.6800),
    Coordinates::new(-26.8850, -48.6600),
    Coordinates::new(-26.9000, -48.6650),
];

/// Addresses containing any of these are never sent to the geocoder
const PLACEHOLDER_MARKERS: [&str; 3] = ["exemplo", "example", "sample"];

const MIN_ADDRESS_LEN: usize = 5;

const SYNTHETIC_MIN_LOADS: u32 = 3;
const SYNTHETIC_MAX_LOADS: u32 = 10;

/// Whether an address is worth a geocoding request
pub fn is_plausible_address(address: &str) -> bool {
    let trimmed = address.trim();
    if trimmed.chars().count() <= MIN_ADDRESS_LEN {
        return false;
    }
    let lower = trimmed.to_lowercase();
    !PLACEHOLDER_MARKERS.iter().any(|m| lower.contains(m))
}

/// Address as sent to the geocoder, with the region appended when missing
pub fn search_address(address: &str, region_suffix: Option<&str>) -> String {
    let address = address.trim();
    match region_suffix.map(str::trim).filter(|s| !s.is_empty()) {
        Some(suffix) if !address.to_lowercase().contains(&suffix.to_lowercase()) => {
            format!("{}, {}", address, suffix)
        }
        _ => address.to_string(),
    }
}

/// Deterministic fallback for the site at `index`: a fixed point cycled by
/// index plus jitter drawn from `seed + index`
pub fn fallback_coordinates(index: usize, seed: u64, jitter_degrees: f64) -> Coordinates {
    let base = FALLBACK_POINTS[index % FALLBACK_POINTS.len()];
    let mut rng = StdRng::seed_from_u64(seed.wrapping_add(index as u64));
    let jitter_lat = (rng.gen::<f64>() - 0.5) * jitter_degrees;
    let jitter_lng = (rng.gen::<f64>() - 0.5) * jitter_degrees;
    Coordinates::new(base.lat + jitter_lat, base.lng + jitter_lng)
}

/// Synthetic demand rows for runs without imported data
pub fn synthetic_demand(mode: DispatchMode, seed: u64) -> Vec<ImportedSite> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..mode.synthetic_site_count())
        .map(|i| ImportedSite {
            loads: rng.gen_range(SYNTHETIC_MIN_LOADS..=SYNTHETIC_MAX_LOADS) as i64,
            address: format!("Rua Exemplo {}, Navegantes - SC", i * 100),
        })
        .collect()
}

/// Resolve the depot: explicit coordinates, then a geocoded address, then
/// the default depot
pub async fn resolve_depot(input: &DepotInput, geocoder: Option<&dyn Geocoder>) -> Coordinates {
    if let Some(coords) = input.explicit() {
        return coords;
    }

    let address = match input.address.as_deref() {
        Some(a) if a.trim().chars().count() > MIN_ADDRESS_LEN => a,
        _ => return DEFAULT_DEPOT,
    };
    let Some(geocoder) = geocoder else {
        debug!("No geocoder configured, using default depot");
        return DEFAULT_DEPOT;
    };

    match geocoder.geocode(address).await {
        Ok(Some(found)) => {
            info!("Depot '{}' geocoded to ({}, {})", address, found.coordinates.lat, found.coordinates.lng);
            found.coordinates
        }
        Ok(None) => {
            warn!("Depot address '{}' not found, using default depot", address);
            DEFAULT_DEPOT
        }
        Err(e) => {
            warn!("Depot geocoding failed: {}, using default depot", e);
            DEFAULT_DEPOT
        }
    }
}

/// Build the site list for a run.
///
/// `imported` rows win; with none, synthetic demand is generated for the
/// run's mode. All lookups finish before this returns.
pub async fn prepare_sites(
    config: &SimulationConfig,
    imported: &[ImportedSite],
    geocoder: Option<&dyn Geocoder>,
) -> Vec<Site> {
    if imported.is_empty() {
        let rows = synthetic_demand(config.mode, config.seed);
        info!("No demand imported, generated {} synthetic sites", rows.len());
        return rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let location = fallback_coordinates(i, config.seed, config.fallback_jitter_degrees);
                build_site(i, format!("Residencial {}", i + 1), row, location, config.truck_capacity)
            })
            .collect();
    }

    let lookups = imported
        .iter()
        .enumerate()
        .map(|(i, row)| locate(i, &row.address, config, geocoder));
    let locations = join_all(lookups).await;

    let geocoded = locations.iter().filter(|(_, found)| *found).count();
    info!("Prepared {} imported sites ({} geocoded)", imported.len(), geocoded);

    imported
        .iter()
        .zip(locations)
        .enumerate()
        .map(|(i, (row, (location, _)))| {
            build_site(i, format!("Site {}", i + 1), row, location, config.truck_capacity)
        })
        .collect()
}

/// Coordinates for one imported row and whether they came from the geocoder
async fn locate(
    index: usize,
    address: &str,
    config: &SimulationConfig,
    geocoder: Option<&dyn Geocoder>,
) -> (Coordinates, bool) {
    let fallback = || fallback_coordinates(index, config.seed, config.fallback_jitter_degrees);

    let geocoder = match geocoder {
        Some(g) if is_plausible_address(address) => g,
        _ => return (fallback(), false),
    };

    let query = search_address(address, config.region_suffix.as_deref());
    match geocoder.geocode(&query).await {
        Ok(Some(found)) if found.coordinates.is_valid() => {
            debug!("Geocoded '{}' via {}", query, geocoder.name());
            (found.coordinates, true)
        }
        Ok(_) => {
            warn!("No geocoding result for '{}', using fallback coordinates", query);
            (fallback(), false)
        }
        Err(e) => {
            warn!("Geocoding '{}' failed: {}, using fallback coordinates", query, e);
            (fallback(), false)
        }
    }
}

fn build_site(index: usize, name: String, row: &ImportedSite, location: Coordinates, capacity: f64) -> Site {
    let loads = if row.loads > 0 {
        u32::try_from(row.loads).unwrap_or(u32::MAX)
    } else {
        1
    };
    Site {
        id: Site::id_for_index(index),
        name,
        address: row.address.clone(),
        location,
        loads,
        volume: loads as f64 * capacity,
        trucks_assigned: None,
    }
}
