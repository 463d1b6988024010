//! End-to-end run: validate, locate demand, dispatch, aggregate.

use anyhow::Result;
use tracing::{debug, info};

use crate::services::aggregator::build_result;
use crate::services::demand::{prepare_sites, resolve_depot};
use crate::services::dispatch::{dispatch, DispatchParams};
use crate::services::geocoding::Geocoder;
use crate::types::{validate_demand, ImportedSite, SimulationConfig, SimulationResult};

/// Run one dispatch simulation.
///
/// `imported` takes precedence over `config.sites`; with neither, synthetic
/// demand is generated. Geocoding completes before dispatch starts.
pub async fn run_simulation(
    config: &SimulationConfig,
    imported: Option<&[ImportedSite]>,
    geocoder: Option<&dyn Geocoder>,
) -> Result<SimulationResult> {
    config.validate()?;
    if let Some(rows) = imported {
        validate_demand(rows)?;
    }

    if config.generations.is_some() || config.pop_size.is_some() {
        debug!(
            "Ignoring generations={:?} popSize={:?}; dispatch is greedy",
            config.generations, config.pop_size
        );
    }

    let depot = resolve_depot(&config.depot, geocoder).await;
    let demand = imported.unwrap_or(config.sites.as_slice());
    let sites = prepare_sites(config, demand, geocoder).await;

    info!(
        "Dispatching {} sites in {} mode: {} trucks, {} pumps, start {}",
        sites.len(),
        config.mode.as_str(),
        config.total_trucks,
        config.total_pumps,
        config.schedule_start()
    );

    let params = DispatchParams::from_config(config, depot);
    let outcome = dispatch(&params, &sites)?;
    let result = build_result(outcome, depot, params.schedule_start);

    info!(
        "Run finished: {} trips, completion {}",
        result.summary.total_trips, result.summary.completion_time
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::geocoding::MockGeocoder;
    use crate::types::{Constraint, DispatchMode};
    use chrono::{NaiveDate, NaiveTime};

    fn config(mode: DispatchMode) -> SimulationConfig {
        SimulationConfig::new(mode, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap())
    }

    fn rows(loads: &[i64]) -> Vec<ImportedSite> {
        loads
            .iter()
            .enumerate()
            .map(|(i, &l)| ImportedSite {
                loads: l,
                address: format!("Rua Geral {}, Navegantes", (i + 1) * 100),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_synthetic_optimizer_run_conserves_loads() {
        let config = config(DispatchMode::Optimizer);

        let result = run_simulation(&config, None, None).await.unwrap();

        assert_eq!(result.sites.len(), 15);
        let total_loads: u32 = result.sites.iter().map(|s| s.loads).sum();
        assert_eq!(result.summary.total_trips, total_loads as usize);
        assert!(result.sites.iter().all(|s| s.trucks_assigned.is_some()));
    }

    #[tokio::test]
    async fn test_run_is_deterministic() {
        let config = config(DispatchMode::Optimizer);

        let a = run_simulation(&config, None, None).await.unwrap();
        let b = run_simulation(&config, None, None).await.unwrap();

        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[tokio::test]
    async fn test_imported_rows_override_config_sites() {
        let mut config = config(DispatchMode::Optimizer);
        config.sites = rows(&[9, 9, 9]);
        let imported = rows(&[2, 3]);

        let result = run_simulation(&config, Some(imported.as_slice()), None).await.unwrap();

        assert_eq!(result.sites.len(), 2);
        assert_eq!(result.summary.total_trips, 5);
    }

    #[tokio::test]
    async fn test_config_sites_used_without_import() {
        let mut config = config(DispatchMode::Optimizer);
        config.sites = rows(&[4, 0]);

        let result = run_simulation(&config, None, Some(&MockGeocoder::new())).await.unwrap();

        assert_eq!(result.sites.len(), 2);
        assert_eq!(result.summary.total_trips, 5);
    }

    #[tokio::test]
    async fn test_hybrid_run_honors_locked_start() {
        let mut config = config(DispatchMode::Hybrid);
        config.total_trucks = 8;
        config.total_pumps = 2;
        config.constraints = vec![Constraint {
            site_index: 0,
            forced_trucks: 3,
            forced_pump_id: 2,
            forced_start_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            locked: true,
        }];

        let result = run_simulation(&config, Some(rows(&[4, 3]).as_slice()), None).await.unwrap();

        let first = result
            .schedule
            .iter()
            .filter(|e| e.site_id == "W-1")
            .map(|e| e.start_time)
            .min()
            .unwrap();
        assert!(first >= NaiveDate::from_ymd_opt(2024, 3, 15).unwrap().and_hms_opt(8, 0, 0).unwrap());
        assert_eq!(result.sites[0].trucks_assigned, Some(3));
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let mut config = config(DispatchMode::Optimizer);
        config.total_pumps = 0;

        assert!(run_simulation(&config, None, None).await.is_err());
    }

    #[tokio::test]
    async fn test_non_finite_jitter_fails_instead_of_hanging() {
        let mut config = config(DispatchMode::Optimizer);
        config.fallback_jitter_degrees = f64::NAN;

        let err = run_simulation(&config, None, None).await.unwrap_err();
        assert!(format!("{:#}", err).contains("jitter"));
    }

    #[tokio::test]
    async fn test_huge_load_time_is_rejected() {
        let mut config = config(DispatchMode::Optimizer);
        config.load_time_minutes = 1.0e12;

        assert!(run_simulation(&config, None, None).await.is_err());
    }

    #[tokio::test]
    async fn test_oversized_imported_rows_are_rejected() {
        let config = config(DispatchMode::Optimizer);
        let imported = rows(&[3, 1_000_000]);

        let err = run_simulation(&config, Some(imported.as_slice()), None).await.unwrap_err();
        assert!(format!("{:#}", err).contains("1000000 loads"));
    }

    #[tokio::test]
    async fn test_ignored_search_fields_do_not_change_result() {
        let plain = config(DispatchMode::Optimizer);
        let mut tuned = plain.clone();
        tuned.generations = Some(500);
        tuned.pop_size = Some(80);

        let a = run_simulation(&plain, None, None).await.unwrap();
        let b = run_simulation(&tuned, None, None).await.unwrap();

        assert_eq!(a.schedule, b.schedule);
    }
}
