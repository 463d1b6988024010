//! Schedule export as a ZIP workbook of CSV sheets

use std::collections::BTreeSet;
use std::io::{Cursor, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use tracing::info;
use zip::write::SimpleFileOptions;

use crate::services::aggregator::site_summaries;
use crate::types::{pump_label, DeliveryEvent, SimulationResult};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

fn fmt_time(t: &NaiveDateTime) -> String {
    t.format(TIME_FORMAT).to_string()
}

/// Build the workbook in memory.
///
/// Always contains `sites.csv`, `summary.csv` and `timeline.csv`; with
/// `per_pump` also one `pumps/pump-<n>.csv` per pump that received work.
pub fn export_workbook(result: &SimulationResult, per_pump: bool) -> Result<Vec<u8>> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    add_file(&mut zip, "sites.csv", &sites_csv(result)?, options)?;
    add_file(&mut zip, "summary.csv", &summary_csv(result)?, options)?;
    add_file(&mut zip, "timeline.csv", &timeline_csv(&result.schedule)?, options)?;

    if per_pump {
        let pumps: BTreeSet<u32> = result.assignments.iter().map(|a| a.pump_id).collect();
        for pump_id in pumps {
            let label = pump_label(pump_id);
            let events: Vec<DeliveryEvent> = result
                .schedule
                .iter()
                .filter(|e| e.pump_id == label)
                .cloned()
                .collect();
            let name = format!("pumps/pump-{}.csv", pump_id);
            add_file(&mut zip, &name, &timeline_csv(&events)?, options)?;
        }
    }

    let cursor = zip.finish().context("Failed to finalize ZIP")?;
    Ok(cursor.into_inner())
}

/// Write the workbook to `path`
pub fn write_workbook(path: &Path, result: &SimulationResult, per_pump: bool) -> Result<()> {
    let bytes = export_workbook(result, per_pump)?;
    std::fs::write(path, &bytes)
        .with_context(|| format!("Failed to write export {}", path.display()))?;
    info!("Exported schedule to {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

fn add_file(
    zip: &mut zip::ZipWriter<Cursor<Vec<u8>>>,
    name: &str,
    content: &[u8],
    options: SimpleFileOptions,
) -> Result<()> {
    zip.start_file(name, options)
        .with_context(|| format!("Failed to add {} to ZIP", name))?;
    zip.write_all(content)?;
    Ok(())
}

fn sites_csv(result: &SimulationResult) -> Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["id", "name", "address", "loads", "volume", "trucks", "lat", "lng"])?;
    for site in &result.sites {
        wtr.write_record([
            site.id.clone(),
            site.name.clone(),
            site.address.clone(),
            site.loads.to_string(),
            site.volume.to_string(),
            site.trucks_assigned.map(|t| t.to_string()).unwrap_or_default(),
            format!("{:.6}", site.location.lat),
            format!("{:.6}", site.location.lng),
        ])?;
    }
    wtr.into_inner().map_err(|e| anyhow::anyhow!("CSV write error: {}", e))
}

fn summary_csv(result: &SimulationResult) -> Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["site", "name", "start", "end", "duration_min", "pump", "loads", "volume", "trucks"])?;
    for row in site_summaries(&result.sites, &result.schedule) {
        wtr.write_record([
            row.site_id,
            row.name,
            fmt_time(&row.start_time),
            fmt_time(&row.end_time),
            row.duration_minutes.to_string(),
            row.pump_id,
            row.loads.to_string(),
            row.volume.to_string(),
            row.trucks.to_string(),
        ])?;
    }
    wtr.into_inner().map_err(|e| anyhow::anyhow!("CSV write error: {}", e))
}

fn timeline_csv(events: &[DeliveryEvent]) -> Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["site", "truck", "pump", "load", "start", "end", "status"])?;
    for e in events {
        wtr.write_record([
            e.site_id.clone(),
            e.truck_id.clone(),
            e.pump_id.clone(),
            e.load_number.to_string(),
            fmt_time(&e.start_time),
            fmt_time(&e.end_time),
            e.status.as_str().to_string(),
        ])?;
    }
    wtr.into_inner().map_err(|e| anyhow::anyhow!("CSV write error: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::aggregator::build_result;
    use crate::services::dispatch::dispatch;
    use crate::services::dispatch::test_support::{params, sites};
    use crate::types::DispatchMode;
    use std::io::Read;

    fn sample_result() -> SimulationResult {
        let p = params(DispatchMode::Optimizer, 6, 2);
        let outcome = dispatch(&p, &sites(&[4, 3, 2])).unwrap();
        build_result(outcome, p.depot, p.schedule_start)
    }

    fn read_entry(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut content = String::new();
        file.read_to_string(&mut content).unwrap();
        content
    }

    #[test]
    fn test_workbook_contains_sheets() {
        let result = sample_result();
        let bytes = export_workbook(&result, false).unwrap();

        let archive = zip::ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        assert!(names.contains(&"sites.csv"));
        assert!(names.contains(&"summary.csv"));
        assert!(names.contains(&"timeline.csv"));
        assert!(!names.iter().any(|n| n.starts_with("pumps/")));
    }

    #[test]
    fn test_timeline_has_one_row_per_event() {
        let result = sample_result();
        let bytes = export_workbook(&result, false).unwrap();

        let timeline = read_entry(&bytes, "timeline.csv");
        let mut lines = timeline.lines();
        assert_eq!(lines.next(), Some("site,truck,pump,load,start,end,status"));
        assert_eq!(lines.count(), result.schedule.len());
        assert!(timeline.contains("2024-03-15 "));
        assert!(timeline.contains(",unloading"));
    }

    #[test]
    fn test_sites_sheet_lists_every_site() {
        let result = sample_result();
        let bytes = export_workbook(&result, false).unwrap();

        let sheet = read_entry(&bytes, "sites.csv");
        assert_eq!(sheet.lines().count(), result.sites.len() + 1);
        assert!(sheet.lines().nth(1).unwrap().starts_with("W-1,"));
    }

    #[test]
    fn test_per_pump_sheets_partition_timeline() {
        let result = sample_result();
        let bytes = export_workbook(&result, true).unwrap();

        let pump_rows: usize = (1..=2)
            .map(|id| read_entry(&bytes, &format!("pumps/pump-{}.csv", id)).lines().count() - 1)
            .sum();
        assert_eq!(pump_rows, result.schedule.len());
    }

    #[test]
    fn test_write_workbook_to_file() {
        let result = sample_result();
        let path = std::env::temp_dir().join(format!("dispatch-{}.zip", uuid::Uuid::new_v4()));

        write_workbook(&path, &result, true).unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);

        std::fs::remove_file(&path).ok();
    }
}
