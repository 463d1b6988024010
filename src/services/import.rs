//! Demand import from delimited text files
//!
//! Accepts loosely formatted spreadsheets exported as CSV/TSV: one row per
//! site with a load count and an address in either order.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::defaults::MAX_SITE_LOADS;
use crate::types::ImportedSite;

/// Read and parse a demand file
pub fn read_sites_file(path: &Path) -> Result<Vec<ImportedSite>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read sites file {}", path.display()))?;
    let rows = parse_sites(&content)
        .with_context(|| format!("Failed to parse sites file {}", path.display()))?;
    info!("Imported {} sites from {}", rows.len(), path.display());
    Ok(rows)
}

/// Parse demand rows. The first line is a header and is skipped.
pub fn parse_sites(content: &str) -> Result<Vec<ImportedSite>> {
    let content = content.trim_start_matches('\u{feff}');
    let delimiter = detect_delimiter(content);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let cells: Vec<&str> = record.iter().collect();
        match parse_row(&cells) {
            Some(row) => rows.push(row),
            None => debug!("Skipping row {}: no load count and address", line + 2),
        }
    }
    Ok(rows)
}

/// Pick the delimiter that occurs most often in the header line
fn detect_delimiter(content: &str) -> u8 {
    let header = content.lines().next().unwrap_or_default();
    [b',', b';', b'\t']
        .into_iter()
        .map(|d| (d, header.bytes().filter(|b| *b == d).count()))
        .filter(|(_, count)| *count > 0)
        .max_by_key(|(_, count)| *count)
        .map(|(d, _)| d)
        .unwrap_or(b',')
}

fn load_count(cell: &str) -> Option<i64> {
    let value: f64 = cell.replace(',', ".").parse().ok()?;
    // Counts outside (0, MAX_SITE_LOADS) are treated as text
    (value > 0.0 && value < MAX_SITE_LOADS as f64)
        .then(|| (value.round() as i64).clamp(1, MAX_SITE_LOADS - 1))
}

fn is_text(cell: &str) -> bool {
    !cell.is_empty() && cell.replace(',', ".").parse::<f64>().is_err()
}

fn parse_row(cells: &[&str]) -> Option<ImportedSite> {
    let first = cells.first().copied().unwrap_or_default();
    let second = cells.get(1).copied().unwrap_or_default();

    let (loads, mut address) = if let Some(loads) = load_count(first) {
        (loads, Some(second).filter(|c| is_text(c)).map(str::to_string))
    } else if let Some(loads) = load_count(second) {
        (loads, Some(first).filter(|c| is_text(c)).map(str::to_string))
    } else {
        return None;
    };

    if address.is_none() {
        let parts: Vec<&str> = cells.iter().copied().filter(|c| is_text(c)).collect();
        if !parts.is_empty() {
            address = Some(parts.join(" "));
        }
    }

    address.map(|address| ImportedSite { loads, address })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_loads_then_address() {
        let csv = "Cargas,Endereco\n4,Rua Geral 100\n7,Avenida Beira Rio 20\n";
        let rows = parse_sites(csv).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], ImportedSite { loads: 4, address: "Rua Geral 100".to_string() });
        assert_eq!(rows[1].loads, 7);
    }

    #[test]
    fn test_address_then_loads_semicolon() {
        let csv = "Endereco;Cargas\nRua Geral 100, Navegantes;5\n";
        let rows = parse_sites(csv).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].address, "Rua Geral 100, Navegantes");
        assert_eq!(rows[0].loads, 5);
    }

    #[test]
    fn test_tab_separated() {
        let csv = "loads\taddress\n3\tRua Geral 100\n";
        let rows = parse_sites(csv).unwrap();

        assert_eq!(rows, vec![ImportedSite { loads: 3, address: "Rua Geral 100".to_string() }]);
    }

    #[test]
    fn test_address_joined_from_text_cells() {
        let csv = "loads,street,number,city\n6,,Rua Geral,Navegantes\n";
        let rows = parse_sites(csv).unwrap();

        assert_eq!(rows[0].address, "Rua Geral Navegantes");
    }

    #[test]
    fn test_rows_without_loads_or_address_are_skipped() {
        let csv = "a,b\nRua Geral 100,\n0,Rua Geral 200\n600,Rua Geral 300\n4,\n\n2,Rua Geral 400\n";
        let rows = parse_sites(csv).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].address, "Rua Geral 400");
    }

    #[test]
    fn test_load_counts_stay_below_limit() {
        let csv = "Cargas,Endereco\n499.7,Rua Geral 100\n0.2,Rua Geral 200\n";
        let rows = parse_sites(csv).unwrap();

        assert_eq!(rows[0].loads, MAX_SITE_LOADS - 1);
        assert_eq!(rows[1].loads, 1);
    }

    #[test]
    fn test_header_only_is_empty() {
        assert!(parse_sites("Cargas,Endereco\n").unwrap().is_empty());
        assert!(parse_sites("").unwrap().is_empty());
    }

    #[test]
    fn test_bom_is_ignored() {
        let csv = "\u{feff}Cargas;Endereco\n2;Rua Geral 100\n";
        assert_eq!(parse_sites(csv).unwrap().len(), 1);
    }

    #[test]
    fn test_read_sites_file() {
        let path = std::env::temp_dir().join(format!("sites-{}.csv", Uuid::new_v4()));
        std::fs::write(&path, "Cargas,Endereco\n4,Rua Geral 100\n").unwrap();

        let rows = read_sites_file(&path).unwrap();
        assert_eq!(rows.len(), 1);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_read_missing_file_fails() {
        let path = std::env::temp_dir().join(format!("missing-{}.csv", Uuid::new_v4()));
        assert!(read_sites_file(&path).is_err());
    }
}
