//! Per-source normalizers turning raw tabular extracts into canonical records.
//!
//! Extracts arrive already column-mapped (layout detection happens upstream,
//! outside this workspace); adapters are responsible for value-level
//! normalization: geozip formatting, currency cleaning, data_type stamping,
//! and dropping rows without a code.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use medbench_core::FeeRecord;
use thiserror::Error;
use tracing::warn;

pub const CRATE_NAME: &str = "medbench-adapters";

pub const FAIR_HEALTH_FACILITY: &str = "Fair Health Facility";
pub const FAIR_HEALTH_PHYSICIANS: &str = "Fair Health Physicians";
pub const MEDICARE_CLINICAL_FEES: &str = "Medicare Clinical Fees";
pub const MEDICARE_ASC_ADDENDA: &str = "Medicare ASC Addenda";
pub const NOVITAS: &str = "Novitas";
pub const NEW_JERSEY_DOBI: &str = "New Jersey DOBI";
pub const HORIZON_ASC: &str = "Horizon ASC";

/// Release label used for New Jersey DOBI when neither the extract nor the
/// store carries one; the published fee schedule has no date column.
pub const NJ_DOBI_RELEASE_DATE: &str = "January 2024";

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("{0}")]
    Message(String),
}

/// One raw extract row: column name -> cell text. Empty and
/// whitespace-only cells are treated as absent.
#[derive(Debug, Clone, Default)]
pub struct RawRow {
    cells: HashMap<String, String>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, column: &str, value: impl Into<String>) {
        self.cells.insert(column.to_string(), value.into());
    }

    pub fn with(mut self, column: &str, value: impl Into<String>) -> Self {
        self.set(column, value);
        self
    }

    /// Cell text, or `None` when the column is missing or blank.
    pub fn field(&self, column: &str) -> Option<&str> {
        self.cells
            .get(column)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn text(&self, column: &str) -> Option<String> {
        self.field(column).map(str::to_string)
    }

    pub fn currency(&self, column: &str) -> Option<f64> {
        self.field(column).and_then(clean_currency)
    }
}

/// A raw tabular extract, one logical file from one source.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub rows: Vec<RawRow>,
}

impl RawTable {
    pub fn from_rows(rows: Vec<RawRow>) -> Self {
        Self { rows }
    }

    /// Load a CSV extract; the header row supplies column names.
    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let headers = reader
            .headers()
            .with_context(|| format!("reading headers of {}", path.display()))?
            .clone();

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result.with_context(|| format!("parsing {}", path.display()))?;
            let mut row = RawRow::new();
            for (header, cell) in headers.iter().zip(record.iter()) {
                row.set(header, cell);
            }
            rows.push(row);
        }
        Ok(Self { rows })
    }

    /// Load a JSON extract: an array of flat objects. Numbers and booleans
    /// are stringified; nulls become absent cells.
    pub fn from_json_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let values: Vec<serde_json::Map<String, serde_json::Value>> =
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;

        let mut rows = Vec::with_capacity(values.len());
        for object in values {
            let mut row = RawRow::new();
            for (column, value) in object {
                match value {
                    serde_json::Value::Null => {}
                    serde_json::Value::String(s) => row.set(&column, s),
                    other => row.set(&column, other.to_string()),
                }
            }
            rows.push(row);
        }
        Ok(Self { rows })
    }
}

/// Normalize a geozip cell: uppercase, "USA" passes through, spreadsheet
/// decimal artifacts ("70.0") are stripped, and numeric codes are
/// left-padded with zeros to 3 characters. Blank input yields `None`.
pub fn format_geozip(raw: &str) -> Option<String> {
    let trimmed = raw.trim().to_uppercase();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed == "USA" {
        return Some(trimmed);
    }
    let digits = match trimmed.split_once('.') {
        Some((whole, _)) => whole,
        None => trimmed.as_str(),
    };
    if digits.is_empty() {
        return None;
    }
    Some(format!("{digits:0>3}"))
}

/// Strip currency formatting ("$2,334.4" -> 2334.4). Anything that does not
/// parse as a number after cleanup is treated as absent.
pub fn clean_currency(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '$' | ',') && !c.is_whitespace())
        .collect();
    cleaned.parse::<f64>().ok()
}

/// A source-specific normalizer. `has_geozip` drives the preparer's key
/// shape downstream; adapters for geozip-less sources never emit one.
pub trait SourceAdapter: Send + Sync {
    fn source_name(&self) -> &'static str;
    fn has_geozip(&self) -> bool;

    fn normalize(&self, table: &RawTable) -> Result<Vec<FeeRecord>, AdapterError>;

    /// Non-fatal sanity check that the normalized batch looks like this
    /// source's data. A mismatch is logged by the caller, not an error;
    /// availability wins over strictness here.
    fn shape_ok(&self, records: &[FeeRecord]) -> bool {
        !records.is_empty()
    }
}

/// A non-empty extract that produced zero records means the upstream column
/// mapping drifted (no row had a "code" cell); surface that instead of
/// silently syncing nothing.
fn finish(
    source_name: &str,
    table: &RawTable,
    out: Vec<FeeRecord>,
) -> Result<Vec<FeeRecord>, AdapterError> {
    if out.is_empty() && !table.rows.is_empty() {
        return Err(AdapterError::Message(format!(
            "{source_name}: extract has {} rows but none yielded a record",
            table.rows.len()
        )));
    }
    Ok(out)
}

fn percentiles(row: &RawRow) -> FeeRecord {
    FeeRecord {
        p50: row.currency("50th"),
        p60: row.currency("60th"),
        p70: row.currency("70th"),
        p75: row.currency("75th"),
        p80: row.currency("80th"),
        p85: row.currency("85th"),
        p90: row.currency("90th"),
        p95: row.currency("95th"),
        ..FeeRecord::default()
    }
}

/// Fair Health extracts: full percentile spread, geozip-stratified, with a
/// "Rel Date" label column. Facility and Physicians differ only in the
/// data_type prefix.
struct FairHealthAdapter {
    source_name: &'static str,
    data_type_prefix: &'static str,
}

impl SourceAdapter for FairHealthAdapter {
    fn source_name(&self) -> &'static str {
        self.source_name
    }

    fn has_geozip(&self) -> bool {
        true
    }

    fn normalize(&self, table: &RawTable) -> Result<Vec<FeeRecord>, AdapterError> {
        let mut out = Vec::new();
        for row in &table.rows {
            let Some(code) = row.text("code") else {
                continue;
            };
            let geozip = row.field("geozip").and_then(format_geozip);
            let data_type = match &geozip {
                Some(g) => format!("{} {}", self.data_type_prefix, g),
                None => self.source_name.to_string(),
            };
            let mut record = percentiles(row);
            record.code = code;
            record.full_description = row.text("full_description");
            record.rel_date = row.text("rel_date");
            record.geozip = geozip;
            record.data_type = Some(data_type);
            out.push(record);
        }
        finish(self.source_name(), table, out)
    }

    fn shape_ok(&self, records: &[FeeRecord]) -> bool {
        let Some(sample) = records.first() else {
            return false;
        };
        let has_percentiles = sample.p50.is_some()
            || sample.p60.is_some()
            || sample.p70.is_some()
            || sample.p75.is_some()
            || sample.p80.is_some()
            || sample.p85.is_some()
            || sample.p90.is_some()
            || sample.p95.is_some();
        if sample.geozip.is_none() {
            warn!(source = self.source_name, "sample record has no geozip");
        }
        has_percentiles && sample.rel_date.is_some()
    }
}

/// Single-rate sources (Medicare CLFS / ASC addenda): the one published rate
/// lands in `p80`, and data_type is a per-source constant.
struct SingleRateAdapter {
    source_name: &'static str,
    data_type: &'static str,
}

impl SourceAdapter for SingleRateAdapter {
    fn source_name(&self) -> &'static str {
        self.source_name
    }

    fn has_geozip(&self) -> bool {
        false
    }

    fn normalize(&self, table: &RawTable) -> Result<Vec<FeeRecord>, AdapterError> {
        let mut out = Vec::new();
        for row in &table.rows {
            let Some(code) = row.text("code") else {
                continue;
            };
            out.push(FeeRecord {
                code,
                code_description: row.text("code_description"),
                full_description: row.text("full_description"),
                data_type: Some(self.data_type.to_string()),
                rel_date: row.text("rel_date"),
                p80: row.currency("rate"),
                ..FeeRecord::default()
            });
        }
        finish(self.source_name(), table, out)
    }

    fn shape_ok(&self, records: &[FeeRecord]) -> bool {
        records
            .first()
            .map(|sample| {
                sample.geozip.is_none()
                    && sample.data_type.as_deref() == Some(self.data_type)
            })
            .unwrap_or(false)
    }
}

/// Novitas fee extracts: data_type comes from the facility indicator column
/// ("#" marks professional rates, everything else is office-based lab).
struct NovitasAdapter;

impl SourceAdapter for NovitasAdapter {
    fn source_name(&self) -> &'static str {
        NOVITAS
    }

    fn has_geozip(&self) -> bool {
        false
    }

    fn normalize(&self, table: &RawTable) -> Result<Vec<FeeRecord>, AdapterError> {
        let mut out = Vec::new();
        for row in &table.rows {
            let Some(code) = row.text("code") else {
                continue;
            };
            let data_type = match row.field("fac_ind") {
                Some(ind) if ind.contains('#') => "Medicare Professional",
                _ => "OBL",
            };
            out.push(FeeRecord {
                code,
                data_type: Some(data_type.to_string()),
                rel_date: row.text("rel_date"),
                p80: row.currency("rate"),
                ..FeeRecord::default()
            });
        }
        finish(self.source_name(), table, out)
    }
}

/// New Jersey DOBI PIP schedule: each published row carries both a facility
/// fee and a physician fee, emitted as two records sharing the code. The
/// extract has no date column, so a constant label stands in when storage
/// has none established.
struct NewJerseyDobiAdapter;

impl SourceAdapter for NewJerseyDobiAdapter {
    fn source_name(&self) -> &'static str {
        NEW_JERSEY_DOBI
    }

    fn has_geozip(&self) -> bool {
        false
    }

    fn normalize(&self, table: &RawTable) -> Result<Vec<FeeRecord>, AdapterError> {
        let mut out = Vec::new();
        for row in &table.rows {
            let Some(code) = row.text("code") else {
                continue;
            };
            let code_description = row.text("code_description");
            let rel_date = row
                .text("rel_date")
                .unwrap_or_else(|| NJ_DOBI_RELEASE_DATE.to_string());
            out.push(FeeRecord {
                code: code.clone(),
                code_description: code_description.clone(),
                data_type: Some("Facility PIP".to_string()),
                rel_date: Some(rel_date.clone()),
                p80: row.currency("facility_fee"),
                ..FeeRecord::default()
            });
            out.push(FeeRecord {
                code,
                code_description,
                data_type: Some("Physician PIP".to_string()),
                rel_date: Some(rel_date),
                p80: row.currency("physician_fee"),
                ..FeeRecord::default()
            });
        }
        finish(self.source_name(), table, out)
    }
}

/// Horizon ASC commercial fee schedule: one national rate per code into
/// `p80`, geozip pinned to "USA". Rows missing either the code or the rate
/// are dropped.
struct HorizonAscAdapter;

impl SourceAdapter for HorizonAscAdapter {
    fn source_name(&self) -> &'static str {
        HORIZON_ASC
    }

    fn has_geozip(&self) -> bool {
        true
    }

    fn normalize(&self, table: &RawTable) -> Result<Vec<FeeRecord>, AdapterError> {
        let mut out = Vec::new();
        for row in &table.rows {
            let Some(code) = row.text("code") else {
                continue;
            };
            let Some(rate) = row.currency("rate") else {
                continue;
            };
            out.push(FeeRecord {
                code,
                code_description: row.text("code_description"),
                data_type: Some("ASC Commercial".to_string()),
                geozip: Some("USA".to_string()),
                rel_date: row.text("rel_date"),
                p80: Some(rate),
                ..FeeRecord::default()
            });
        }
        finish(self.source_name(), table, out)
    }

    fn shape_ok(&self, records: &[FeeRecord]) -> bool {
        records
            .first()
            .map(|sample| {
                sample.geozip.as_deref() == Some("USA")
                    && sample.data_type.as_deref() == Some("ASC Commercial")
            })
            .unwrap_or(false)
    }
}

pub fn fair_health_facility_adapter() -> impl SourceAdapter {
    FairHealthAdapter {
        source_name: FAIR_HEALTH_FACILITY,
        data_type_prefix: "Facility",
    }
}

pub fn fair_health_physicians_adapter() -> impl SourceAdapter {
    FairHealthAdapter {
        source_name: FAIR_HEALTH_PHYSICIANS,
        data_type_prefix: "Physician",
    }
}

pub fn medicare_clinical_fees_adapter() -> impl SourceAdapter {
    SingleRateAdapter {
        source_name: MEDICARE_CLINICAL_FEES,
        data_type: "Medicare Lab",
    }
}

pub fn medicare_asc_addenda_adapter() -> impl SourceAdapter {
    SingleRateAdapter {
        source_name: MEDICARE_ASC_ADDENDA,
        data_type: "Medicare Facility",
    }
}

pub fn novitas_adapter() -> impl SourceAdapter {
    NovitasAdapter
}

pub fn new_jersey_dobi_adapter() -> impl SourceAdapter {
    NewJerseyDobiAdapter
}

pub fn horizon_asc_adapter() -> impl SourceAdapter {
    HorizonAscAdapter
}

/// Registry lookup by declared source name.
pub fn adapter_for_source(source_name: &str) -> Option<Box<dyn SourceAdapter>> {
    match source_name {
        FAIR_HEALTH_FACILITY => Some(Box::new(FairHealthAdapter {
            source_name: FAIR_HEALTH_FACILITY,
            data_type_prefix: "Facility",
        })),
        FAIR_HEALTH_PHYSICIANS => Some(Box::new(FairHealthAdapter {
            source_name: FAIR_HEALTH_PHYSICIANS,
            data_type_prefix: "Physician",
        })),
        MEDICARE_CLINICAL_FEES => Some(Box::new(SingleRateAdapter {
            source_name: MEDICARE_CLINICAL_FEES,
            data_type: "Medicare Lab",
        })),
        MEDICARE_ASC_ADDENDA => Some(Box::new(SingleRateAdapter {
            source_name: MEDICARE_ASC_ADDENDA,
            data_type: "Medicare Facility",
        })),
        NOVITAS => Some(Box::new(NovitasAdapter)),
        NEW_JERSEY_DOBI => Some(Box::new(NewJerseyDobiAdapter)),
        HORIZON_ASC => Some(Box::new(HorizonAscAdapter)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geozip_is_zero_padded_to_three_chars() {
        assert_eq!(format_geozip("70"), Some("070".to_string()));
        assert_eq!(format_geozip("74"), Some("074".to_string()));
        assert_eq!(format_geozip("070"), Some("070".to_string()));
        assert_eq!(format_geozip("123"), Some("123".to_string()));
    }

    #[test]
    fn geozip_usa_passes_through() {
        assert_eq!(format_geozip("usa"), Some("USA".to_string()));
        assert_eq!(format_geozip(" USA "), Some("USA".to_string()));
    }

    #[test]
    fn geozip_strips_spreadsheet_decimal_artifacts() {
        assert_eq!(format_geozip("70.0"), Some("070".to_string()));
        assert_eq!(format_geozip("123.0"), Some("123".to_string()));
    }

    #[test]
    fn blank_geozip_is_absent() {
        assert_eq!(format_geozip(""), None);
        assert_eq!(format_geozip("   "), None);
    }

    #[test]
    fn currency_cleaning_handles_symbols_and_junk() {
        assert_eq!(clean_currency("$2,334.4"), Some(2334.4));
        assert_eq!(clean_currency("$1,234"), Some(1234.0));
        assert_eq!(clean_currency(" 50 "), Some(50.0));
        assert_eq!(clean_currency("N/A"), None);
        assert_eq!(clean_currency(""), None);
    }

    fn fair_health_row(code: &str, geozip: &str) -> RawRow {
        RawRow::new()
            .with("code", code)
            .with("geozip", geozip)
            .with("rel_date", "January 2025")
            .with("full_description", "Office visit, established patient")
            .with("50th", "$100.00")
            .with("80th", "$180.00")
    }

    #[test]
    fn fair_health_facility_stamps_data_type_from_geozip() {
        let adapter = fair_health_facility_adapter();
        let table = RawTable::from_rows(vec![fair_health_row("99213", "70")]);
        let records = adapter.normalize(&table).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].geozip.as_deref(), Some("070"));
        assert_eq!(records[0].data_type.as_deref(), Some("Facility 070"));
        assert_eq!(records[0].p50, Some(100.0));
        assert_eq!(records[0].p80, Some(180.0));
        assert!(adapter.shape_ok(&records));
    }

    #[test]
    fn fair_health_physicians_uses_physician_prefix() {
        let adapter = fair_health_physicians_adapter();
        let table = RawTable::from_rows(vec![fair_health_row("99213", "USA")]);
        let records = adapter.normalize(&table).unwrap();
        assert_eq!(records[0].data_type.as_deref(), Some("Physician USA"));
    }

    #[test]
    fn rows_without_code_are_dropped() {
        let adapter = fair_health_facility_adapter();
        let table = RawTable::from_rows(vec![
            fair_health_row("99213", "70"),
            fair_health_row("   ", "70"),
            RawRow::new().with("geozip", "74"),
        ]);
        let records = adapter.normalize(&table).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn fully_unmapped_extract_is_an_error() {
        let adapter = fair_health_facility_adapter();
        let table = RawTable::from_rows(vec![
            RawRow::new().with("cpt", "99213").with("geozip", "70"),
            RawRow::new().with("cpt", "99214").with("geozip", "70"),
        ]);
        let err = adapter.normalize(&table).unwrap_err();
        assert!(err.to_string().contains("none yielded a record"));
    }

    #[test]
    fn medicare_lab_single_rate_lands_in_p80() {
        let adapter = medicare_clinical_fees_adapter();
        let table = RawTable::from_rows(vec![RawRow::new()
            .with("code", "80053")
            .with("code_description", "Comprehensive metabolic panel")
            .with("rate", "$10.56")
            .with("rel_date", "2025 Q1")]);
        let records = adapter.normalize(&table).unwrap();
        assert_eq!(records[0].data_type.as_deref(), Some("Medicare Lab"));
        assert_eq!(records[0].p80, Some(10.56));
        assert_eq!(records[0].geozip, None);
        assert!(adapter.shape_ok(&records));
    }

    #[test]
    fn novitas_data_type_follows_facility_indicator() {
        let adapter = novitas_adapter();
        let table = RawTable::from_rows(vec![
            RawRow::new()
                .with("code", "99213")
                .with("fac_ind", "#")
                .with("rate", "72.50")
                .with("rel_date", "July 2025"),
            RawRow::new()
                .with("code", "99214")
                .with("rate", "110.00")
                .with("rel_date", "July 2025"),
        ]);
        let records = adapter.normalize(&table).unwrap();
        assert_eq!(records[0].data_type.as_deref(), Some("Medicare Professional"));
        assert_eq!(records[1].data_type.as_deref(), Some("OBL"));
    }

    #[test]
    fn nj_dobi_splits_rows_and_falls_back_to_constant_date() {
        let adapter = new_jersey_dobi_adapter();
        let table = RawTable::from_rows(vec![RawRow::new()
            .with("code", "29881")
            .with("code_description", "Knee arthroscopy")
            .with("facility_fee", "$3,411.00")
            .with("physician_fee", "$1,100.25")]);
        let records = adapter.normalize(&table).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].data_type.as_deref(), Some("Facility PIP"));
        assert_eq!(records[0].p80, Some(3411.0));
        assert_eq!(records[1].data_type.as_deref(), Some("Physician PIP"));
        assert_eq!(records[1].p80, Some(1100.25));
        assert_eq!(records[0].rel_date.as_deref(), Some(NJ_DOBI_RELEASE_DATE));
    }

    #[test]
    fn horizon_asc_pins_national_geozip_and_drops_rateless_rows() {
        let adapter = horizon_asc_adapter();
        let table = RawTable::from_rows(vec![
            RawRow::new()
                .with("code", "0213T")
                .with("code_description", "Njx paravert w/us cer/thor")
                .with("rate", "$1,062.00")
                .with("rel_date", "January 2025"),
            RawRow::new()
                .with("code", "0214T")
                .with("code_description", "No published rate"),
        ]);
        let records = adapter.normalize(&table).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].code, "0213T");
        assert_eq!(records[0].geozip.as_deref(), Some("USA"));
        assert_eq!(records[0].data_type.as_deref(), Some("ASC Commercial"));
        assert_eq!(records[0].p80, Some(1062.0));
        assert!(adapter.shape_ok(&records));
    }

    #[test]
    fn json_extract_loads_numbers_and_skips_nulls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("novitas.json");
        std::fs::write(
            &path,
            r#"[{"code": 99213, "rate": 72.5, "rel_date": "July 2025", "fac_ind": null}]"#,
        )
        .unwrap();

        let table = RawTable::from_json_path(&path).unwrap();
        let records = novitas_adapter().normalize(&table).unwrap();
        assert_eq!(records[0].code, "99213");
        assert_eq!(records[0].p80, Some(72.5));
        assert_eq!(records[0].data_type.as_deref(), Some("OBL"));
    }

    #[test]
    fn csv_extract_maps_headers_to_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clfs.csv");
        std::fs::write(
            &path,
            "code,code_description,rate,rel_date\n80053,Comprehensive metabolic panel,$10.56,2025 Q1\n,,missing code row,2025 Q1\n",
        )
        .unwrap();

        let table = RawTable::from_csv_path(&path).unwrap();
        let records = medicare_clinical_fees_adapter().normalize(&table).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].code, "80053");
        assert_eq!(records[0].p80, Some(10.56));
    }

    #[test]
    fn adapter_registry_knows_all_sources() {
        for name in [
            FAIR_HEALTH_FACILITY,
            FAIR_HEALTH_PHYSICIANS,
            MEDICARE_CLINICAL_FEES,
            MEDICARE_ASC_ADDENDA,
            NOVITAS,
            NEW_JERSEY_DOBI,
            HORIZON_ASC,
        ] {
            let adapter = adapter_for_source(name).expect("adapter registered");
            assert_eq!(adapter.source_name(), name);
        }
        assert!(adapter_for_source("Aetna ASC").is_none());
    }

    #[test]
    fn geozip_flags_match_source_stratification() {
        assert!(adapter_for_source(FAIR_HEALTH_FACILITY).unwrap().has_geozip());
        assert!(adapter_for_source(FAIR_HEALTH_PHYSICIANS).unwrap().has_geozip());
        assert!(adapter_for_source(HORIZON_ASC).unwrap().has_geozip());
        assert!(!adapter_for_source(MEDICARE_CLINICAL_FEES).unwrap().has_geozip());
        assert!(!adapter_for_source(NOVITAS).unwrap().has_geozip());
        assert!(!adapter_for_source(NEW_JERSEY_DOBI).unwrap().has_geozip());
    }
}
