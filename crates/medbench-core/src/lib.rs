//! Core domain model for the medbench fee-schedule pipeline.

use serde::{Deserialize, Serialize};

pub const CRATE_NAME: &str = "medbench-core";

/// One normalized fee-schedule row, as produced by a source adapter and
/// persisted after reconciliation.
///
/// Identity is the composite key `(source, code, release_date, geozip)`;
/// there is no domain-level surrogate id. Storage row ids are an
/// implementation detail of the store and never appear here.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeeRecord {
    pub code: String,
    #[serde(default)]
    pub code_description: Option<String>,
    #[serde(default)]
    pub full_description: Option<String>,
    #[serde(default)]
    pub data_type: Option<String>,
    /// 3-char zero-padded region code or the literal "USA". Always `None`
    /// for sources without regional stratification; `None` is never
    /// interchangeable with an empty string.
    #[serde(default)]
    pub geozip: Option<String>,
    /// Human-oriented release label taken from source metadata, e.g.
    /// "January 2025". Input to release_date resolution, not the key itself.
    #[serde(default)]
    pub rel_date: Option<String>,
    /// The release label actually used for keying. Resolved by the preparer:
    /// kept if already present, else reused from storage, else promoted from
    /// `rel_date`.
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub p50: Option<f64>,
    #[serde(default)]
    pub p60: Option<f64>,
    #[serde(default)]
    pub p70: Option<f64>,
    #[serde(default)]
    pub p75: Option<f64>,
    #[serde(default)]
    pub p80: Option<f64>,
    #[serde(default)]
    pub p85: Option<f64>,
    #[serde(default)]
    pub p90: Option<f64>,
    #[serde(default)]
    pub p95: Option<f64>,
    /// Stamped by the preparer from the pipeline's declared identity.
    /// Anything the raw extract claims here is overwritten.
    #[serde(default)]
    pub source: String,
}

impl FeeRecord {
    /// Composite identity key for this record. Codes are compared as trimmed
    /// strings so numeric extract cells ("99213" vs 99213) cannot produce
    /// false mismatches. A record that somehow reaches keying without a
    /// resolved `release_date` falls back to `rel_date`, then to "Unknown".
    pub fn composite_key(&self) -> CompositeKey {
        let release_date = self
            .release_date
            .clone()
            .or_else(|| self.rel_date.clone())
            .unwrap_or_else(|| "Unknown".to_string());
        CompositeKey {
            source: self.source.clone(),
            code: self.code.trim().to_string(),
            release_date,
            geozip: self.geozip.clone(),
        }
    }
}

/// The multi-field uniqueness constraint the store enforces. `geozip: None`
/// matches only rows whose geozip is also null, never an empty string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompositeKey {
    pub source: String,
    pub code: String,
    pub release_date: String,
    pub geozip: Option<String>,
}

/// Why the preparer refused a record. Skips are expected, counted outcomes,
/// not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// `code` was missing or empty after trimming.
    MissingCode,
    /// No release identity could be resolved from the record, storage, or
    /// its `rel_date` label.
    NoReleaseDate,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::MissingCode => "missing_code",
            SkipReason::NoReleaseDate => "no_release_date",
        }
    }
}

/// Outcome of preparing a single record for reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub enum PrepareOutcome {
    Prepared(FeeRecord),
    Skipped(SkipReason),
}

/// Terminal state of one reconciliation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileStatus {
    /// Every chunk completed.
    Success,
    /// At least one chunk failed; the rest were still applied.
    PartialSuccess,
    /// The sampling fast path determined the store already covers the batch.
    AlreadySynced,
    /// Empty input batch.
    NoRecords,
    /// Every record was rejected by the preparer.
    NoValidRecords,
}

impl ReconcileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileStatus::Success => "success",
            ReconcileStatus::PartialSuccess => "partial_success",
            ReconcileStatus::AlreadySynced => "already_synced",
            ReconcileStatus::NoRecords => "no_records",
            ReconcileStatus::NoValidRecords => "no_valid_records",
        }
    }
}

/// Aggregated counts from one reconciliation run. `failed_chunks` holds
/// 1-based chunk ordinals so operators can correlate with chunk logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileOutcome {
    pub status: ReconcileStatus,
    pub inserted: usize,
    pub updated: usize,
    pub upserted: usize,
    pub failed: usize,
    pub failed_chunks: Vec<usize>,
}

impl ReconcileOutcome {
    pub fn empty(status: ReconcileStatus) -> Self {
        Self {
            status,
            inserted: 0,
            updated: 0,
            upserted: 0,
            failed: 0,
            failed_chunks: Vec::new(),
        }
    }
}
