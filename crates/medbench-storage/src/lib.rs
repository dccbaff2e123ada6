//! Storage contract for fee-schedule rows, plus Postgres and in-memory backends.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use medbench_core::FeeRecord;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, QueryBuilder, Row};
use thiserror::Error;
use tracing::debug;

pub const CRATE_NAME: &str = "medbench-storage";

/// Postgres SQLSTATE for unique constraint violations.
const UNIQUE_VIOLATION_SQLSTATE: &str = "23505";

#[derive(Debug, Error)]
pub enum StoreError {
    /// The composite uniqueness constraint rejected an insert. The
    /// reconciliation engine reclassifies this as an update when it occurs
    /// on a per-record fallback insert.
    #[error("unique constraint violation: {0}")]
    UniqueViolation(String),
    #[error("database error: {0}")]
    Database(sqlx::Error),
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, StoreError::UniqueViolation(_))
    }
}

fn map_sqlx_err(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION_SQLSTATE) {
            return StoreError::UniqueViolation(db_err.message().to_string());
        }
    }
    StoreError::Database(err)
}

/// Projection returned by the chunk existence check. `id` is the storage
/// row id used to address updates; it carries no domain meaning.
#[derive(Debug, Clone, PartialEq)]
pub struct ExistingRow {
    pub id: i64,
    pub code: String,
    pub source: String,
    pub release_date: String,
    pub geozip: Option<String>,
}

/// The six operations the reconciliation engine needs from a backing store.
/// Any store that can answer these (SQL, document store, REST-over-a-BaaS)
/// satisfies the contract.
#[async_trait]
pub trait FeeStore: Send + Sync {
    /// Release date of any one stored row for `source`, if any exist.
    async fn existing_release_date(&self, source: &str) -> Result<Option<String>, StoreError>;

    /// Rows matching `(source, release_date, code IN codes)`.
    async fn find_existing(
        &self,
        source: &str,
        release_date: &str,
        codes: &[String],
    ) -> Result<Vec<ExistingRow>, StoreError>;

    /// Number of stored rows matching `(source, release_date)`.
    async fn count_rows(&self, source: &str, release_date: &str) -> Result<u64, StoreError>;

    /// Insert a batch of rows in one call.
    async fn insert_many(&self, records: &[FeeRecord]) -> Result<(), StoreError>;

    /// Insert a single row. Must surface `StoreError::UniqueViolation`
    /// distinctly so the engine can treat a lost insert race as an update.
    async fn insert_one(&self, record: &FeeRecord) -> Result<(), StoreError>;

    /// Replace all non-key fields of the row with the given storage id.
    async fn update_by_id(&self, id: i64, record: &FeeRecord) -> Result<(), StoreError>;
}

const RECORD_COLUMNS: &str = "source, code, code_description, full_description, data_type, \
     geozip, rel_date, release_date, p50, p60, p70, p75, p80, p85, p90, p95";

/// Postgres-backed store. Table name comes from deployment config, not user
/// input, and is interpolated as a quoted identifier.
#[derive(Debug, Clone)]
pub struct PgFeeStore {
    pool: PgPool,
    table: String,
}

impl PgFeeStore {
    pub fn new(pool: PgPool, table: impl Into<String>) -> Self {
        Self {
            pool,
            table: table.into(),
        }
    }

    pub async fn connect(database_url: &str, table: impl Into<String>) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(map_sqlx_err)?;
        Ok(Self::new(pool, table))
    }

    /// Create the fee table and its composite uniqueness constraint if they
    /// do not exist. `NULLS NOT DISTINCT` makes the constraint hold for
    /// geozip-less sources too, which is what the engine's race fallback
    /// relies on.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        let ddl = format!(
            r#"
            CREATE TABLE IF NOT EXISTS "{table}" (
                id               BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
                source           TEXT NOT NULL,
                code             TEXT NOT NULL,
                code_description TEXT,
                full_description TEXT,
                data_type        TEXT,
                geozip           TEXT,
                rel_date         TEXT,
                release_date     TEXT NOT NULL,
                p50              DOUBLE PRECISION,
                p60              DOUBLE PRECISION,
                p70              DOUBLE PRECISION,
                p75              DOUBLE PRECISION,
                p80              DOUBLE PRECISION,
                p85              DOUBLE PRECISION,
                p90              DOUBLE PRECISION,
                p95              DOUBLE PRECISION,
                UNIQUE NULLS NOT DISTINCT (source, code, release_date, geozip)
            )
            "#,
            table = self.table
        );
        sqlx::query(&ddl)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }
}

fn bind_record<'a>(
    query: sqlx::query::Query<'a, sqlx::Postgres, sqlx::postgres::PgArguments>,
    record: &'a FeeRecord,
) -> sqlx::query::Query<'a, sqlx::Postgres, sqlx::postgres::PgArguments> {
    query
        .bind(&record.source)
        .bind(&record.code)
        .bind(&record.code_description)
        .bind(&record.full_description)
        .bind(&record.data_type)
        .bind(&record.geozip)
        .bind(&record.rel_date)
        .bind(&record.release_date)
        .bind(record.p50)
        .bind(record.p60)
        .bind(record.p70)
        .bind(record.p75)
        .bind(record.p80)
        .bind(record.p85)
        .bind(record.p90)
        .bind(record.p95)
}

#[async_trait]
impl FeeStore for PgFeeStore {
    async fn existing_release_date(&self, source: &str) -> Result<Option<String>, StoreError> {
        let sql = format!(
            r#"SELECT release_date FROM "{}" WHERE source = $1 LIMIT 1"#,
            self.table
        );
        let row = sqlx::query(&sql)
            .bind(source)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        match row {
            Some(row) => Ok(Some(row.try_get("release_date").map_err(map_sqlx_err)?)),
            None => Ok(None),
        }
    }

    async fn find_existing(
        &self,
        source: &str,
        release_date: &str,
        codes: &[String],
    ) -> Result<Vec<ExistingRow>, StoreError> {
        let sql = format!(
            r#"
            SELECT id, code, source, release_date, geozip
              FROM "{}"
             WHERE source = $1
               AND release_date = $2
               AND code = ANY($3)
            "#,
            self.table
        );
        let rows = sqlx::query(&sql)
            .bind(source)
            .bind(release_date)
            .bind(codes)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(ExistingRow {
                id: row.try_get("id").map_err(map_sqlx_err)?,
                code: row.try_get("code").map_err(map_sqlx_err)?,
                source: row.try_get("source").map_err(map_sqlx_err)?,
                release_date: row.try_get("release_date").map_err(map_sqlx_err)?,
                geozip: row.try_get("geozip").map_err(map_sqlx_err)?,
            });
        }
        debug!(source, release_date, existing = out.len(), "existence check");
        Ok(out)
    }

    async fn count_rows(&self, source: &str, release_date: &str) -> Result<u64, StoreError> {
        let sql = format!(
            r#"SELECT COUNT(*) AS n FROM "{}" WHERE source = $1 AND release_date = $2"#,
            self.table
        );
        let row = sqlx::query(&sql)
            .bind(source)
            .bind(release_date)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        let n: i64 = row.try_get("n").map_err(map_sqlx_err)?;
        Ok(n.max(0) as u64)
    }

    async fn insert_many(&self, records: &[FeeRecord]) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(format!(
            r#"INSERT INTO "{}" ({}) "#,
            self.table, RECORD_COLUMNS
        ));
        builder.push_values(records, |mut b, record| {
            b.push_bind(&record.source)
                .push_bind(&record.code)
                .push_bind(&record.code_description)
                .push_bind(&record.full_description)
                .push_bind(&record.data_type)
                .push_bind(&record.geozip)
                .push_bind(&record.rel_date)
                .push_bind(&record.release_date)
                .push_bind(record.p50)
                .push_bind(record.p60)
                .push_bind(record.p70)
                .push_bind(record.p75)
                .push_bind(record.p80)
                .push_bind(record.p85)
                .push_bind(record.p90)
                .push_bind(record.p95);
        });
        builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn insert_one(&self, record: &FeeRecord) -> Result<(), StoreError> {
        let sql = format!(
            r#"
            INSERT INTO "{}" ({})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
            self.table, RECORD_COLUMNS
        );
        bind_record(sqlx::query(&sql), record)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn update_by_id(&self, id: i64, record: &FeeRecord) -> Result<(), StoreError> {
        let sql = format!(
            r#"
            UPDATE "{}"
               SET source = $1,
                   code = $2,
                   code_description = $3,
                   full_description = $4,
                   data_type = $5,
                   geozip = $6,
                   rel_date = $7,
                   release_date = $8,
                   p50 = $9,
                   p60 = $10,
                   p70 = $11,
                   p75 = $12,
                   p80 = $13,
                   p85 = $14,
                   p90 = $15,
                   p95 = $16
             WHERE id = $17
            "#,
            self.table
        );
        bind_record(sqlx::query(&sql), record)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct StoredRow {
    id: i64,
    record: FeeRecord,
}

#[derive(Debug, Default)]
struct MemoryState {
    rows: Vec<StoredRow>,
    next_id: i64,
}

/// In-memory `FeeStore` used by tests and offline dry runs. Enforces the
/// same composite uniqueness the Postgres schema does, and can be told to
/// fail writes touching specific codes to exercise chunk-failure paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    failing_codes: Mutex<HashSet<String>>,
    failing_update_codes: Mutex<HashSet<String>>,
    failing_lookups: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Any insert touching `code` (batch or single) fails with a backend
    /// error until cleared. Unique violations still take precedence.
    pub fn fail_inserts_for_code(&self, code: &str) {
        self.failing_codes
            .lock()
            .expect("memory store lock")
            .insert(code.to_string());
    }

    /// Any update presenting a record with `code` fails with a backend
    /// error until cleared.
    pub fn fail_updates_for_code(&self, code: &str) {
        self.failing_update_codes
            .lock()
            .expect("memory store lock")
            .insert(code.to_string());
    }

    /// Release-date lookups fail with a backend error until cleared.
    pub fn fail_release_date_lookups(&self) {
        *self.failing_lookups.lock().expect("memory store lock") = true;
    }

    pub fn row_count(&self) -> usize {
        self.state.lock().expect("memory store lock").rows.len()
    }

    pub fn rows(&self) -> Vec<FeeRecord> {
        self.state
            .lock()
            .expect("memory store lock")
            .rows
            .iter()
            .map(|r| r.record.clone())
            .collect()
    }

    fn is_failing(&self, code: &str) -> bool {
        self.failing_codes
            .lock()
            .expect("memory store lock")
            .contains(code.trim())
    }

    fn key_of(record: &FeeRecord) -> (String, String, Option<String>, Option<String>) {
        (
            record.source.clone(),
            record.code.trim().to_string(),
            record.release_date.clone(),
            record.geozip.clone(),
        )
    }

    fn insert_locked(state: &mut MemoryState, record: &FeeRecord) -> Result<(), StoreError> {
        let key = Self::key_of(record);
        if state.rows.iter().any(|row| Self::key_of(&row.record) == key) {
            return Err(StoreError::UniqueViolation(format!(
                "duplicate key (source, code, release_date, geozip) = ({}, {}, {:?}, {:?})",
                key.0, key.1, key.2, key.3
            )));
        }
        state.next_id += 1;
        state.rows.push(StoredRow {
            id: state.next_id,
            record: record.clone(),
        });
        Ok(())
    }
}

#[async_trait]
impl FeeStore for MemoryStore {
    async fn existing_release_date(&self, source: &str) -> Result<Option<String>, StoreError> {
        if *self.failing_lookups.lock().expect("memory store lock") {
            return Err(StoreError::Backend(
                "injected release date lookup failure".to_string(),
            ));
        }
        let state = self.state.lock().expect("memory store lock");
        Ok(state
            .rows
            .iter()
            .find(|row| row.record.source == source)
            .and_then(|row| row.record.release_date.clone()))
    }

    async fn find_existing(
        &self,
        source: &str,
        release_date: &str,
        codes: &[String],
    ) -> Result<Vec<ExistingRow>, StoreError> {
        let wanted: HashSet<&str> = codes.iter().map(|c| c.trim()).collect();
        let state = self.state.lock().expect("memory store lock");
        Ok(state
            .rows
            .iter()
            .filter(|row| {
                row.record.source == source
                    && row.record.release_date.as_deref() == Some(release_date)
                    && wanted.contains(row.record.code.trim())
            })
            .map(|row| ExistingRow {
                id: row.id,
                code: row.record.code.trim().to_string(),
                source: row.record.source.clone(),
                release_date: release_date.to_string(),
                geozip: row.record.geozip.clone(),
            })
            .collect())
    }

    async fn count_rows(&self, source: &str, release_date: &str) -> Result<u64, StoreError> {
        let state = self.state.lock().expect("memory store lock");
        Ok(state
            .rows
            .iter()
            .filter(|row| {
                row.record.source == source
                    && row.record.release_date.as_deref() == Some(release_date)
            })
            .count() as u64)
    }

    async fn insert_many(&self, records: &[FeeRecord]) -> Result<(), StoreError> {
        if let Some(poisoned) = records.iter().find(|r| self.is_failing(&r.code)) {
            return Err(StoreError::Backend(format!(
                "injected batch insert failure at code {}",
                poisoned.code
            )));
        }
        let mut state = self.state.lock().expect("memory store lock");
        for record in records {
            Self::insert_locked(&mut state, record)?;
        }
        Ok(())
    }

    async fn insert_one(&self, record: &FeeRecord) -> Result<(), StoreError> {
        let mut state = self.state.lock().expect("memory store lock");
        let key = Self::key_of(record);
        if state
            .rows
            .iter()
            .any(|row| Self::key_of(&row.record) == key)
        {
            return Err(StoreError::UniqueViolation(format!(
                "duplicate key for code {}",
                record.code
            )));
        }
        if self.is_failing(&record.code) {
            return Err(StoreError::Backend(format!(
                "injected insert failure at code {}",
                record.code
            )));
        }
        Self::insert_locked(&mut state, record)
    }

    async fn update_by_id(&self, id: i64, record: &FeeRecord) -> Result<(), StoreError> {
        if self
            .failing_update_codes
            .lock()
            .expect("memory store lock")
            .contains(record.code.trim())
        {
            return Err(StoreError::Backend(format!(
                "injected update failure at code {}",
                record.code
            )));
        }
        let mut state = self.state.lock().expect("memory store lock");
        match state.rows.iter_mut().find(|row| row.id == id) {
            Some(row) => {
                row.record = record.clone();
                Ok(())
            }
            None => Err(StoreError::Backend(format!("no row with id {id}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(code: &str, release_date: &str, geozip: Option<&str>) -> FeeRecord {
        FeeRecord {
            code: code.to_string(),
            release_date: Some(release_date.to_string()),
            geozip: geozip.map(str::to_string),
            source: "Fair Health Facility".to_string(),
            p80: Some(100.0),
            ..FeeRecord::default()
        }
    }

    #[tokio::test]
    async fn memory_store_enforces_composite_uniqueness() {
        let store = MemoryStore::new();
        store
            .insert_one(&record("99213", "January 2025", Some("070")))
            .await
            .unwrap();

        let err = store
            .insert_one(&record("99213", "January 2025", Some("070")))
            .await
            .unwrap_err();
        assert!(err.is_unique_violation());

        // Different geozip under the same code is a distinct row.
        store
            .insert_one(&record("99213", "January 2025", Some("074")))
            .await
            .unwrap();
        assert_eq!(store.row_count(), 2);
    }

    #[tokio::test]
    async fn null_geozip_does_not_collide_with_values() {
        let store = MemoryStore::new();
        store
            .insert_one(&record("99213", "January 2025", None))
            .await
            .unwrap();
        store
            .insert_one(&record("99213", "January 2025", Some("")))
            .await
            .unwrap();
        assert_eq!(store.row_count(), 2);

        let found = store
            .find_existing("Fair Health Facility", "January 2025", &["99213".into()])
            .await
            .unwrap();
        let nulls = found.iter().filter(|r| r.geozip.is_none()).count();
        assert_eq!(nulls, 1);
    }

    #[tokio::test]
    async fn find_existing_matches_trimmed_codes() {
        let store = MemoryStore::new();
        store
            .insert_one(&record(" 99213 ", "January 2025", None))
            .await
            .unwrap();
        let found = store
            .find_existing("Fair Health Facility", "January 2025", &["99213".into()])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].code, "99213");
    }

    #[tokio::test]
    async fn existing_release_date_returns_any_row_for_source() {
        let store = MemoryStore::new();
        assert_eq!(
            store
                .existing_release_date("Fair Health Facility")
                .await
                .unwrap(),
            None
        );
        store
            .insert_one(&record("99213", "January 2025", None))
            .await
            .unwrap();
        assert_eq!(
            store
                .existing_release_date("Fair Health Facility")
                .await
                .unwrap(),
            Some("January 2025".to_string())
        );
        assert_eq!(store.existing_release_date("Novitas").await.unwrap(), None);
    }

    #[tokio::test]
    async fn injected_failures_hit_batch_and_single_inserts() {
        let store = MemoryStore::new();
        store.fail_inserts_for_code("99214");

        let batch = vec![
            record("99213", "January 2025", None),
            record("99214", "January 2025", None),
        ];
        assert!(matches!(
            store.insert_many(&batch).await,
            Err(StoreError::Backend(_))
        ));
        assert!(matches!(
            store.insert_one(&record("99214", "January 2025", None)).await,
            Err(StoreError::Backend(_))
        ));
        // Codes that are not poisoned still insert.
        store
            .insert_one(&record("99213", "January 2025", None))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn injected_lookup_and_update_failures() {
        let store = MemoryStore::new();
        store
            .insert_one(&record("99213", "January 2025", None))
            .await
            .unwrap();

        store.fail_release_date_lookups();
        assert!(matches!(
            store.existing_release_date("Fair Health Facility").await,
            Err(StoreError::Backend(_))
        ));

        store.fail_updates_for_code("99213");
        let row = store
            .find_existing("Fair Health Facility", "January 2025", &["99213".into()])
            .await
            .unwrap()
            .remove(0);
        assert!(matches!(
            store
                .update_by_id(row.id, &record("99213", "January 2025", None))
                .await,
            Err(StoreError::Backend(_))
        ));
    }

    #[tokio::test]
    async fn update_by_id_replaces_non_key_fields() {
        let store = MemoryStore::new();
        store
            .insert_one(&record("99213", "January 2025", None))
            .await
            .unwrap();
        let row = store
            .find_existing("Fair Health Facility", "January 2025", &["99213".into()])
            .await
            .unwrap()
            .remove(0);

        let mut updated = record("99213", "January 2025", None);
        updated.p80 = Some(155.5);
        store.update_by_id(row.id, &updated).await.unwrap();

        assert_eq!(store.rows()[0].p80, Some(155.5));
        assert_eq!(store.row_count(), 1);
    }
}
