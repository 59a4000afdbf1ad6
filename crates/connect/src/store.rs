//! Case record persistence.
//!
//! # Table: `signifyd_case`
//!
//! One row per host order, keyed by the order increment id. Rows are created
//! on the first submission attempt, updated as guarantee decisions arrive,
//! and never deleted.
//!
//! # Migrations
//!
//! Stored in `crates/connect/migrations/` and run via:
//! ```bash
//! cargo run -p signifyd-cli -- migrate
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use signifyd_connect_core::{CaseRecord, CaseStatus, Guarantee};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

/// Errors that can occur during case record operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// A record for the order already exists.
    #[error("case already exists for order {0}")]
    Duplicate(String),

    /// The record to update does not exist.
    #[error("no case for order {0}")]
    NotFound(String),

    /// In-memory state is unusable after a panic.
    #[error("case store lock poisoned")]
    Poisoned,
}

/// Persisted case records keyed by order increment id.
pub trait CaseStore: Send + Sync {
    /// Record for an order, if one exists.
    fn load(
        &self,
        order_id: &str,
    ) -> impl Future<Output = Result<Option<CaseRecord>, StoreError>> + Send;

    /// Insert a new record.
    fn create(&self, record: &CaseRecord) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Overwrite an existing record.
    fn save(&self, record: &CaseRecord) -> impl Future<Output = Result<(), StoreError>> + Send;
}

// =============================================================================
// In-memory store
// =============================================================================

/// [`CaseStore`] backed by a map, for tests and dry runs.
#[derive(Debug, Default)]
pub struct InMemoryCaseStore {
    records: Mutex<HashMap<String, CaseRecord>>,
}

impl InMemoryCaseStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with existing records.
    #[must_use]
    pub fn with_records(records: impl IntoIterator<Item = CaseRecord>) -> Self {
        Self {
            records: Mutex::new(records.into_iter().map(|r| (r.id.clone(), r)).collect()),
        }
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().map_or(0, |records| records.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CaseStore for InMemoryCaseStore {
    async fn load(&self, order_id: &str) -> Result<Option<CaseRecord>, StoreError> {
        let records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(records.get(order_id).cloned())
    }

    async fn create(&self, record: &CaseRecord) -> Result<(), StoreError> {
        let mut records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        if records.contains_key(&record.id) {
            return Err(StoreError::Duplicate(record.id.clone()));
        }
        records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn save(&self, record: &CaseRecord) -> Result<(), StoreError> {
        let mut records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        match records.get_mut(&record.id) {
            Some(existing) => {
                existing.clone_from(record);
                Ok(())
            }
            None => Err(StoreError::NotFound(record.id.clone())),
        }
    }
}

// =============================================================================
// PostgreSQL store
// =============================================================================

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(5)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Internal row type for `signifyd_case` queries.
#[derive(Debug, sqlx::FromRow)]
struct CaseRow {
    order_increment: String,
    signifyd_status: String,
    code: Option<String>,
    guarantee: Option<String>,
    entries_text: String,
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
}

impl TryFrom<CaseRow> for CaseRecord {
    type Error = StoreError;

    fn try_from(row: CaseRow) -> Result<Self, Self::Error> {
        let signifyd_status = row.signifyd_status.parse::<CaseStatus>().map_err(|e| {
            StoreError::DataCorruption(format!("invalid case status in database: {e}"))
        })?;
        let guarantee = row
            .guarantee
            .filter(|g| !g.is_empty())
            .map(|g| g.parse::<Guarantee>())
            .transpose()
            .map_err(|e| StoreError::DataCorruption(format!("invalid guarantee in database: {e}")))?;

        Ok(Self {
            id: row.order_increment,
            signifyd_status,
            created: row.created,
            updated: row.updated,
            guarantee,
            code: row.code,
            entries_text: row.entries_text,
        })
    }
}

/// [`CaseStore`] backed by the `signifyd_case` table.
#[derive(Debug, Clone)]
pub struct PgCaseStore {
    pool: PgPool,
}

impl PgCaseStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl CaseStore for PgCaseStore {
    async fn load(&self, order_id: &str) -> Result<Option<CaseRecord>, StoreError> {
        let row = sqlx::query_as::<_, CaseRow>(
            r"
            SELECT order_increment, signifyd_status, code, guarantee,
                   entries_text, created, updated
            FROM signifyd_case
            WHERE order_increment = $1
            ",
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(CaseRecord::try_from).transpose()
    }

    async fn create(&self, record: &CaseRecord) -> Result<(), StoreError> {
        let result = sqlx::query(
            r"
            INSERT INTO signifyd_case (
                order_increment, signifyd_status, code, guarantee,
                entries_text, created, updated
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (order_increment) DO NOTHING
            ",
        )
        .bind(&record.id)
        .bind(record.signifyd_status.to_string())
        .bind(record.code.as_deref())
        .bind(record.guarantee.map(|g| g.as_str()))
        .bind(&record.entries_text)
        .bind(record.created)
        .bind(record.updated)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Duplicate(record.id.clone()));
        }
        Ok(())
    }

    async fn save(&self, record: &CaseRecord) -> Result<(), StoreError> {
        let result = sqlx::query(
            r"
            UPDATE signifyd_case
            SET signifyd_status = $2, code = $3, guarantee = $4,
                entries_text = $5, updated = $6
            WHERE order_increment = $1
            ",
        )
        .bind(&record.id)
        .bind(record.signifyd_status.to_string())
        .bind(record.code.as_deref())
        .bind(record.guarantee.map(|g| g.as_str()))
        .bind(&record.entries_text)
        .bind(record.updated)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(record.id.clone()));
        }
        Ok(())
    }
}
