// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! SQLite-backed waitlist store.

use super::{Result, StoreError, WaitlistStore};
use crate::model::{DailyCount, NewEntry, SignupStats, WaitlistEntry};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// `created_at` holds unix milliseconds so day bucketing is plain
/// integer arithmetic on every platform.
const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS waitlist (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL UNIQUE,
    profile_url TEXT,
    willing_to_pay INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    source_address TEXT NOT NULL,
    client_agent TEXT
)
"#;

const CREATE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS waitlist_created_at_idx ON waitlist (created_at)";

#[derive(sqlx::FromRow)]
struct EntryRow {
    id: i64,
    email: String,
    profile_url: Option<String>,
    willing_to_pay: bool,
    created_at: i64,
    source_address: String,
    client_agent: Option<String>,
}

impl TryFrom<EntryRow> for WaitlistEntry {
    type Error = StoreError;

    fn try_from(row: EntryRow) -> Result<Self> {
        let created_at = DateTime::<Utc>::from_timestamp_millis(row.created_at).ok_or_else(|| {
            StoreError::Unavailable(format!("entry {} has an invalid timestamp", row.id))
        })?;
        Ok(WaitlistEntry::from_parts(
            row.id,
            row.email,
            row.profile_url,
            row.willing_to_pay,
            created_at,
            row.source_address,
            row.client_agent,
        ))
    }
}

/// SQLite connection pool wrapper
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect and apply the schema.
    ///
    /// In-memory databases live only as long as their connection, so they
    /// get a single pinned connection.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));

        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let pool = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(max_connections)
                .connect_with(options.journal_mode(SqliteJournalMode::Wal))
                .await?
        };

        let store = Self { pool };
        store.init_schema().await?;
        info!(in_memory, "Connected to SQLite waitlist store");
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        sqlx::query(CREATE_INDEX).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl WaitlistStore for SqliteStore {
    fn backend_tag(&self) -> &'static str {
        "sqlite"
    }

    async fn insert(&self, entry: &NewEntry) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO waitlist \
             (email, profile_url, willing_to_pay, created_at, source_address, client_agent) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(entry.email())
        .bind(entry.profile_url())
        .bind(entry.willing_to_pay())
        .bind(entry.created_at().timestamp_millis())
        .bind(entry.source_address())
        .bind(entry.client_agent())
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        debug!(id, "Inserted waitlist row");
        Ok(id)
    }

    async fn list_all(&self) -> Result<Vec<WaitlistEntry>> {
        let rows: Vec<EntryRow> = sqlx::query_as(
            "SELECT id, email, profile_url, willing_to_pay, created_at, source_address, client_agent \
             FROM waitlist ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(WaitlistEntry::try_from).collect()
    }

    async fn aggregate_by_day(&self, limit: u32) -> Result<SignupStats> {
        let days: Vec<(String, i64)> = sqlx::query_as(
            "SELECT date(created_at / 1000, 'unixepoch') AS day, COUNT(*) AS signups \
             FROM waitlist GROUP BY day ORDER BY day DESC LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        let daily = days
            .into_iter()
            .map(|(day, count)| {
                NaiveDate::parse_from_str(&day, "%Y-%m-%d")
                    .map(|date| DailyCount { date, count })
                    .map_err(|e| StoreError::Unavailable(format!("bad day bucket {day}: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;

        let (total, willing_to_pay, complete, unique_sources): (i64, i64, i64, i64) =
            sqlx::query_as(
                "SELECT COUNT(*), \
                 COALESCE(SUM(CASE WHEN willing_to_pay THEN 1 ELSE 0 END), 0), \
                 COALESCE(SUM(CASE WHEN profile_url IS NOT NULL AND profile_url <> '' THEN 1 ELSE 0 END), 0), \
                 COUNT(DISTINCT source_address) \
                 FROM waitlist",
            )
            .fetch_one(&self.pool)
            .await?;

        let (start, end) = today_bounds_millis(Utc::now());
        let today: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM waitlist WHERE created_at >= ? AND created_at < ?",
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok(SignupStats {
            daily,
            total,
            willing_to_pay,
            complete,
            unique_sources,
            today,
        })
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// Half-open `[midnight, next midnight)` of the UTC day containing `now`.
fn today_bounds_millis(now: DateTime<Utc>) -> (i64, i64) {
    let midnight = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|t| t.and_utc())
        .unwrap_or(now);
    let next = midnight + ChronoDuration::days(1);
    (midnight.timestamp_millis(), next.timestamp_millis())
}
