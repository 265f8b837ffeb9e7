// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Waitlist persistence.
//!
//! The pipeline only needs three things from a store: an insert whose
//! email uniqueness is enforced by the engine itself, a full listing, and
//! a per-day aggregate. Two backends implement [`WaitlistStore`]:
//! SQLite through sqlx, and an in-process map used for development and
//! tests.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::config::DatabaseConfig;
use crate::model::{NewEntry, SignupStats, WaitlistEntry};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Days returned by the stats endpoint when no limit is given.
pub const DEFAULT_STATS_DAYS: u32 = 30;

/// Store error types.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An entry with this email already exists.
    #[error("email already present")]
    Conflict,

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict,
            _ => StoreError::Unavailable(err.to_string()),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait WaitlistStore: Send + Sync {
    /// Short backend name for logs.
    fn backend_tag(&self) -> &'static str;

    /// Create an entry and return its id. Never overwrites.
    async fn insert(&self, entry: &NewEntry) -> Result<i64>;

    /// All entries, newest first.
    async fn list_all(&self) -> Result<Vec<WaitlistEntry>>;

    /// Per-day counts (at most `limit` days, newest first) plus totals.
    async fn aggregate_by_day(&self, limit: u32) -> Result<SignupStats>;

    /// Reachability check used by the health endpoints.
    async fn ping(&self) -> Result<()>;

    async fn close(&self) {}
}

/// Open the store named by `config.url`.
///
/// `memory` selects [`MemoryStore`]; anything else is handed to sqlx.
pub async fn connect(config: &DatabaseConfig) -> Result<Arc<dyn WaitlistStore>> {
    if config.url == "memory" {
        return Ok(Arc::new(MemoryStore::new()));
    }
    let store = SqliteStore::connect(&config.url, config.max_connections).await?;
    Ok(Arc::new(store))
}
