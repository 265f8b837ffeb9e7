// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! In-process waitlist store.
//!
//! Mirrors the SQLite backend's semantics: the email index and the row
//! list are updated under one lock, so the uniqueness check and the insert
//! are a single step.

use super::{Result, StoreError, WaitlistStore};
use crate::model::{DailyCount, NewEntry, SignupStats, WaitlistEntry};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Default)]
struct Table {
    next_id: i64,
    emails: HashSet<String>,
    rows: Vec<WaitlistEntry>,
}

/// Mutex-guarded store; `memory` in the database URL selects it.
#[derive(Default)]
pub struct MemoryStore {
    table: Mutex<Table>,
    offline: AtomicBool,
    write_delay: Option<Duration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every insert, for exercising store timeouts.
    pub fn with_write_delay(delay: Duration) -> Self {
        Self {
            write_delay: Some(delay),
            ..Self::default()
        }
    }

    /// Make every call fail as if the database were unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("memory store offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl WaitlistStore for MemoryStore {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn insert(&self, entry: &NewEntry) -> Result<i64> {
        self.check_online()?;
        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }

        let mut table = self.table.lock().await;
        if !table.emails.insert(entry.email().to_string()) {
            return Err(StoreError::Conflict);
        }
        table.next_id += 1;
        let id = table.next_id;
        table.rows.push(entry.clone().into_entry(id));
        Ok(id)
    }

    async fn list_all(&self) -> Result<Vec<WaitlistEntry>> {
        self.check_online()?;
        let table = self.table.lock().await;
        let mut rows = table.rows.clone();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn aggregate_by_day(&self, limit: u32) -> Result<SignupStats> {
        self.check_online()?;
        let table = self.table.lock().await;
        let today = Utc::now().date_naive();

        let mut per_day: BTreeMap<NaiveDate, i64> = BTreeMap::new();
        let mut sources = HashSet::new();
        let mut stats = SignupStats::default();

        for row in &table.rows {
            let day = row.created_at.date_naive();
            *per_day.entry(day).or_insert(0) += 1;
            sources.insert(row.source_address.as_str());
            stats.total += 1;
            if row.willing_to_pay {
                stats.willing_to_pay += 1;
            }
            if row.profile_url.is_some() {
                stats.complete += 1;
            }
            if day == today {
                stats.today += 1;
            }
        }

        stats.unique_sources = sources.len() as i64;
        stats.daily = per_day
            .into_iter()
            .rev()
            .take(limit as usize)
            .map(|(date, count)| DailyCount { date, count })
            .collect();
        Ok(stats)
    }

    async fn ping(&self) -> Result<()> {
        self.check_online()
    }
}
