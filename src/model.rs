// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Waitlist entry types shared by the store, pipeline and handlers.

use chrono::{DateTime, NaiveDate, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Lifecycle stage of an entry, derived from its profile URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Incomplete,
    Complete,
}

impl EntryStatus {
    /// `Complete` iff a non-empty profile URL is present.
    pub fn for_profile_url(profile_url: Option<&str>) -> Self {
        match profile_url {
            Some(url) if !url.is_empty() => EntryStatus::Complete,
            _ => EntryStatus::Incomplete,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Incomplete => "incomplete",
            EntryStatus::Complete => "complete",
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated signup ready to be written.
///
/// Fields are private so an entry can only be built through
/// [`NewEntry::new`], which keeps the status derivation in one place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    email: String,
    profile_url: Option<String>,
    willing_to_pay: bool,
    created_at: DateTime<Utc>,
    source_address: String,
    client_agent: Option<String>,
}

impl NewEntry {
    pub fn new(
        email: String,
        profile_url: Option<String>,
        willing_to_pay: bool,
        source_address: String,
        client_agent: Option<String>,
    ) -> Self {
        Self {
            email,
            profile_url: profile_url.filter(|u| !u.is_empty()),
            willing_to_pay,
            created_at: Utc::now(),
            source_address,
            client_agent,
        }
    }

    /// Override the insert timestamp.
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn profile_url(&self) -> Option<&str> {
        self.profile_url.as_deref()
    }

    pub fn willing_to_pay(&self) -> bool {
        self.willing_to_pay
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn source_address(&self) -> &str {
        &self.source_address
    }

    pub fn client_agent(&self) -> Option<&str> {
        self.client_agent.as_deref()
    }

    pub fn status(&self) -> EntryStatus {
        EntryStatus::for_profile_url(self.profile_url())
    }

    /// Attach the store-assigned id.
    pub fn into_entry(self, id: i64) -> WaitlistEntry {
        WaitlistEntry {
            id,
            email: self.email,
            profile_url: self.profile_url,
            willing_to_pay: self.willing_to_pay,
            created_at: self.created_at,
            source_address: self.source_address,
            client_agent: self.client_agent,
        }
    }
}

/// A persisted waitlist signup.
///
/// `status` is not stored; it is read off `profile_url` whenever asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitlistEntry {
    pub id: i64,
    pub email: String,
    pub profile_url: Option<String>,
    pub willing_to_pay: bool,
    pub created_at: DateTime<Utc>,
    pub source_address: String,
    pub client_agent: Option<String>,
}

impl WaitlistEntry {
    /// Rebuild an entry read back from storage.
    pub fn from_parts(
        id: i64,
        email: String,
        profile_url: Option<String>,
        willing_to_pay: bool,
        created_at: DateTime<Utc>,
        source_address: String,
        client_agent: Option<String>,
    ) -> Self {
        let profile_url = profile_url.filter(|u| !u.is_empty());
        Self {
            id,
            email,
            profile_url,
            willing_to_pay,
            created_at,
            source_address,
            client_agent,
        }
    }

    pub fn status(&self) -> EntryStatus {
        EntryStatus::for_profile_url(self.profile_url.as_deref())
    }
}

impl Serialize for WaitlistEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("WaitlistEntry", 8)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("email", &self.email)?;
        state.serialize_field("profileUrl", &self.profile_url)?;
        state.serialize_field("willingToPay", &self.willing_to_pay)?;
        state.serialize_field("status", &self.status())?;
        state.serialize_field("createdAt", &self.created_at)?;
        state.serialize_field("sourceAddress", &self.source_address)?;
        state.serialize_field("clientAgent", &self.client_agent)?;
        state.end()
    }
}

/// Signups recorded on one UTC day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: i64,
}

/// Aggregate signup statistics for the admin dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupStats {
    /// Most recent day first.
    pub daily: Vec<DailyCount>,
    pub total: i64,
    pub willing_to_pay: i64,
    pub complete: i64,
    pub unique_sources: i64,
    pub today: i64,
}
