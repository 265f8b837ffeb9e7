// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Signup abuse patterns for security testing.

/// Attack pattern configuration.
#[derive(Debug, Clone)]
pub struct AttackConfig {
    /// Total number of signups to submit
    pub total_requests: usize,
    /// Number of distinct caller addresses
    pub unique_sources: usize,
    /// Number of distinct emails; requests cycle through them
    pub unique_emails: usize,
    /// Share of requests carrying a malformed email (0.0-1.0)
    pub malformed_email_ratio: f64,
    /// Share of requests carrying an unrecognized profile URL (0.0-1.0)
    pub foreign_profile_ratio: f64,
    /// Share of the remaining requests carrying a valid profile URL
    pub with_profile_ratio: f64,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            total_requests: 100,
            unique_sources: 1,
            unique_emails: 100,
            malformed_email_ratio: 0.0,
            foreign_profile_ratio: 0.0,
            with_profile_ratio: 0.5,
        }
    }
}

/// Predefined attack patterns.
impl AttackConfig {
    /// Single source flood - many distinct signups from one address.
    pub fn single_source_flood() -> Self {
        Self {
            total_requests: 200,
            unique_sources: 1,
            unique_emails: 200,
            ..Default::default()
        }
    }

    /// Distributed flood - many addresses, each over its allowance.
    pub fn distributed_flood() -> Self {
        Self {
            total_requests: 1000,
            unique_sources: 100,
            unique_emails: 1000,
            ..Default::default()
        }
    }

    /// Replay of one email from many addresses.
    pub fn duplicate_replay() -> Self {
        Self {
            total_requests: 50,
            unique_sources: 50,
            unique_emails: 1,
            ..Default::default()
        }
    }

    /// Garbage email spray, one attempt per address.
    pub fn malformed_email_spray() -> Self {
        Self {
            total_requests: 60,
            unique_sources: 60,
            malformed_email_ratio: 1.0,
            ..Default::default()
        }
    }

    /// Profile URLs pointing off-platform.
    pub fn foreign_profile_spray() -> Self {
        Self {
            total_requests: 40,
            unique_sources: 40,
            foreign_profile_ratio: 1.0,
            ..Default::default()
        }
    }

    /// Ordinary traffic: one signup per address.
    pub fn legitimate_trickle() -> Self {
        Self {
            total_requests: 100,
            unique_sources: 100,
            ..Default::default()
        }
    }

    /// Requests each address gets to spend before the limiter refuses it.
    pub fn admitted_ceiling(&self, max_attempts: usize) -> usize {
        let per_source = self.total_requests.div_ceil(self.unique_sources);
        self.unique_sources * per_source.min(max_attempts)
    }
}
