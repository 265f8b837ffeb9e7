// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Waitlist Service
//!
//! Collects signups for a pre-launch product and guards the signup path:
//!
//! - Per-source sliding-window rate limiting (5 attempts per 15 minutes)
//! - Email shape validation
//! - Optional social profile URL, normalized and checked against an
//!   allow-list of platform domains
//! - Entry status derived from the profile URL (`complete` / `incomplete`)
//! - Email uniqueness enforced by the store, not pre-checked
//! - Best-effort welcome email after the entry is committed
//!
//! Operators get a session-guarded read surface: listing, daily stats and
//! CSV export.

pub mod auth;
pub mod config;
pub mod error;
pub mod export;
pub mod handlers;
pub mod limiter;
pub mod metrics;
pub mod model;
pub mod notifier;
pub mod pipeline;
pub mod store;
pub mod validator;

pub use config::Config;
pub use error::AdmissionError;
pub use limiter::{AdmissionGate, RateLimitResult, SlidingWindowLimiter};
pub use model::{EntryStatus, WaitlistEntry};
pub use pipeline::{AdmissionPipeline, SignupRequest, Submitted};
pub use store::{MemoryStore, SqliteStore, WaitlistStore};
pub use validator::{normalize_profile_url, validate_email, validate_profile_url, SignupValidator};
