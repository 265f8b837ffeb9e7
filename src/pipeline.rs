// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Signup admission pipeline.
//!
//! One request runs through, in order, stopping at the first failure:
//!
//! 1. Per-source rate limit
//! 2. Email presence and shape
//! 3. Optional profile URL (blank means absent)
//! 4. Status derivation (`complete` iff a profile URL survived step 3)
//! 5. Insert; the store's unique index decides duplicate emails
//!
//! Steps 1-5 form the commit phase ([`AdmissionPipeline::admit`]). The
//! welcome email is a separate post-commit hook whose outcome only sets
//! `email_sent`.

use crate::error::AdmissionError;
use crate::limiter::{AdmissionGate, RateLimitResult};
use crate::metrics::Metrics;
use crate::model::{EntryStatus, NewEntry};
use crate::notifier::{display_name_for, NotifyError, NotifyOutcome, Notifier};
use crate::store::{StoreError, WaitlistStore};
use crate::validator::SignupValidator;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// One signup as received from the transport layer.
#[derive(Debug, Clone, Default)]
pub struct SignupRequest {
    pub email: Option<String>,
    pub profile_url: Option<String>,
    pub willing_to_pay: Option<bool>,
    pub source_address: String,
    pub client_agent: Option<String>,
}

/// Outcome of the commit phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admitted {
    pub id: i64,
    pub status: EntryStatus,
    pub email: String,
}

/// Outcome of a full submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submitted {
    pub id: i64,
    pub status: EntryStatus,
    pub email_sent: bool,
}

pub struct AdmissionPipeline {
    gate: Arc<dyn AdmissionGate>,
    validator: SignupValidator,
    store: Arc<dyn WaitlistStore>,
    notifier: Arc<dyn Notifier>,
    store_timeout: Duration,
    notify_timeout: Duration,
    metrics: Option<Metrics>,
}

impl AdmissionPipeline {
    pub fn new(
        gate: Arc<dyn AdmissionGate>,
        validator: SignupValidator,
        store: Arc<dyn WaitlistStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            gate,
            validator,
            store,
            notifier,
            store_timeout: DEFAULT_STORE_TIMEOUT,
            notify_timeout: DEFAULT_NOTIFY_TIMEOUT,
            metrics: None,
        }
    }

    pub fn with_store_timeout(mut self, store_timeout: Duration) -> Self {
        self.store_timeout = store_timeout;
        self
    }

    pub fn with_notify_timeout(mut self, notify_timeout: Duration) -> Self {
        self.notify_timeout = notify_timeout;
        self
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Admit the signup, then run the welcome email hook.
    pub async fn submit(&self, request: SignupRequest) -> Result<Submitted, AdmissionError> {
        let admitted = self.admit(request).await?;
        let email_sent = self.after_commit(&admitted).await;
        Ok(Submitted {
            id: admitted.id,
            status: admitted.status,
            email_sent,
        })
    }

    /// Commit phase: rate limit, validate, derive status, insert.
    pub async fn admit(&self, request: SignupRequest) -> Result<Admitted, AdmissionError> {
        let source = request.source_address;
        self.charge(&source).await?;

        let email = self
            .validator
            .check_email(request.email.as_deref())
            .map_err(|e| self.reject(&source, e.into()))?;

        let profile_url = self
            .validator
            .check_profile_url(request.profile_url.as_deref())
            .map_err(|e| self.reject(&source, e.into()))?;

        let entry = NewEntry::new(
            email,
            profile_url,
            request.willing_to_pay.unwrap_or(false),
            source,
            request.client_agent,
        );
        let status = entry.status();

        let id = match timeout(self.store_timeout, self.store.insert(&entry)).await {
            Ok(Ok(id)) => id,
            Ok(Err(StoreError::Conflict)) => {
                return Err(self.reject(entry.source_address(), AdmissionError::DuplicateEmail));
            }
            Ok(Err(StoreError::Unavailable(detail))) => {
                error!(backend = self.store.backend_tag(), %detail, "Store insert failed");
                return Err(self.reject(
                    entry.source_address(),
                    AdmissionError::StoreUnavailable(detail),
                ));
            }
            Err(_) => {
                error!(
                    backend = self.store.backend_tag(),
                    timeout_ms = self.store_timeout.as_millis() as u64,
                    "Store insert timed out"
                );
                return Err(self.reject(
                    entry.source_address(),
                    AdmissionError::StoreUnavailable("insert timed out".to_string()),
                ));
            }
        };

        info!(
            id,
            status = %status,
            domain = email_domain(entry.email()),
            willing_to_pay = entry.willing_to_pay(),
            "Waitlist entry admitted"
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_admission(status.as_str());
        }

        Ok(Admitted {
            id,
            status,
            email: entry.email().to_string(),
        })
    }

    /// Post-commit hook. Never fails; returns whether the email went out.
    pub async fn after_commit(&self, admitted: &Admitted) -> bool {
        let display_name = display_name_for(&admitted.email);
        let result = match timeout(
            self.notify_timeout,
            self.notifier.notify(&admitted.email, Some(display_name)),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(NotifyError::Timeout),
        };

        let outcome = NotifyOutcome::from(&result);
        if outcome.success {
            info!(id = admitted.id, detail = %outcome.detail, "Welcome email sent");
        } else {
            warn!(
                id = admitted.id,
                kind = "notifier_failed",
                detail = %outcome.detail,
                "Welcome email not sent"
            );
        }
        if let Some(metrics) = &self.metrics {
            metrics.record_notification(outcome.success);
        }
        outcome.success
    }

    /// Record one attempt against `source`'s window.
    ///
    /// Also called for requests rejected before they reach [`Self::admit`],
    /// such as an unreadable body, so those use up the window too.
    pub async fn charge(&self, source: &str) -> Result<(), AdmissionError> {
        match self.gate.admit(source).await {
            RateLimitResult::Allowed { .. } => Ok(()),
            RateLimitResult::Limited { retry_after } => {
                Err(self.reject(source, AdmissionError::RateLimited { retry_after }))
            }
        }
    }

    fn reject(&self, source: &str, err: AdmissionError) -> AdmissionError {
        match &err {
            AdmissionError::RateLimited { retry_after } => {
                warn!(source, retry_after_secs = retry_after.as_secs(), "Signup rate limited");
            }
            AdmissionError::StoreUnavailable(_) => {}
            other => debug!(source, kind = other.kind(), "Signup rejected"),
        }
        if let Some(metrics) = &self.metrics {
            metrics.record_rejection(err.kind());
        }
        err
    }
}

/// Domain part of an email, the only piece of it written to logs.
fn email_domain(email: &str) -> &str {
    email.rsplit_once('@').map(|(_, d)| d).unwrap_or("")
}
