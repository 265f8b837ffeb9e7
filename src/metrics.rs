// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus counters for the signup path.

use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

/// Signup counters, registered on a private registry.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    admissions: IntCounterVec,
    rejections: IntCounterVec,
    notifications: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("waitlist".to_string()), None)?;

        let admissions = IntCounterVec::new(
            Opts::new("admissions_total", "Entries written, by status"),
            &["status"],
        )?;
        let rejections = IntCounterVec::new(
            Opts::new("rejections_total", "Signups refused, by error kind"),
            &["kind"],
        )?;
        let notifications = IntCounterVec::new(
            Opts::new("notifications_total", "Welcome email attempts, by outcome"),
            &["outcome"],
        )?;

        registry.register(Box::new(admissions.clone()))?;
        registry.register(Box::new(rejections.clone()))?;
        registry.register(Box::new(notifications.clone()))?;

        Ok(Self {
            registry,
            admissions,
            rejections,
            notifications,
        })
    }

    pub fn record_admission(&self, status: &str) {
        self.admissions.with_label_values(&[status]).inc();
    }

    pub fn record_rejection(&self, kind: &str) {
        self.rejections.with_label_values(&[kind]).inc();
    }

    pub fn record_notification(&self, sent: bool) {
        let outcome = if sent { "sent" } else { "failed" };
        self.notifications.with_label_values(&[outcome]).inc();
    }

    /// Render every registered metric in the text exposition format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
