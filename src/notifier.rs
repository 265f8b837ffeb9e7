// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Welcome email delivery.
//!
//! The admission pipeline treats this as an opaque post-commit hook: a
//! failure here is logged and reported as `emailSent: false`, never as a
//! failed signup.

use crate::config::NotifierConfig;
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Notifier error types. None of these fail an admission.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Email service not configured")]
    NotConfigured,

    #[error("mail API request failed: {0}")]
    Transport(String),

    #[error("mail API rejected the message with status {0}")]
    Rejected(u16),

    #[error("mail API did not answer in time")]
    Timeout,
}

/// Observable result of one notification attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotifyOutcome {
    pub success: bool,
    pub detail: String,
}

impl From<&Result<String, NotifyError>> for NotifyOutcome {
    fn from(result: &Result<String, NotifyError>) -> Self {
        match result {
            Ok(detail) => Self {
                success: true,
                detail: detail.clone(),
            },
            Err(e) => Self {
                success: false,
                detail: e.to_string(),
            },
        }
    }
}

/// Sends the welcome message for a new entry.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver to `email`. On success returns a provider detail such as a
    /// message id.
    async fn notify(&self, email: &str, display_name: Option<&str>) -> Result<String, NotifyError>;
}

/// Local part of an email, used to greet the recipient.
pub fn display_name_for(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

/// Notifier used when no mail API is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn notify(&self, _email: &str, _display_name: Option<&str>) -> Result<String, NotifyError> {
        debug!("Email service not configured, skipping send");
        Err(NotifyError::NotConfigured)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MailAddress<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendMailBody<'a> {
    sender: MailAddress<'a>,
    to: Vec<MailAddress<'a>>,
    reply_to: MailAddress<'a>,
    subject: &'a str,
    text_content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendMailResponse {
    #[serde(default)]
    message_id: Option<String>,
}

/// Transactional mail API client.
pub struct HttpMailNotifier {
    api_url: String,
    api_key: String,
    sender_email: String,
    sender_name: Option<String>,
    subject: String,
    client: reqwest::Client,
}

impl HttpMailNotifier {
    /// Build a client from configuration; fails when a required field is
    /// missing.
    pub fn from_config(config: &NotifierConfig) -> anyhow::Result<Self> {
        let required = |value: &Option<String>, name: &str| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or_else(|| anyhow!("notifier.{name} is required"))
        };

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .context("building mail API client")?;

        Ok(Self {
            api_url: required(&config.api_url, "api_url")?,
            api_key: required(&config.api_key, "api_key")?,
            sender_email: required(&config.sender_email, "sender_email")?,
            sender_name: config.sender_name.clone(),
            subject: config.subject.clone(),
            client,
        })
    }

    fn sender(&self) -> MailAddress<'_> {
        MailAddress {
            email: &self.sender_email,
            name: self.sender_name.as_deref(),
        }
    }

    fn body<'a>(&'a self, email: &'a str, display_name: &'a str) -> SendMailBody<'a> {
        SendMailBody {
            sender: self.sender(),
            to: vec![MailAddress {
                email,
                name: Some(display_name),
            }],
            reply_to: self.sender(),
            subject: &self.subject,
            text_content: welcome_text(display_name),
        }
    }
}

#[async_trait]
impl Notifier for HttpMailNotifier {
    async fn notify(&self, email: &str, display_name: Option<&str>) -> Result<String, NotifyError> {
        let name = display_name.unwrap_or_else(|| display_name_for(email));

        let response = self
            .client
            .post(&self.api_url)
            .header("api-key", &self.api_key)
            .json(&self.body(email, name))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NotifyError::Timeout
                } else {
                    NotifyError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected(status.as_u16()));
        }

        // The body is informational; an unexpected shape is still a send.
        let message_id = response
            .json::<SendMailResponse>()
            .await
            .ok()
            .and_then(|r| r.message_id)
            .unwrap_or_else(|| "accepted".to_string());
        Ok(message_id)
    }
}

fn welcome_text(display_name: &str) -> String {
    format!(
        "Hey {display_name}!\n\n\
         Thanks for joining our waitlist! We're excited that you're interested in what we're building.\n\n\
         We'll send updates on our progress and let you know as soon as early access opens.\n\n\
         If anything about the idea gives you pause, just reply to this email.\n\n\
         Talk soon,\nThe Team\n"
    )
}
