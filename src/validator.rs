// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Signup input validator.
//!
//! Implements the shape checks applied before an entry is admitted:
//! - Email syntax (`local@domain.tld`, no RFC 5322 edge cases)
//! - Social profile URL normalization (bare handles get `https://`)
//! - Social profile host must belong to a recognized platform

use crate::config::{ValidationConfig, DEFAULT_PROFILE_DOMAINS};
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Longest email the waitlist table accepts.
pub const MAX_EMAIL_LEN: usize = 255;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Email is required")]
    MissingEmail,

    #[error("Please enter a valid email address")]
    InvalidEmail,

    #[error("Please enter a valid social profile URL")]
    InvalidProfileUrl,
}

/// Check that `s` looks like `local@domain.tld`.
///
/// Both sides of the single `@` must be non-empty and free of whitespace,
/// and the domain must contain a `.` with at least one character on
/// either side of it.
pub fn validate_email(s: &str) -> bool {
    if s.len() > MAX_EMAIL_LEN {
        return false;
    }

    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };

    let clean = |part: &str| !part.is_empty() && !part.chars().any(|c| c.is_whitespace() || c == '@');
    if !clean(local) || !clean(domain) {
        return false;
    }

    // A dot that is neither the first nor the last character of the domain.
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

/// Turn a bare handle or path into a fully-qualified URL.
///
/// Input already carrying an `http://` or `https://` scheme is only
/// trimmed; anything else gets `https://` prepended.
pub fn normalize_profile_url(s: &str) -> String {
    let trimmed = s.trim();
    if has_web_scheme(trimmed) {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

/// Check a profile URL against the default platform domains.
pub fn validate_profile_url(s: &str) -> bool {
    profile_host_allowed(s, DEFAULT_PROFILE_DOMAINS.iter().copied())
}

fn has_web_scheme(s: &str) -> bool {
    let starts_with = |prefix: &str| {
        s.get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
    };
    starts_with("http://") || starts_with("https://")
}

fn profile_host_allowed<'a>(raw: &str, domains: impl IntoIterator<Item = &'a str>) -> bool {
    if raw.trim().is_empty() {
        return false;
    }

    let normalized = normalize_profile_url(raw);
    let url = match Url::parse(&normalized) {
        Ok(u) => u,
        Err(_) => {
            debug!(url = %normalized, "Profile URL does not parse");
            return false;
        }
    };

    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }

    let Some(host) = url.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();

    domains.into_iter().any(|domain| host_matches(&host, domain))
}

/// `host` is `domain` itself or one of its subdomains.
fn host_matches(host: &str, domain: &str) -> bool {
    let domain = domain.trim().trim_start_matches('.').to_ascii_lowercase();
    if domain.is_empty() {
        return false;
    }
    host == domain
        || host
            .strip_suffix(domain.as_str())
            .is_some_and(|rest| rest.ends_with('.'))
}

/// Validator configured with the recognized profile domains.
#[derive(Debug, Clone)]
pub struct SignupValidator {
    config: ValidationConfig,
}

impl SignupValidator {
    /// Create a new validator with the given configuration.
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Trim the submitted email and check its shape.
    pub fn check_email(&self, email: Option<&str>) -> Result<String, ValidationError> {
        let email = match email.map(str::trim) {
            Some(e) if !e.is_empty() => e,
            _ => return Err(ValidationError::MissingEmail),
        };

        if validate_email(email) {
            Ok(email.to_string())
        } else {
            debug!("Email failed shape check");
            Err(ValidationError::InvalidEmail)
        }
    }

    /// Resolve the optional profile URL.
    ///
    /// Absent or blank input yields `Ok(None)`; anything else must be a
    /// recognized-domain URL and is returned normalized.
    pub fn check_profile_url(&self, raw: Option<&str>) -> Result<Option<String>, ValidationError> {
        let raw = match raw {
            Some(r) if !r.trim().is_empty() => r,
            _ => return Ok(None),
        };

        let domains = self.config.profile_domains.iter().map(String::as_str);
        if profile_host_allowed(raw, domains) {
            Ok(Some(normalize_profile_url(raw)))
        } else {
            debug!(url = %raw.trim(), "Profile URL rejected");
            Err(ValidationError::InvalidProfileUrl)
        }
    }
}

impl Default for SignupValidator {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}
