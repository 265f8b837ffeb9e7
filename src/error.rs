// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Admission error types and their HTTP mapping.

use crate::auth::AuthError;
use crate::store::StoreError;
use crate::validator::ValidationError;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Why a signup was refused.
///
/// Display strings are safe to show to the caller except for
/// `StoreUnavailable`, whose detail is replaced by a generic message.
#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("Too many signup attempts, please try again later.")]
    RateLimited { retry_after: Duration },

    #[error("Email is required")]
    MissingEmail,

    #[error("Please enter a valid email address")]
    InvalidEmail,

    #[error("Please enter a valid social profile URL")]
    InvalidProfileUrl,

    #[error("This email is already on the waitlist!")]
    DuplicateEmail,

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl AdmissionError {
    /// Stable machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RateLimited { .. } => "rate_limited",
            Self::MissingEmail | Self::InvalidEmail => "invalid_email",
            Self::InvalidProfileUrl => "invalid_profile_url",
            Self::DuplicateEmail => "duplicate_email",
            Self::StoreUnavailable(_) => "store_unavailable",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::MissingEmail | Self::InvalidEmail | Self::InvalidProfileUrl => {
                StatusCode::BAD_REQUEST
            }
            Self::DuplicateEmail => StatusCode::CONFLICT,
            Self::StoreUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message returned to the caller.
    pub fn public_message(&self) -> String {
        match self {
            Self::StoreUnavailable(_) => "Server error, please try again".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<ValidationError> for AdmissionError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::MissingEmail => Self::MissingEmail,
            ValidationError::InvalidEmail => Self::InvalidEmail,
            ValidationError::InvalidProfileUrl => Self::InvalidProfileUrl,
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>, kind: &'static str) -> Self {
        Self {
            success: false,
            message: message.into(),
            kind,
            retry_after_secs: None,
        }
    }
}

/// Round a wait up to whole seconds, never below one.
pub fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    secs.max(1)
}

impl IntoResponse for AdmissionError {
    fn into_response(self) -> Response {
        let mut body = ErrorResponse::new(self.public_message(), self.kind());
        let retry_after = match &self {
            Self::RateLimited { retry_after } => Some(retry_after_secs(*retry_after)),
            _ => None,
        };
        body.retry_after_secs = retry_after;

        let mut response = (self.status_code(), Json(body)).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

/// Errors from the admin and operational endpoints.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Auth(err) => err.into_response(),
            Self::Store(err) => {
                tracing::error!(error = %err, "Store call failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse::new(
                        "Server error, please try again",
                        "store_unavailable",
                    )),
                )
                    .into_response()
            }
            Self::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new(message, "invalid_request")),
            )
                .into_response(),
            Self::Internal(detail) => {
                tracing::error!(%detail, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse::new("Server error, please try again", "internal")),
                )
                    .into_response()
            }
        }
    }
}
