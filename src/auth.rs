// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Operator login and session tracking.
//!
//! The admin password is configured as an Argon2 PHC string and verified
//! on login. Sessions are random 32-byte tokens kept in memory with a
//! sliding expiry; they do not survive a restart.

use crate::config::AdminConfig;
use crate::error::{retry_after_secs, ErrorResponse};
use crate::limiter::{RateLimitResult, SlidingWindowLimiter};
use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use rand::RngCore;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "admin_session";

const TOKEN_BYTES: usize = 32;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Admin login is not configured")]
    NotConfigured,

    #[error("Username and password are required")]
    MissingCredentials,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Too many login attempts. Please try again later.")]
    RateLimited { retry_after: Duration },

    #[error("Unauthorized")]
    Unauthorized,
}

impl AuthError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotConfigured => "auth_not_configured",
            Self::MissingCredentials => "missing_credentials",
            Self::InvalidCredentials => "invalid_credentials",
            Self::RateLimited { .. } => "rate_limited",
            Self::Unauthorized => "unauthorized",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            Self::MissingCredentials => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials | Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let mut body = ErrorResponse::new(self.to_string(), self.kind());
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

/// One logged-in operator.
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub username: String,
    pub source_address: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Instant,
}

/// Credential check, login throttling, and the session table.
pub struct AdminAuth {
    username: String,
    password_hash: Option<String>,
    session_ttl: Duration,
    login_limiter: SlidingWindowLimiter,
    sessions: RwLock<HashMap<String, AdminSession>>,
}

impl AdminAuth {
    pub fn new(config: &AdminConfig) -> Self {
        Self {
            username: config.username.clone(),
            password_hash: config
                .password_hash
                .as_deref()
                .map(str::trim)
                .filter(|h| !h.is_empty())
                .map(str::to_string),
            session_ttl: config.session_ttl(),
            login_limiter: SlidingWindowLimiter::new(config.login_rate_limit()),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    /// Verify credentials and open a session. Returns the session token.
    ///
    /// Every attempt counts against the source's login window, successful
    /// or not.
    pub async fn login(
        &self,
        username: Option<&str>,
        password: Option<&str>,
        source_address: &str,
    ) -> Result<String, AuthError> {
        let Some(hash) = self.password_hash.as_deref() else {
            return Err(AuthError::NotConfigured);
        };

        if let RateLimitResult::Limited { retry_after } =
            self.login_limiter.check(source_address).await
        {
            warn!(source = source_address, "Admin login rate limited");
            return Err(AuthError::RateLimited { retry_after });
        }

        let (username, password) = match (username, password) {
            (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => (u, p),
            _ => return Err(AuthError::MissingCredentials),
        };

        // Verify even on a username mismatch so both failures cost the same.
        let password_ok = verify_password(hash, password);
        if username != self.username || !password_ok {
            warn!(source = source_address, "Admin login failed");
            return Err(AuthError::InvalidCredentials);
        }

        let token = generate_token();
        let now = Instant::now();
        self.sessions.write().await.insert(
            token.clone(),
            AdminSession {
                username: username.to_string(),
                source_address: source_address.to_string(),
                created_at: Utc::now(),
                expires_at: now + self.session_ttl,
            },
        );
        info!(source = source_address, "Admin session opened");
        Ok(token)
    }

    /// Look up a session, extending its expiry. Expired sessions are removed.
    pub async fn validate(&self, token: &str) -> Option<AdminSession> {
        let mut sessions = self.sessions.write().await;
        let now = Instant::now();
        match sessions.get_mut(token) {
            Some(session) if session.expires_at > now => {
                session.expires_at = now + self.session_ttl;
                Some(session.clone())
            }
            Some(_) => {
                sessions.remove(token);
                debug!("Admin session expired");
                None
            }
            None => None,
        }
    }

    /// Require a live session.
    pub async fn authorize(&self, token: Option<&str>) -> Result<AdminSession, AuthError> {
        match token {
            Some(token) => self.validate(token).await.ok_or(AuthError::Unauthorized),
            None => Err(AuthError::Unauthorized),
        }
    }

    pub async fn logout(&self, token: &str) -> bool {
        let removed = self.sessions.write().await.remove(token).is_some();
        if removed {
            info!("Admin session closed");
        }
        removed
    }

    /// Drop expired sessions and idle login windows.
    pub async fn cleanup(&self) {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.expires_at > now);
        let removed = before - sessions.len();
        drop(sessions);

        self.login_limiter.cleanup().await;
        if removed > 0 {
            debug!(removed, "Expired admin sessions removed");
        }
    }

    pub async fn active_sessions(&self) -> usize {
        self.sessions.read().await.len()
    }
}

fn verify_password(hash: &str, password: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!(error = %e, "Configured admin password hash is unreadable");
            false
        }
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// `Set-Cookie` value carrying a session token.
pub fn session_cookie(token: &str, ttl: Duration) -> String {
    format!(
        "{SESSION_COOKIE}={token}; HttpOnly; Secure; SameSite=Strict; Max-Age={}; Path=/",
        ttl.as_secs()
    )
}

/// `Set-Cookie` value that clears the session cookie.
pub fn cleared_cookie() -> String {
    format!("{SESSION_COOKIE}=; HttpOnly; Secure; SameSite=Strict; Max-Age=0; Path=/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::password_hash::{PasswordHasher, SaltString};
    use argon2::{Algorithm, Params, Version};

    // Light parameters keep tests fast; verification reads them from the hash.
    fn hash_of(password: &str) -> String {
        let salt = SaltString::from_b64("c29tZXNhbHR2YWx1ZTE").unwrap();
        let params = Params::new(1024, 1, 1, None).unwrap();
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
            .hash_password(password.as_bytes(), &salt)
            .unwrap()
            .to_string()
    }

    fn auth_with(password: &str) -> AdminAuth {
        AdminAuth::new(&AdminConfig {
            password_hash: Some(hash_of(password)),
            session_ttl_secs: 60,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_not_configured() {
        let auth = AdminAuth::new(&AdminConfig::default());
        let err = auth.login(Some("admin"), Some("pw"), "10.0.0.1").await.unwrap_err();
        assert!(matches!(err, AuthError::NotConfigured));
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_login_and_validate() {
        let auth = auth_with("hunter2");
        let token = auth.login(Some("admin"), Some("hunter2"), "10.0.0.1").await.unwrap();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));

        let session = auth.validate(&token).await.unwrap();
        assert_eq!(session.username, "admin");
        assert!(auth.validate("not-a-token").await.is_none());
    }

    #[tokio::test]
    async fn test_bad_credentials() {
        let auth = auth_with("hunter2");
        assert!(matches!(
            auth.login(Some("admin"), Some("wrong"), "10.0.0.1").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login(Some("root"), Some("hunter2"), "10.0.0.1").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login(Some("admin"), None, "10.0.0.1").await,
            Err(AuthError::MissingCredentials)
        ));
        assert_eq!(auth.active_sessions().await, 0);
    }

    #[tokio::test]
    async fn test_login_rate_limited() {
        let auth = auth_with("hunter2");
        for _ in 0..5 {
            let _ = auth.login(Some("admin"), Some("wrong"), "10.0.0.9").await;
        }
        let err = auth
            .login(Some("admin"), Some("hunter2"), "10.0.0.9")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::RateLimited { .. }));

        // Other sources are unaffected
        assert!(auth.login(Some("admin"), Some("hunter2"), "10.0.0.10").await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_slides_then_expires() {
        let auth = auth_with("hunter2");
        let token = auth.login(Some("admin"), Some("hunter2"), "10.0.0.1").await.unwrap();

        tokio::time::advance(Duration::from_secs(45)).await;
        assert!(auth.validate(&token).await.is_some());

        // Expiry was pushed out by the previous validation
        tokio::time::advance(Duration::from_secs(45)).await;
        assert!(auth.validate(&token).await.is_some());

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(auth.validate(&token).await.is_none());
        assert_eq!(auth.active_sessions().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_drops_expired() {
        let auth = auth_with("hunter2");
        auth.login(Some("admin"), Some("hunter2"), "10.0.0.1").await.unwrap();
        tokio::time::advance(Duration::from_secs(61)).await;
        auth.cleanup().await;
        assert_eq!(auth.active_sessions().await, 0);
    }

    #[tokio::test]
    async fn test_logout() {
        let auth = auth_with("hunter2");
        let token = auth.login(Some("admin"), Some("hunter2"), "10.0.0.1").await.unwrap();
        assert!(auth.logout(&token).await);
        assert!(!auth.logout(&token).await);
        assert!(matches!(
            auth.authorize(Some(&token)).await,
            Err(AuthError::Unauthorized)
        ));
    }

    #[test]
    fn test_cookie_attributes() {
        let cookie = session_cookie("abc", Duration::from_secs(86400));
        assert_eq!(
            cookie,
            "admin_session=abc; HttpOnly; Secure; SameSite=Strict; Max-Age=86400; Path=/"
        );
        assert!(cleared_cookie().contains("Max-Age=0"));
    }
}
