// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the waitlist service.
//!
//! The public surface is a single signup endpoint. Everything under
//! `/api/admin` and the read-only waitlist views require an operator
//! session, passed either as a bearer token or the `admin_session` cookie.

use crate::auth::{cleared_cookie, session_cookie, AdminAuth, SESSION_COOKIE};
use crate::config::Config;
use crate::error::{ApiError, ErrorResponse};
use crate::export::{render_csv, EXPORT_FILENAME};
use crate::limiter::SlidingWindowLimiter;
use crate::metrics::Metrics;
use crate::model::{EntryStatus, SignupStats, WaitlistEntry};
use crate::notifier::Notifier;
use crate::pipeline::{AdmissionPipeline, SignupRequest};
use crate::store::{WaitlistStore, DEFAULT_STATS_DAYS};
use crate::validator::SignupValidator;
use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, Query, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tokio::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

/// Upper bound for `?days=` on the stats endpoint.
pub const MAX_STATS_DAYS: u32 = 365;

/// Shared application state.
pub struct AppState {
    pub pipeline: AdmissionPipeline,
    pub signup_limiter: Arc<SlidingWindowLimiter>,
    pub store: Arc<dyn WaitlistStore>,
    pub auth: AdminAuth,
    pub metrics: Option<Metrics>,
    pub config: Config,
}

impl AppState {
    /// Wire the pipeline and admin auth from configuration.
    pub fn new(
        config: Config,
        store: Arc<dyn WaitlistStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, prometheus::Error> {
        let signup_limiter = Arc::new(SlidingWindowLimiter::new(config.rate_limit.clone()));
        let metrics = if config.metrics.enabled {
            Some(Metrics::new()?)
        } else {
            None
        };

        let mut pipeline = AdmissionPipeline::new(
            signup_limiter.clone(),
            SignupValidator::new(config.validation.clone()),
            store.clone(),
            notifier,
        )
        .with_store_timeout(config.database.timeout())
        .with_notify_timeout(config.notifier.timeout());
        if let Some(metrics) = &metrics {
            pipeline = pipeline.with_metrics(metrics.clone());
        }

        Ok(Self {
            pipeline,
            signup_limiter,
            store,
            auth: AdminAuth::new(&config.admin),
            metrics,
            config,
        })
    }

    /// Periodic sweep of limiter windows and expired sessions.
    pub async fn cleanup(&self) {
        self.signup_limiter.cleanup().await;
        self.auth.cleanup().await;
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub store: &'static str,
}

/// Signup request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub profile_url: Option<String>,
    /// Older clients send the profile link under this name.
    #[serde(default)]
    pub facebook: Option<String>,
    #[serde(default)]
    pub willing_to_pay: Option<bool>,
}

impl JoinRequest {
    /// `profileUrl` wins when both fields are sent.
    pub fn profile_url(&self) -> Option<String> {
        self.profile_url.clone().or_else(|| self.facebook.clone())
    }
}

/// Signup response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinResponse {
    pub success: bool,
    pub message: &'static str,
    pub id: i64,
    pub status: EntryStatus,
    pub email_sent: bool,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub success: bool,
    pub data: Vec<WaitlistEntry>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub success: bool,
    pub data: SignupStats,
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    #[serde(default)]
    pub days: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub message: &'static str,
    pub session_token: String,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub success: bool,
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in_secs: Option<u64>,
}

/// Caller address: the first `X-Forwarded-For` hop when trusted, else the
/// socket peer.
pub fn source_address(headers: &HeaderMap, peer: SocketAddr, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(addr) = forwarded {
            return addr.to_string();
        }
    }
    peer.ip().to_string()
}

/// Session token from `Authorization: Bearer` or the session cookie.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Health check endpoint.
pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    let reachable = state.store.ping().await.is_ok();
    let body = HealthResponse {
        status: if reachable { "healthy" } else { "unhealthy" },
        service: "waitlist-service",
        version: env!("CARGO_PKG_VERSION"),
        store: state.store.backend_tag(),
    };
    if reachable {
        (StatusCode::OK, Json(body)).into_response()
    } else {
        warn!(store = body.store, "Health check failed, store unreachable");
        (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
    }
}

/// Prometheus scrape endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let Some(metrics) = &state.metrics else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };
    let text = metrics
        .render()
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        text,
    )
        .into_response())
}

/// Join the waitlist.
pub async fn join(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Result<Json<JoinRequest>, JsonRejection>,
) -> Response {
    let source = source_address(&headers, peer, state.config.trust_forwarded_for);
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => {
            debug!(error = %rejection, "Unreadable signup body");
            if let Err(err) = state.pipeline.charge(&source).await {
                return err.into_response();
            }
            return ApiError::BadRequest("Invalid request body".to_string()).into_response();
        }
    };

    let request = SignupRequest {
        profile_url: req.profile_url(),
        email: req.email,
        willing_to_pay: req.willing_to_pay,
        source_address: source,
        client_agent: headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    };

    match state.pipeline.submit(request).await {
        Ok(submitted) => {
            let message = match submitted.status {
                EntryStatus::Complete => "Successfully joined the waitlist!",
                EntryStatus::Incomplete => {
                    "Entry recorded, but a social profile is needed for full access"
                }
            };
            Json(JoinResponse {
                success: true,
                message,
                id: submitted.id,
                status: submitted.status,
                email_sent: submitted.email_sent,
            })
            .into_response()
        }
        Err(err) => err.into_response(),
    }
}

/// All entries, newest first.
pub async fn list_entries(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ListResponse>, ApiError> {
    state.auth.authorize(session_token(&headers).as_deref()).await?;
    let data = state.store.list_all().await?;
    Ok(Json(ListResponse {
        success: true,
        total: data.len(),
        data,
    }))
}

/// Per-day signup counts.
pub async fn stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<StatsQuery>,
) -> Result<Json<StatsResponse>, ApiError> {
    state.auth.authorize(session_token(&headers).as_deref()).await?;
    let days = query
        .days
        .unwrap_or(DEFAULT_STATS_DAYS)
        .clamp(1, MAX_STATS_DAYS);
    let data = state.store.aggregate_by_day(days).await?;
    Ok(Json(StatsResponse {
        success: true,
        data,
    }))
}

/// CSV download of every entry.
pub async fn export(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    state.auth.authorize(session_token(&headers).as_deref()).await?;
    let entries = state.store.list_all().await?;
    let disposition = format!("attachment; filename=\"{EXPORT_FILENAME}\"");
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        render_csv(&entries),
    )
        .into_response())
}

/// Operator login.
pub async fn login(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = body.map_err(|_| ApiError::BadRequest("Invalid request body".to_string()))?;
    let source = source_address(&headers, peer, state.config.trust_forwarded_for);

    let token = state
        .auth
        .login(req.username.as_deref(), req.password.as_deref(), &source)
        .await?;

    let cookie = session_cookie(&token, state.auth.session_ttl());
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(LoginResponse {
            success: true,
            message: "Login successful",
            session_token: token,
        }),
    )
        .into_response())
}

/// Close the caller's session, if any.
pub async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Some(token) = session_token(&headers) {
        state.auth.logout(&token).await;
    }
    (
        [(header::SET_COOKIE, cleared_cookie())],
        Json(LogoutResponse {
            success: true,
            message: "Logged out",
        }),
    )
        .into_response()
}

/// Report whether the caller holds a live session.
pub async fn session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Json<SessionResponse> {
    let session = match session_token(&headers) {
        Some(token) => state.auth.validate(&token).await,
        None => None,
    };
    let Some(session) = session else {
        return Json(SessionResponse {
            success: true,
            authenticated: false,
            username: None,
            source_address: None,
            created_at: None,
            expires_in_secs: None,
        });
    };
    let expires_in = session.expires_at.saturating_duration_since(Instant::now());
    Json(SessionResponse {
        success: true,
        authenticated: true,
        username: Some(session.username),
        source_address: Some(session.source_address),
        created_at: Some(session.created_at),
        expires_in_secs: Some(expires_in.as_secs()),
    })
}

async fn fallback() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new("Not found", "not_found")),
    )
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| o.trim().parse().ok())
            .collect();
        AllowOrigin::list(origins)
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/api/waitlist", post(join).get(list_entries))
        .route("/api/waitlist/stats", get(stats))
        .route("/api/waitlist/export", get(export))
        .route("/api/admin/login", post(login))
        .route("/api/admin/logout", post(logout))
        .route("/api/admin/session", get(session));

    if state.config.metrics.enabled {
        app = app.route(&state.config.metrics.path, get(metrics));
    }

    app.fallback(fallback)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.cors.allowed_origins)),
        )
        .with_state(state)
}
