// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Waitlist Service
//!
//! ## Usage
//!
//! Run the binary with a config file (`waitlist.toml`, or the path in
//! `WAITLIST_CONFIG`) and/or `WAITLIST_*` environment variables:
//!
//! - `WAITLIST_BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `WAITLIST_DATABASE__URL`: sqlx URL or `memory` (default: sqlite://waitlist.db)
//! - `WAITLIST_RATE_LIMIT__MAX_ATTEMPTS`: Signups per window per source (default: 5)
//! - `WAITLIST_RATE_LIMIT__WINDOW_SECS`: Window length (default: 900)
//! - `WAITLIST_ADMIN__PASSWORD_HASH`: Argon2 PHC string enabling admin login
//! - `WAITLIST_NOTIFIER__API_URL`, `__API_KEY`, `__SENDER_EMAIL`: mail API
//!
//! A `.env` file in the working directory is read first.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use waitlist_service::{
    config::Config,
    handlers::{router, AppState},
    notifier::{DisabledNotifier, HttpMailNotifier, Notifier},
    store,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load configuration
    let config = Config::load()?;
    info!(
        bind_addr = %config.bind_addr,
        max_attempts = config.rate_limit.max_attempts,
        window_secs = config.rate_limit.window_secs,
        profile_domains = ?config.validation.profile_domains,
        "Starting waitlist service"
    );

    let store = store::connect(&config.database).await?;
    info!(backend = store.backend_tag(), "Store ready");

    let notifier: Arc<dyn Notifier> = if config.notifier.is_configured() {
        Arc::new(HttpMailNotifier::from_config(&config.notifier)?)
    } else {
        warn!("Mail API not configured, welcome emails are disabled");
        Arc::new(DisabledNotifier)
    };

    if config.admin.password_hash.is_none() {
        warn!("admin.password_hash not set, admin login is disabled");
    }

    let addr: SocketAddr = config.bind_addr.parse()?;
    let state = Arc::new(AppState::new(config, store.clone(), notifier)?);

    // Spawn cleanup task
    let cleanup_state = state.clone();
    let cleanup = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            cleanup_state.cleanup().await;
        }
    });

    let app = router(state);

    // Start server
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    cleanup.abort();
    store.close().await;
    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
