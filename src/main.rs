// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Petition Signature Service
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables (and `.env`):
//!
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `DB_PATH`: `memory` or a RocksDB directory (default: memory)
//! - `ADMIN_USERNAME` / `ADMIN_PASSWORD` / `ADMIN_PASSWORD_HASH`: admin account
//! - `PETITION_MAX_REQUESTS` / `PETITION_WINDOW_SECS`: submission limit (3 / 300)
//! - `API_MAX_REQUESTS` / `API_WINDOW_SECS`: read limit (60 / 60)
//! - `ALLOWED_ORIGINS`: comma-separated CORS allow-list
//!
//! Admin tokens are held in memory and are invalidated by a restart.

use http::{header, HeaderValue, Method};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use petition_service::{
    app::{build_state, spawn_maintenance},
    config::Config,
    handlers,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
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
    let config = Config::from_env();
    info!(
        bind_addr = %config.bind_addr,
        db_path = %config.database.path,
        petition_max_requests = config.rate_limit.petition.max_requests,
        petition_window_secs = config.rate_limit.petition.window_secs,
        api_max_requests = config.rate_limit.api.max_requests,
        api_window_secs = config.rate_limit.api.window_secs,
        "Starting petition service"
    );

    let cleanup_every = config.rate_limit.cleanup_interval();
    let cors = cors_layer(&config.allowed_origins);
    let addr: SocketAddr = config.bind_addr.parse()?;

    let state = build_state(config).await?;
    let maintenance = spawn_maintenance(state.clone(), cleanup_every);

    let app = handlers::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    maintenance.abort();
    info!("Shutdown complete");
    Ok(())
}

/// Restrictive CORS from a comma-separated origin list.
fn cors_layer(allowed_origins: &str) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .split(',')
        .filter_map(|o| o.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
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
