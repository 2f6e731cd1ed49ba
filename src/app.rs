// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Service assembly and background maintenance.

use crate::{
    auth::AdminAuthManager,
    config::Config,
    db::Database,
    error::Result,
    handlers::AppState,
    limiter::RateLimiter,
    render::CertificateRenderer,
    service::SignatureService,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Connect the store and construct every service from `config`.
pub async fn build_state(config: Config) -> Result<Arc<AppState>> {
    let db = Database::connect(&config.database).await?;
    let auth = AdminAuthManager::from_config(&config.admin)?;

    Ok(Arc::new(AppState {
        signatures: SignatureService::new(db),
        petition_limiter: RateLimiter::new(config.rate_limit.petition),
        api_limiter: RateLimiter::new(config.rate_limit.api),
        auth: Arc::new(auth),
        renderer: Arc::new(CertificateRenderer),
        config,
    }))
}

/// Periodically sweep both rate limiters and the admin token table.
///
/// Abort the returned handle to stop the task.
pub fn spawn_maintenance(state: Arc<AppState>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // The first tick completes immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            run_maintenance(&state);
        }
    })
}

/// One sweep over every piece of expiring in-memory state.
pub fn run_maintenance(state: &AppState) {
    let petition = state.petition_limiter.cleanup();
    let api = state.api_limiter.cleanup();
    let tokens = state.auth.cleanup_expired_tokens();
    debug!(petition, api, tokens, "Maintenance sweep finished");
}
