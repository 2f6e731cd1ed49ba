// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Admin surface: login, listing, statistics, deletion and CSV export.
//!
//! Everything except `/admin/login` sits behind [`require_admin`].

use crate::{
    auth::{require_admin, AdminToken},
    error::{AppError, Result},
    export,
    handlers::AppState,
    models::{AdminLogin, AdminStats, LoginResponse, MessageResponse, SignatureFilter, SignaturePage},
};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

/// Exchange credentials for a bearer token.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(credentials): Json<AdminLogin>,
) -> Result<Json<LoginResponse>> {
    let username = credentials.username.clone();
    let valid = state
        .auth
        .verify_credentials_async(credentials.username, credentials.password)
        .await?;

    if !valid {
        warn!(username = %username, "Admin login failed");
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    }

    let token = state.auth.generate_token();
    info!(username = %username, "Admin logged in");
    Ok(Json(LoginResponse {
        token,
        expires_in_seconds: state.auth.token_ttl().as_secs(),
    }))
}

/// Revoke the presented token.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(AdminToken(token)): Extension<AdminToken>,
) -> Json<MessageResponse> {
    state.auth.revoke_token(&token);
    Json(MessageResponse::new("Logged out successfully"))
}

/// Paginated, filtered signature listing.
pub async fn list_signatures(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<SignatureFilter>,
) -> Result<Json<SignaturePage>> {
    Ok(Json(state.signatures.list_signatures(&filter).await?))
}

/// Dashboard statistics.
pub async fn stats(State(state): State<Arc<AppState>>) -> Result<Json<AdminStats>> {
    Ok(Json(state.signatures.admin_stats(Utc::now()).await?))
}

/// Delete one signature (spam or test entries).
pub async fn delete_signature(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    state.signatures.delete_signature(&id).await?;
    Ok(Json(MessageResponse::new("Signature deleted successfully")))
}

/// Full CSV dump as an attachment.
pub async fn export_csv(State(state): State<Arc<AppState>>) -> Result<Response> {
    let signatures = state.signatures.export_signatures().await?;
    let body = export::signatures_to_csv(&signatures);
    let disposition = format!("attachment; filename={}", export::export_filename(Utc::now()));
    info!(rows = signatures.len(), "Signatures exported");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

/// Admin routes; the state is supplied by the caller's `with_state`.
pub fn router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let protected = Router::new()
        .route("/admin/logout", post(logout))
        .route("/admin/signatures", get(list_signatures))
        .route("/admin/stats", get(stats))
        .route("/admin/signature/{id}", delete(delete_signature))
        .route("/admin/export-csv", get(export_csv))
        .route_layer(middleware::from_fn_with_state(state, require_admin));

    Router::new()
        .route("/admin/login", post(login))
        .merge(protected)
}
