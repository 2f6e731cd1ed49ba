// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the public petition surface.
//!
//! Every mutating request passes the rate limiter and the validator before
//! it reaches the signature service, so a rejected request changes nothing
//! in the store.

use crate::{
    admin,
    auth::AdminAuthManager,
    config::Config,
    error::{AppError, Result},
    limiter::{RateLimitResult, RateLimiter},
    models::{PetitionStats, Signature, SignatureCreate},
    render::{RenderedDocument, SignatureRenderer},
    service::SignatureService,
    validator,
};
use axum::{
    extract::{ConnectInfo, FromRequestParts, Path, State},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::{debug, info};

/// Shared application state.
pub struct AppState {
    pub signatures: SignatureService,
    pub petition_limiter: RateLimiter,
    pub api_limiter: RateLimiter,
    pub auth: Arc<AdminAuthManager>,
    pub renderer: Arc<dyn SignatureRenderer>,
    pub config: Config,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Caller identity used as the rate-limit key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub IpAddr);

impl FromRequestParts<Arc<AppState>> for ClientIp {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> std::result::Result<Self, Self::Rejection> {
        if state.config.trust_proxy_headers {
            let forwarded = parts
                .headers
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .and_then(|v| v.trim().parse::<IpAddr>().ok());
            if let Some(ip) = forwarded {
                return Ok(ClientIp(ip));
            }
        }

        let ConnectInfo(addr) = ConnectInfo::<SocketAddr>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::Internal("peer address unavailable".to_string()))?;
        Ok(ClientIp(addr.ip()))
    }
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "petition-service",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Public statistics, limited by the general API policy.
pub async fn petition_stats(
    State(state): State<Arc<AppState>>,
    ClientIp(ip): ClientIp,
) -> Result<Json<PetitionStats>> {
    admit(
        &state.api_limiter,
        ip,
        "Too many requests. Please try again later.",
    )?;
    Ok(Json(state.signatures.get_petition_stats().await?))
}

/// Submit a signature: rate limit, validate, sanitize, then persist.
///
/// Responds `201 Created` with the numbered signature.
pub async fn sign_petition(
    State(state): State<Arc<AppState>>,
    ClientIp(ip): ClientIp,
    Json(input): Json<SignatureCreate>,
) -> Result<(StatusCode, Json<Signature>)> {
    admit(
        &state.petition_limiter,
        ip,
        "Too many submission attempts. Please wait 5 minutes before trying again.",
    )?;

    let clean = validator::validate_submission(&input).map_err(|err| {
        info!(%ip, field = err.field(), error = %err, "Submission rejected");
        AppError::from(err)
    })?;

    let signature = state.signatures.create_signature(clean).await?;
    Ok((StatusCode::CREATED, Json(signature)))
}

/// Fetch one signature by id.
pub async fn get_signature(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Signature>> {
    Ok(Json(state.signatures.get_signature(&id).await?))
}

/// Download the signed petition as a PDF.
pub async fn download_pdf(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response> {
    let signature = state.signatures.get_signature(&id).await?;
    let document = state.renderer.render_pdf(&signature)?;
    Ok(attachment(&signature.id, document))
}

/// Download the signed petition as an image.
pub async fn download_image(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response> {
    let signature = state.signatures.get_signature(&id).await?;
    let document = state.renderer.render_image(&signature)?;
    Ok(attachment(&signature.id, document))
}

fn admit(limiter: &RateLimiter, ip: IpAddr, message: &'static str) -> Result<()> {
    match limiter.check(&ip.to_string()) {
        RateLimitResult::Allowed { remaining } => {
            debug!(%ip, remaining, "Request admitted");
            Ok(())
        }
        RateLimitResult::Limited { retry_after } => {
            info!(%ip, retry_after_secs = retry_after.as_secs(), "Request rate limited");
            Err(AppError::RateLimited {
                message,
                retry_after,
            })
        }
    }
}

fn attachment(signature_id: &str, document: RenderedDocument) -> Response {
    let disposition = document.content_disposition(signature_id);
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, document.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        document.bytes,
    )
        .into_response()
}

/// Public and admin routes over the shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let petition = Router::new()
        .route("/petition/stats", get(petition_stats))
        .route("/petition/sign", post(sign_petition))
        .route("/petition/signature/{id}", get(get_signature))
        .route("/petition/download-pdf/{id}", get(download_pdf))
        .route("/petition/download-image/{id}", get(download_image))
        .route("/health", get(health));

    petition
        .merge(admin::router(state.clone()))
        .with_state(state)
}
