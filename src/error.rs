// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error types for the petition service

use crate::validator::ValidationError;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::error;

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{message}")]
    RateLimited {
        message: &'static str,
        retry_after: Duration,
    },

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] surrealdb::Error),

    #[error("Storage operation timed out: {0}")]
    StorageTimeout(&'static str),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(_) | Self::StorageTimeout(_) | Self::Render(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Database(_) => "STORAGE_ERROR",
            Self::StorageTimeout(_) => "STORAGE_TIMEOUT",
            Self::Render(_) | Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to show to the caller. Internal detail stays in the logs.
    fn public_message(&self) -> String {
        match self {
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::StorageTimeout(_) => {
                "Service temporarily unavailable, please try again".to_string()
            }
            Self::Render(_) => "Failed to generate document".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, code = self.code(), "Request failed");
        }

        let retry_after = match &self {
            Self::RateLimited { retry_after, .. } => Some(retry_after.as_secs().max(1)),
            _ => None,
        };

        let body = ErrorResponse {
            error: self.public_message(),
            code: self.code(),
            retry_after_secs: retry_after,
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        if matches!(self, Self::Unauthorized(_)) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AppError>;
