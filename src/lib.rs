// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Petition Signature Service
//!
//! Accepts numbered petition signatures from the public and exposes a small
//! admin surface:
//!
//! - Sliding-window rate limiting per caller IP (3 submissions / 5 min, 60 reads / min)
//! - Name, phone and email validation with HTML escaping before storage
//! - Gap-tolerant sequence numbers from an atomic store counter (seeded at 12847)
//! - Argon2id admin credentials and opaque 256-bit bearer tokens
//! - PDF / image certificates and CSV export

pub mod admin;
pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod handlers;
pub mod limiter;
pub mod models;
pub mod render;
pub mod service;
pub mod validator;

pub use config::Config;
pub use error::{AppError, Result};
pub use handlers::AppState;
pub use limiter::{RateLimitResult, RateLimiter};
pub use service::SignatureService;
