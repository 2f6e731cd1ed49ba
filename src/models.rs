// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Data models for signatures, statistics and admin queries

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A persisted petition signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Unique signature identifier (UUID v4)
    pub id: String,
    /// Signer display name (HTML-escaped)
    pub name: String,
    /// Optional email address
    pub email: Option<String>,
    /// Phone number as submitted (HTML-escaped)
    pub phone: String,
    /// Creation time
    pub timestamp: DateTime<Utc>,
    /// Sequence number allocated from the petition counter
    pub signature_number: i64,
}

impl Signature {
    /// Build a new signature for an already-allocated number.
    ///
    /// Timestamps are kept at millisecond precision so they survive the store
    /// round trip unchanged.
    pub fn new(input: SignatureCreate, signature_number: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: input.name,
            email: input.email,
            phone: input.phone,
            timestamp: Utc::now().trunc_subsecs(3),
            signature_number,
        }
    }
}

/// Inbound signature submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureCreate {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub phone: String,
}

/// Public petition statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PetitionStats {
    pub total_signatures: i64,
    pub recent_signatures: Vec<RecentSignature>,
}

/// One entry of the recent-signers feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentSignature {
    pub name: String,
    /// Relative label such as "3 minutes ago"
    pub timestamp_label: String,
}

/// Query parameters for the admin listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignatureFilter {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub date_from: Option<String>,
    #[serde(default)]
    pub date_to: Option<String>,
}

/// One page of the admin listing.
#[derive(Debug, Clone, Serialize)]
pub struct SignaturePage {
    pub signatures: Vec<Signature>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: i64,
}

/// Aggregate counts for the admin dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct AdminStats {
    pub total_signatures: i64,
    pub today: i64,
    pub this_week: i64,
    pub this_month: i64,
    pub daily_trend: Vec<DailyCount>,
}

/// Signatures created on one UTC calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    /// `YYYY-MM-DD`
    pub date: String,
    pub count: i64,
}

/// Admin login request.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminLogin {
    pub username: String,
    pub password: String,
}

/// Admin login response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_in_seconds: u64,
}

/// Plain confirmation body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
