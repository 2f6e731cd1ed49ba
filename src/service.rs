// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Signature numbering, persistence and aggregate queries.
//!
//! Numbers come from the store's atomic counter. A failure after a number is
//! allocated but before the signature is written leaves that number unused
//! for good; numbers are a display count, so the gap is logged and accepted
//! rather than reused.

use crate::{
    db::{Database, SignatureQuery},
    error::{AppError, Result},
    models::{
        AdminStats, DailyCount, PetitionStats, RecentSignature, Signature, SignatureCreate,
        SignatureFilter, SignaturePage,
    },
};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use std::collections::BTreeMap;
use tracing::{info, warn};

pub const RECENT_SIGNATURES: u32 = 5;
pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 500;
pub const TREND_DAYS: i64 = 30;

/// Signature operations over the document store.
#[derive(Clone)]
pub struct SignatureService {
    db: Database,
}

impl SignatureService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Atomically take the next signature number.
    pub async fn allocate_next_number(&self) -> Result<i64> {
        self.db.increment_counter().await
    }

    /// Number and persist a validated submission.
    pub async fn create_signature(&self, input: SignatureCreate) -> Result<Signature> {
        let number = self.allocate_next_number().await?;
        let signature = Signature::new(input, number);

        if let Err(err) = self.db.insert_signature(&signature).await {
            warn!(
                signature_number = number,
                error = %err,
                "Signature not persisted; number left unused"
            );
            return Err(err);
        }

        info!(
            id = %signature.id,
            signature_number = signature.signature_number,
            "Signature created"
        );
        Ok(signature)
    }

    /// Exact lookup by id.
    pub async fn get_signature(&self, id: &str) -> Result<Signature> {
        self.db
            .get_signature(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Signature not found".to_string()))
    }

    /// Counter total plus the most recent signers with relative labels.
    pub async fn get_petition_stats(&self) -> Result<PetitionStats> {
        let total_signatures = self.db.counter_value().await?;
        let recent = self.db.recent_signatures(RECENT_SIGNATURES).await?;
        let now = Utc::now();

        Ok(PetitionStats {
            total_signatures,
            recent_signatures: recent
                .into_iter()
                .map(|s| RecentSignature {
                    timestamp_label: relative_label(now, s.timestamp),
                    name: s.name,
                })
                .collect(),
        })
    }

    /// Filtered, paginated listing for the admin surface.
    pub async fn list_signatures(&self, filter: &SignatureFilter) -> Result<SignaturePage> {
        let page = filter.page.unwrap_or(1).max(1);
        let limit = filter
            .limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let query = SignatureQuery::try_from(filter)?;

        let total = self.db.count_signatures(&query).await?;
        let start = u64::from(page - 1) * u64::from(limit);
        let signatures = self.db.list_signatures(&query, limit, start).await?;

        Ok(SignaturePage {
            signatures,
            total,
            page,
            limit,
            total_pages: (total + i64::from(limit) - 1) / i64::from(limit),
        })
    }

    /// Daily, weekly, monthly counts and a 30-day trend, all in UTC.
    pub async fn admin_stats(&self, now: DateTime<Utc>) -> Result<AdminStats> {
        let total_signatures = self.db.count_signatures(&SignatureQuery::default()).await?;
        let windows = StatsWindows::at(now);
        let timestamps = self.db.timestamps_since(windows.earliest()).await?;
        Ok(windows.aggregate(total_signatures, &timestamps))
    }

    /// Remove a signature. The counter is not decremented.
    pub async fn delete_signature(&self, id: &str) -> Result<()> {
        if self.db.delete_signature(id).await? {
            info!(id, "Signature deleted");
            Ok(())
        } else {
            Err(AppError::NotFound("Signature not found".to_string()))
        }
    }

    /// Every signature, newest first, for export.
    pub async fn export_signatures(&self) -> Result<Vec<Signature>> {
        self.db.all_signatures().await
    }
}

impl TryFrom<&SignatureFilter> for SignatureQuery {
    type Error = AppError;

    fn try_from(filter: &SignatureFilter) -> Result<Self> {
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let from = filter
            .date_from
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| parse_date_bound(s, false))
            .transpose()?;
        let to = filter
            .date_to
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| parse_date_bound(s, true))
            .transpose()?;

        Ok(Self { search, from, to })
    }
}

/// Parse an RFC 3339 instant or a bare `YYYY-MM-DD` date.
///
/// A bare date used as an upper bound covers the whole day.
fn parse_date_bound(raw: &str, end_of_day: bool) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(instant.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest(format!("Invalid date: {raw}")))?;
    let start = Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN));
    Ok(if end_of_day {
        start + Duration::days(1) - Duration::milliseconds(1)
    } else {
        start
    })
}

/// "N seconds ago" style label for `then` as seen from `now`.
pub fn relative_label(now: DateTime<Utc>, then: DateTime<Utc>) -> String {
    let secs = (now - then).num_seconds().max(0);
    match secs {
        s if s < 60 => format!("{s} seconds ago"),
        s if s < 3600 => format!("{} minutes ago", s / 60),
        s if s < 86400 => format!("{} hours ago", s / 3600),
        s => format!("{} days ago", s / 86400),
    }
}

/// Period boundaries for the admin dashboard.
#[derive(Debug, Clone, Copy)]
struct StatsWindows {
    today: DateTime<Utc>,
    week: DateTime<Utc>,
    month: DateTime<Utc>,
    trend: DateTime<Utc>,
}

impl StatsWindows {
    fn at(now: DateTime<Utc>) -> Self {
        let date = now.date_naive();
        let midnight = |d: NaiveDate| Utc.from_utc_datetime(&d.and_time(NaiveTime::MIN));
        let today = midnight(date);
        let week = today - Duration::days(i64::from(date.weekday().num_days_from_monday()));
        let month = midnight(date.with_day(1).unwrap_or(date));
        let trend = today - Duration::days(TREND_DAYS);

        Self {
            today,
            week,
            month,
            trend,
        }
    }

    fn earliest(&self) -> DateTime<Utc> {
        self.trend.min(self.week).min(self.month)
    }

    fn aggregate(&self, total_signatures: i64, timestamps: &[DateTime<Utc>]) -> AdminStats {
        let since = |start: DateTime<Utc>| timestamps.iter().filter(|t| **t >= start).count() as i64;

        let mut per_day: BTreeMap<NaiveDate, i64> = BTreeMap::new();
        for t in timestamps.iter().filter(|t| **t >= self.trend) {
            *per_day.entry(t.date_naive()).or_insert(0) += 1;
        }

        AdminStats {
            total_signatures,
            today: since(self.today),
            this_week: since(self.week),
            this_month: since(self.month),
            daily_trend: per_day
                .into_iter()
                .map(|(date, count)| DailyCount {
                    date: date.format("%Y-%m-%d").to_string(),
                    count,
                })
                .collect(),
        }
    }
}
