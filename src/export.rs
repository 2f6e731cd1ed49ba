// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! CSV export of signatures.

use crate::models::Signature;
use chrono::{DateTime, SecondsFormat, Utc};

const HEADER: &str = "signature_number,name,phone,email,timestamp";

/// Render signatures as CSV, one row per signature in the given order.
pub fn signatures_to_csv(signatures: &[Signature]) -> String {
    let mut out = String::with_capacity(64 * (signatures.len() + 1));
    out.push_str(HEADER);
    out.push_str("\r\n");

    for s in signatures {
        let row = [
            s.signature_number.to_string(),
            csv_field(&s.name),
            csv_field(&s.phone),
            csv_field(s.email.as_deref().unwrap_or("")),
            s.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        ];
        out.push_str(&row.join(","));
        out.push_str("\r\n");
    }
    out
}

/// `petition_signatures_YYYYMMDD_HHMMSS.csv`
pub fn export_filename(now: DateTime<Utc>) -> String {
    format!("petition_signatures_{}.csv", now.format("%Y%m%d_%H%M%S"))
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
