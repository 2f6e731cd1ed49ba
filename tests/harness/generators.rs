// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test data generators.

use petition_service::models::SignatureCreate;
use std::net::{IpAddr, Ipv4Addr};

/// Generate a pool of IP addresses for testing.
pub fn generate_ips(count: usize) -> Vec<IpAddr> {
    (0..count)
        .map(|i| {
            // Use 10.x.x.x private range
            let a = ((i >> 16) & 0xFF) as u8;
            let b = ((i >> 8) & 0xFF) as u8;
            let c = (i & 0xFF) as u8;
            IpAddr::V4(Ipv4Addr::new(10, a, b, c))
        })
        .collect()
}

/// A valid submission with a distinct name per index.
pub fn submission(i: usize) -> SignatureCreate {
    const FIRST: &[&str] = &["Asha", "Ravi", "Meera", "John", "Fatima", "Li", "Anita", "Karan"];
    const LAST: &[&str] = &["Sharma", "O'Brien", "Khan", "Iyer", "Smith-Jones", "Das"];
    let letter = (b'a' + (i % 26) as u8) as char;

    SignatureCreate {
        name: format!(
            "{} {}{}",
            FIRST[i % FIRST.len()],
            LAST[(i / FIRST.len()) % LAST.len()],
            letter
        ),
        email: (i % 2 == 0).then(|| format!("signer{i}@example.org")),
        phone: format!("+91 98{:08}", i),
    }
}

/// Names the validator must reject.
pub fn invalid_names() -> Vec<String> {
    vec![
        String::new(),
        "A".to_string(),
        " ".to_string(),
        "John123".to_string(),
        "<script>alert(1)</script>".to_string(),
        "Robert'); DROP TABLE signatures;--".to_string(),
        "x".repeat(101),
        "name@example.com".to_string(),
    ]
}

/// Phone numbers the validator must reject.
pub fn invalid_phones() -> Vec<&'static str> {
    vec![
        "",
        "12345",
        "+1234567890123456",
        "98765abcde",
        "+91 98765 4321x",
        "++919876543210",
        "91-9876-543210-1234",
    ]
}
