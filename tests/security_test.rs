// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Security tests for the HTTP surface.
//!
//! These drive the real router with abusive traffic patterns and check
//! that rate limiting, validation and admin authentication hold.

mod harness;

use axum::http::{header, StatusCode};
use harness::{generators, get, json_request, test_config, TestApp};
use petition_service::{
    config::RateLimitConfig,
    db::COUNTER_SEED,
    limiter::{RateLimitResult, RateLimiter},
};
use serde_json::{json, Value};
use std::net::IpAddr;
use std::sync::Arc;

fn valid_body(i: usize) -> Value {
    serde_json::to_value(generators::submission(i)).unwrap()
}

async fn total_signatures(app: &TestApp) -> i64 {
    let (status, body) = app
        .send(get("/petition/stats", Some("192.0.2.250".parse().unwrap()), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    body["total_signatures"].as_i64().unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new(test_config()).await;

    let (status, body) = app.send(get("/health", None, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_submission_flood_limited_per_ip() {
    let app = TestApp::new(test_config()).await;
    let ip: IpAddr = "203.0.113.7".parse().unwrap();

    for i in 0..3 {
        let (status, body) = app.sign(ip, valid_body(i)).await;
        assert_eq!(status, StatusCode::CREATED, "Submission {} should be accepted", i + 1);
        assert_eq!(body["signature_number"], COUNTER_SEED + 1 + i as i64);
    }

    let response = app
        .send_raw(json_request("POST", "/petition/sign", Some(ip), None, valid_body(3)))
        .await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = response.headers()[header::RETRY_AFTER]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!((1..=300).contains(&retry_after));

    assert_eq!(total_signatures(&app).await, COUNTER_SEED + 3);
}

#[tokio::test]
async fn test_rate_limited_body() {
    let app = TestApp::new(test_config()).await;
    let ip: IpAddr = "203.0.113.8".parse().unwrap();
    for i in 0..3 {
        app.sign(ip, valid_body(i)).await;
    }

    let (status, body) = app.sign(ip, valid_body(9)).await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["code"], "RATE_LIMITED");
    assert!(body["error"].as_str().unwrap().contains("5 minutes"));
    assert!(body["retry_after_secs"].as_u64().unwrap() >= 1);
}

#[tokio::test]
async fn test_distributed_ips_not_limited() {
    let app = TestApp::new(test_config()).await;
    let ips = generators::generate_ips(10);

    for (i, ip) in ips.iter().enumerate() {
        let (status, _) = app.sign(*ip, valid_body(i)).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    assert_eq!(total_signatures(&app).await, COUNTER_SEED + 10);
}

#[tokio::test]
async fn test_invalid_names_rejected_without_side_effects() {
    let app = TestApp::new(test_config()).await;
    let ips = generators::generate_ips(64);

    for (i, name) in generators::invalid_names().into_iter().enumerate() {
        let body = json!({ "name": name, "phone": "+91 98765 43210" });
        let (status, body) = app.sign(ips[i], body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "name {name:?} accepted");
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    assert_eq!(total_signatures(&app).await, COUNTER_SEED);
}

#[tokio::test]
async fn test_invalid_phones_rejected() {
    let app = TestApp::new(test_config()).await;
    let ips = generators::generate_ips(64);

    for (i, phone) in generators::invalid_phones().into_iter().enumerate() {
        let body = json!({ "name": "Asha Sharma", "phone": phone });
        let (status, _) = app.sign(ips[32 + i], body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "phone {phone:?} accepted");
    }

    assert_eq!(total_signatures(&app).await, COUNTER_SEED);
}

#[tokio::test]
async fn test_validation_error_messages() {
    let app = TestApp::new(test_config()).await;
    let ips = generators::generate_ips(3);

    let (_, body) = app
        .sign(ips[0], json!({ "name": "A", "phone": "9876543210" }))
        .await;
    assert_eq!(body["error"], "Name must be at least 2 characters long");

    let (_, body) = app
        .sign(ips[1], json!({ "name": "Asha", "phone": "12" }))
        .await;
    assert_eq!(body["error"], "Invalid phone number format");

    let (_, body) = app
        .sign(
            ips[2],
            json!({ "name": "Asha", "phone": "9876543210", "email": "not-an-email" }),
        )
        .await;
    assert_eq!(body["error"], "Invalid email format");
}

#[tokio::test]
async fn test_invalid_attempts_consume_quota() {
    let app = TestApp::new(test_config()).await;
    let ip: IpAddr = "198.51.100.4".parse().unwrap();

    for _ in 0..3 {
        let (status, _) = app
            .sign(ip, json!({ "name": "<b>bold</b>", "phone": "9876543210" }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let (status, _) = app.sign(ip, valid_body(0)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_read_endpoints_limited() {
    let mut config = test_config();
    config.rate_limit.api = RateLimitConfig {
        max_requests: 2,
        window_secs: 60,
    };
    let app = TestApp::new(config).await;
    let ip: IpAddr = "198.51.100.9".parse().unwrap();

    for _ in 0..2 {
        let (status, _) = app.send(get("/petition/stats", Some(ip), None)).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, _) = app.send(get("/petition/stats", Some(ip), None)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_stored_fields_escaped() {
    let app = TestApp::new(test_config()).await;
    let ip: IpAddr = "198.51.100.20".parse().unwrap();

    let (status, created) = app
        .sign(ip, json!({ "name": "D'Souza", "phone": "9876543210" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["name"], "D&#x27;Souza");

    let id = created["id"].as_str().unwrap();
    let (status, fetched) = app
        .send(get(&format!("/petition/signature/{id}"), None, None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn test_unknown_signature_is_404() {
    let app = TestApp::new(test_config()).await;

    for uri in [
        "/petition/signature/missing",
        "/petition/download-pdf/missing",
        "/petition/download-image/missing",
    ] {
        let (status, body) = app.send(get(uri, None, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(body["error"], "Signature not found");
    }
}

#[tokio::test]
async fn test_certificate_downloads() {
    let app = TestApp::new(test_config()).await;
    let (_, created) = app.sign("198.51.100.30".parse().unwrap(), valid_body(5)).await;
    let id = created["id"].as_str().unwrap();

    let pdf = app
        .send_raw(get(&format!("/petition/download-pdf/{id}"), None, None))
        .await;
    assert_eq!(pdf.status(), StatusCode::OK);
    assert_eq!(pdf.headers()[header::CONTENT_TYPE], "application/pdf");
    let bytes = axum::body::to_bytes(pdf.into_body(), usize::MAX).await.unwrap();
    assert!(bytes.starts_with(b"%PDF-"));

    let image = app
        .send_raw(get(&format!("/petition/download-image/{id}"), None, None))
        .await;
    assert_eq!(image.status(), StatusCode::OK);
    let disposition = image.headers()[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.starts_with("attachment"));
    assert!(disposition.contains(id));
}

#[tokio::test]
async fn test_admin_routes_require_token() {
    let app = TestApp::new(test_config()).await;

    for uri in ["/admin/signatures", "/admin/stats", "/admin/export-csv"] {
        let response = app.send_raw(get(uri, None, None)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));

        let (status, _) = app.send(get(uri, None, Some("forged-token"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
    }

    let (status, _) = app
        .send(json_request("DELETE", "/admin/signature/any", None, None, Value::Null))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wrong_credentials_rejected() {
    let app = TestApp::new(test_config()).await;

    for (username, password) in [
        ("admin", "wrong"),
        ("root", harness::ADMIN_PASSWORD),
        ("", ""),
    ] {
        let (status, body) = app
            .send(json_request(
                "POST",
                "/admin/login",
                None,
                None,
                json!({ "username": username, "password": password }),
            ))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.get("token").is_none());
    }
}

#[tokio::test]
async fn test_login_disabled_without_password() {
    let mut config = test_config();
    config.admin.password = None;
    let app = TestApp::new(config).await;

    let (status, _) = app
        .send(json_request(
            "POST",
            "/admin/login",
            None,
            None,
            json!({ "username": "admin", "password": "" }),
        ))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_session_lifecycle() {
    let app = TestApp::new(test_config()).await;
    let ips = generators::generate_ips(3);
    for (i, ip) in ips.iter().enumerate() {
        app.sign(*ip, valid_body(i)).await;
    }

    let token = app.login().await;
    assert_eq!(token.len(), 43);

    let (status, page) = app
        .send(get("/admin/signatures?page=1&limit=2", None, Some(&token)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 3);
    assert_eq!(page["total_pages"], 2);
    assert_eq!(page["signatures"].as_array().unwrap().len(), 2);

    let (status, stats) = app.send(get("/admin/stats", None, Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["today"], 3);

    let (status, _) = app
        .send(json_request("POST", "/admin/logout", None, Some(&token), Value::Null))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .send(get("/admin/signatures", None, Some(&token)))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_delete_and_export() {
    let app = TestApp::new(test_config()).await;
    let ips = generators::generate_ips(2);
    let (_, keep) = app.sign(ips[0], valid_body(0)).await;
    let (_, spam) = app.sign(ips[1], valid_body(1)).await;
    let token = app.login().await;

    let spam_id = spam["id"].as_str().unwrap();
    let uri = format!("/admin/signature/{spam_id}");
    let (status, _) = app
        .send(json_request("DELETE", &uri, None, Some(&token), Value::Null))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .send(json_request("DELETE", &uri, None, Some(&token), Value::Null))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The public total is the counter and never goes backwards.
    assert_eq!(total_signatures(&app).await, COUNTER_SEED + 2);

    let response = app
        .send_raw(get("/admin/export-csv", None, Some(&token)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/csv"));
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let csv = String::from_utf8(bytes.to_vec()).unwrap();
    assert_eq!(csv.lines().count(), 2);
    let row_for = |signature: &Value| format!("{},", signature["signature_number"]);
    assert!(csv.lines().skip(1).any(|l| l.starts_with(&row_for(&keep))));
    assert!(!csv.lines().any(|l| l.starts_with(&row_for(&spam))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_flood_admits_exactly_limit() {
    let limiter = Arc::new(RateLimiter::new(RateLimitConfig {
        max_requests: 3,
        window_secs: 300,
    }));

    let tasks: Vec<_> = (0..64)
        .map(|_| {
            let limiter = limiter.clone();
            tokio::spawn(async move { limiter.check("203.0.113.50").is_allowed() })
        })
        .collect();

    let mut admitted = 0;
    for task in tasks {
        if task.await.unwrap() {
            admitted += 1;
        }
    }

    assert_eq!(admitted, 3);
    assert!(matches!(
        limiter.check("203.0.113.50"),
        RateLimitResult::Limited { .. }
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submissions_numbered_uniquely() {
    let app = Arc::new(TestApp::new(test_config()).await);
    let ips = generators::generate_ips(20);

    let tasks: Vec<_> = ips
        .into_iter()
        .enumerate()
        .map(|(i, ip)| {
            let app = app.clone();
            tokio::spawn(async move { app.sign(ip, valid_body(i)).await })
        })
        .collect();

    let mut numbers = Vec::new();
    for task in tasks {
        let (status, body) = task.await.unwrap();
        assert_eq!(status, StatusCode::CREATED);
        numbers.push(body["signature_number"].as_i64().unwrap());
    }

    numbers.sort_unstable();
    let expected: Vec<i64> = (COUNTER_SEED + 1..=COUNTER_SEED + 20).collect();
    assert_eq!(numbers, expected);
}
