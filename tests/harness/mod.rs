// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test harness: an in-memory service behind the real router.

#![allow(dead_code)]

pub mod generators;

use axum::{
    body::{to_bytes, Body},
    extract::connect_info::MockConnectInfo,
    http::{header, Request, StatusCode},
    Router,
};
use petition_service::{app::build_state, config::Config, handlers, AppState};
use serde_json::Value;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tower::ServiceExt;

pub const ADMIN_USER: &str = "admin";
pub const ADMIN_PASSWORD: &str = "correct horse battery staple";

/// Default test configuration: in-memory store, admin password set,
/// caller identity taken from `X-Forwarded-For`.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.admin.username = ADMIN_USER.to_string();
    config.admin.password = Some(ADMIN_PASSWORD.to_string());
    config.trust_proxy_headers = true;
    config
}

/// A running application and its shared state.
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
}

impl TestApp {
    pub async fn new(config: Config) -> Self {
        let state = build_state(config).await.expect("state builds");
        let router = handlers::router(state.clone())
            .layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))));
        Self { router, state }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    pub async fn send_raw(&self, request: Request<Body>) -> axum::response::Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub async fn sign(&self, ip: IpAddr, body: Value) -> (StatusCode, Value) {
        self.send(json_request("POST", "/petition/sign", Some(ip), None, body))
            .await
    }

    pub async fn login(&self) -> String {
        let (status, body) = self
            .send(json_request(
                "POST",
                "/admin/login",
                None,
                None,
                serde_json::json!({ "username": ADMIN_USER, "password": ADMIN_PASSWORD }),
            ))
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["token"].as_str().expect("token present").to_string()
    }
}

/// Build a request with an optional JSON body, caller IP and bearer token.
pub fn json_request(
    method: &str,
    uri: &str,
    ip: Option<IpAddr>,
    token: Option<&str>,
    body: Value,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(ip) = ip {
        builder = builder.header("x-forwarded-for", ip.to_string());
    }
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    if body.is_null() {
        builder.body(Body::empty()).expect("valid request")
    } else {
        builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("valid request")
    }
}

pub fn get(uri: &str, ip: Option<IpAddr>, token: Option<&str>) -> Request<Body> {
    json_request("GET", uri, ip, token, Value::Null)
}
