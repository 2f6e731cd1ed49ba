// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Admin authentication: Argon2id credential check and opaque bearer tokens.
//!
//! Tokens are 256 bits from the OS CSPRNG, URL-safe base64 encoded. The token
//! table lives in process memory only, so every token is invalidated by a
//! restart. Entries are keyed by the BLAKE3 digest of the token.

use crate::config::AdminConfig;
use crate::error::{AppError, Result};
use crate::handlers::AppState;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::Response,
};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use dashmap::DashMap;
use rand::rngs::OsRng;
use rand::RngCore;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

const TOKEN_BYTES: usize = 32;

/// Bearer token accepted by [`require_admin`], available to admin handlers.
#[derive(Debug, Clone)]
pub struct AdminToken(pub String);

/// Hash a password into an Argon2id PHC string with a random salt.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
}

/// Credential verification and token lifecycle for the single admin account.
pub struct AdminAuthManager {
    username: String,
    /// Argon2 PHC string; `None` keeps the admin surface closed
    password_hash: Option<String>,
    token_ttl: Duration,
    tokens: DashMap<blake3::Hash, Instant>,
}

impl AdminAuthManager {
    /// Build from configuration, hashing a plaintext password if one is set.
    pub fn from_config(config: &AdminConfig) -> Result<Self> {
        let password_hash = match (&config.password_hash, &config.password) {
            (Some(hash), _) => {
                PasswordHash::new(hash)
                    .map_err(|e| AppError::Internal(format!("invalid ADMIN_PASSWORD_HASH: {e}")))?;
                Some(hash.clone())
            }
            (None, Some(password)) => Some(hash_password(password)?),
            (None, None) => {
                warn!("No admin password configured; admin login is disabled");
                None
            }
        };

        Ok(Self::new(
            config.username.clone(),
            password_hash,
            config.token_ttl(),
        ))
    }

    pub fn new(username: String, password_hash: Option<String>, token_ttl: Duration) -> Self {
        Self {
            username,
            password_hash,
            token_ttl,
            tokens: DashMap::new(),
        }
    }

    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    /// True iff the username matches and the password verifies against the stored hash.
    pub fn verify_credentials(&self, username: &str, password: &str) -> bool {
        let Some(stored) = self.password_hash.as_deref() else {
            return false;
        };

        // Always run the hash so a wrong username costs the same as a wrong password.
        let password_ok = match PasswordHash::new(stored) {
            Ok(parsed) => Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                warn!(error = %e, "Stored admin password hash is unparseable");
                false
            }
        };

        username == self.username && password_ok
    }

    /// [`verify_credentials`](Self::verify_credentials) on the blocking pool.
    pub async fn verify_credentials_async(
        self: &Arc<Self>,
        username: String,
        password: String,
    ) -> Result<bool> {
        let manager = Arc::clone(self);
        tokio::task::spawn_blocking(move || manager.verify_credentials(&username, &password))
            .await
            .map_err(|e| AppError::Internal(format!("credential check panicked: {e}")))
    }

    /// Issue a fresh token valid for the configured lifetime.
    pub fn generate_token(&self) -> String {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        let token = URL_SAFE_NO_PAD.encode(bytes);

        self.tokens
            .insert(token_key(&token), Instant::now() + self.token_ttl);
        info!(active_tokens = self.tokens.len(), "Admin token issued");
        token
    }

    /// True iff the token is known and unexpired. Expired tokens are evicted.
    pub fn verify_token(&self, token: &str) -> bool {
        let key = token_key(token);
        let now = Instant::now();

        if self
            .tokens
            .remove_if(&key, |_, expiry| *expiry <= now)
            .is_some()
        {
            debug!("Expired admin token evicted");
            return false;
        }

        self.tokens
            .get(&key)
            .map(|expiry| *expiry > now)
            .unwrap_or(false)
    }

    /// Remove a token. Unknown tokens are ignored.
    pub fn revoke_token(&self, token: &str) {
        if self.tokens.remove(&token_key(token)).is_some() {
            info!("Admin token revoked");
        }
    }

    /// Drop every expired token and return how many were removed.
    pub fn cleanup_expired_tokens(&self) -> usize {
        let now = Instant::now();
        let keys: Vec<blake3::Hash> = self.tokens.iter().map(|e| *e.key()).collect();

        let removed = keys
            .iter()
            .filter(|key| {
                self.tokens
                    .remove_if(*key, |_, expiry| *expiry <= now)
                    .is_some()
            })
            .count();

        if removed > 0 {
            info!(removed, "Expired admin tokens cleaned up");
        }
        removed
    }

    /// Number of tokens currently held (expired ones included until swept).
    pub fn active_tokens(&self) -> usize {
        self.tokens.len()
    }
}

fn token_key(token: &str) -> blake3::Hash {
    blake3::hash(token.as_bytes())
}

/// Extract a bearer token from an `Authorization` header value.
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Middleware gating the admin router on a valid bearer token.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> std::result::Result<Response, AppError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(bearer_token)
        .map(str::to_owned)
        .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

    if !state.auth.verify_token(&token) {
        debug!(path = %request.uri().path(), "Rejected admin request");
        return Err(AppError::Unauthorized(
            "Invalid or expired token".to_string(),
        ));
    }

    request.extensions_mut().insert(AdminToken(token));
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(password: &str) -> AdminAuthManager {
        AdminAuthManager::new(
            "admin".to_string(),
            Some(hash_password(password).unwrap()),
            Duration::from_secs(24 * 60 * 60),
        )
    }

    #[test]
    fn test_verify_credentials() {
        let auth = manager("correct horse");

        assert!(auth.verify_credentials("admin", "correct horse"));
        assert!(!auth.verify_credentials("admin", "wrong"));
        assert!(!auth.verify_credentials("root", "correct horse"));
    }

    #[test]
    fn test_hash_is_salted() {
        let a = hash_password("same").unwrap();
        let b = hash_password("same").unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("$argon2id$"));
    }

    #[test]
    fn test_no_password_fails_closed() {
        let auth = AdminAuthManager::from_config(&AdminConfig::default()).unwrap();
        assert!(!auth.verify_credentials("admin", ""));
        assert!(!auth.verify_credentials("admin", "changeme123"));
    }

    #[test]
    fn test_precomputed_hash_accepted() {
        let config = AdminConfig {
            password_hash: Some(hash_password("from-env").unwrap()),
            ..AdminConfig::default()
        };
        let auth = AdminAuthManager::from_config(&config).unwrap();
        assert!(auth.verify_credentials("admin", "from-env"));
    }

    #[test]
    fn test_malformed_hash_rejected() {
        let config = AdminConfig {
            password_hash: Some("not-a-phc-string".to_string()),
            ..AdminConfig::default()
        };
        assert!(AdminAuthManager::from_config(&config).is_err());
    }

    #[test]
    fn test_token_shape() {
        let auth = manager("pw");
        let token = auth.generate_token();
        assert_eq!(token.len(), 43);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_ne!(token, auth.generate_token());
    }

    #[tokio::test(start_paused = true)]
    async fn test_token_lifecycle() {
        let auth = manager("pw");
        let token = auth.generate_token();

        assert!(auth.verify_token(&token));
        assert!(!auth.verify_token("made-up"));

        tokio::time::advance(Duration::from_secs(24 * 60 * 60 + 1)).await;
        assert!(!auth.verify_token(&token));
        assert_eq!(auth.active_tokens(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_revoke_is_idempotent() {
        let auth = manager("pw");
        let token = auth.generate_token();

        auth.revoke_token(&token);
        auth.revoke_token(&token);
        assert!(!auth.verify_token(&token));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_expired_tokens() {
        let auth = AdminAuthManager::new(
            "admin".to_string(),
            None,
            Duration::from_secs(60),
        );
        let old = auth.generate_token();
        tokio::time::advance(Duration::from_secs(30)).await;
        let fresh = auth.generate_token();

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(auth.cleanup_expired_tokens(), 1);
        assert!(!auth.verify_token(&old));
        assert!(auth.verify_token(&fresh));
    }

    #[test]
    fn test_bearer_parsing() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("bearer abc"), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Bearer"), None);
    }
}
