// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Input validation and sanitization for petition submissions.
//!
//! Implements ingress-level checks before anything is persisted:
//! - Name length and character set
//! - Phone number shape (optional `+`, 10-15 digits after separators are stripped)
//! - Optional email shape
//! - HTML escaping of every stored field

use crate::models::SignatureCreate;
use thiserror::Error;
use tracing::debug;

pub const NAME_MAX_LEN: usize = 100;
pub const PHONE_MAX_LEN: usize = 20;
pub const EMAIL_MAX_LEN: usize = 100;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Name must be at least 2 characters long")]
    NameTooShort,

    #[error("Name must be less than 100 characters")]
    NameTooLong,

    #[error("Name contains invalid characters")]
    NameInvalidCharacters,

    #[error("Phone number is required")]
    PhoneMissing,

    #[error("Invalid phone number format")]
    PhoneInvalid,

    #[error("Email must be less than 100 characters")]
    EmailTooLong,

    #[error("Invalid email format")]
    EmailInvalid,
}

impl ValidationError {
    /// Name of the offending field.
    pub fn field(&self) -> &'static str {
        match self {
            Self::NameTooShort | Self::NameTooLong | Self::NameInvalidCharacters => "name",
            Self::PhoneMissing | Self::PhoneInvalid => "phone",
            Self::EmailTooLong | Self::EmailInvalid => "email",
        }
    }
}

/// Validate a signer's display name.
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().chars().count() < 2 {
        debug!("Name too short");
        return Err(ValidationError::NameTooShort);
    }

    if name.chars().count() > NAME_MAX_LEN {
        debug!("Name too long");
        return Err(ValidationError::NameTooLong);
    }

    let allowed = |c: char| c.is_alphabetic() || c.is_whitespace() || matches!(c, '.' | '-' | '\'');
    if !name.chars().all(allowed) {
        debug!("Name contains invalid characters");
        return Err(ValidationError::NameInvalidCharacters);
    }

    Ok(())
}

/// Validate a phone number after stripping common separators.
pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if phone.is_empty() {
        return Err(ValidationError::PhoneMissing);
    }

    let cleaned = normalize_phone(phone);
    let digits = cleaned.strip_prefix('+').unwrap_or(&cleaned);

    if !(10..=15).contains(&digits.len()) || !digits.bytes().all(|b| b.is_ascii_digit()) {
        debug!(length = digits.len(), "Invalid phone number");
        return Err(ValidationError::PhoneInvalid);
    }

    Ok(())
}

/// Validate an optional email address. Empty input is accepted.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Ok(());
    }

    if email.chars().count() > EMAIL_MAX_LEN {
        return Err(ValidationError::EmailTooLong);
    }

    if !is_email_shape(email) {
        debug!("Invalid email format");
        return Err(ValidationError::EmailInvalid);
    }

    Ok(())
}

/// Trim, truncate to `max_length` characters, then HTML-escape.
pub fn sanitize_string(value: &str, max_length: usize) -> String {
    let truncated: String = value.trim().chars().take(max_length).collect();
    escape_html(&truncated)
}

/// Validate every field of a submission and return the sanitized copy.
///
/// Checks run name, phone, email in that order; the first failure wins.
pub fn validate_submission(input: &SignatureCreate) -> Result<SignatureCreate, ValidationError> {
    validate_name(&input.name)?;
    validate_phone(&input.phone)?;

    let email = input.email.as_deref().filter(|e| !e.is_empty());
    if let Some(email) = email {
        validate_email(email)?;
    }

    Ok(SignatureCreate {
        name: sanitize_string(&input.name, NAME_MAX_LEN),
        phone: sanitize_string(&input.phone, PHONE_MAX_LEN),
        email: email
            .map(|e| sanitize_string(e, EMAIL_MAX_LEN))
            .filter(|e| !e.is_empty()),
    })
}

/// Strip whitespace, parentheses and hyphens.
fn normalize_phone(phone: &str) -> String {
    phone
        .chars()
        .filter(|c| !(c.is_whitespace() || matches!(c, '(' | ')' | '-')))
        .collect()
}

/// `local@domain.tld` with a conservative character set.
fn is_email_shape(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    let local_ok = !local.is_empty()
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '%' | '+' | '-'));
    if !local_ok {
        return false;
    }

    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };

    let host_ok = !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-'));
    let tld_ok = tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic());

    host_ok && tld_ok
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}
