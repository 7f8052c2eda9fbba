//! Expiry-claim extraction from bearer credentials.
//!
//! The credential is a JWT, but the client only reads the `exp` claim from
//! the payload segment. Signature verification stays on the server side;
//! nothing here treats the token as trusted.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("Malformed token: expected three dot-separated segments")]
    Malformed,
    #[error("Invalid payload encoding: {0}")]
    Encoding(#[from] base64::DecodeError),
    #[error("Invalid payload JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Token carries no exp claim")]
    MissingExp,
    #[error("exp claim is out of range")]
    InvalidExp,
}

#[derive(Deserialize)]
struct Claims {
    exp: Option<i64>,
}

/// Extract the expiry instant from a JWT's payload segment.
pub fn decode_expiry(token: &str) -> Result<DateTime<Utc>, ClaimError> {
    let mut segments = token.split('.');
    let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => return Err(ClaimError::Malformed),
    };

    let bytes = URL_SAFE_NO_PAD.decode(payload)?;
    let claims: Claims = serde_json::from_slice(&bytes)?;
    let exp = claims.exp.ok_or(ClaimError::MissingExp)?;

    Utc.timestamp_opt(exp, 0)
        .single()
        .ok_or(ClaimError::InvalidExp)
}
