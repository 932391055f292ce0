//! Compact three-part token codec.
//!
//! Only the payload (middle) segment is read. The signature is opaque here.

use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde_json::Value;
use thiserror::Error;

use crate::Claims;

/// The token could not be decoded into claims.
///
/// Deliberately carries no detail: callers treat every decode failure the
/// same way (as "no session").
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("malformed token")]
pub struct MalformedToken;

/// Standard alphabet, padding optional, lenient trailing bits.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

const UNSIGNED_HEADER: &str = r#"{"alg":"none","typ":"JWT"}"#;
const UNSIGNED_SIGNATURE: &str = "unsigned";

/// Decode the claims carried by `token`.
///
/// The token must be exactly three non-empty `.`-separated segments; the
/// middle one is base64url text holding a UTF-8 JSON object.
pub fn decode_token(token: &str) -> Result<Claims, MalformedToken> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 || segments.iter().any(|s| s.is_empty()) {
        tracing::debug!(segments = segments.len(), "token does not have three non-empty segments");
        return Err(MalformedToken);
    }

    let normalized: String = segments[1]
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();

    let bytes = PAYLOAD_ENGINE.decode(normalized.as_bytes()).map_err(|e| {
        tracing::debug!(error = %e, "token payload is not base64");
        MalformedToken
    })?;

    let text = String::from_utf8(bytes).map_err(|e| {
        tracing::debug!(error = %e, "token payload is not utf-8");
        MalformedToken
    })?;

    let value: Value = serde_json::from_str(&text).map_err(|e| {
        tracing::debug!(error = %e, "token payload is not json");
        MalformedToken
    })?;

    Claims::try_from(value).map_err(|_| {
        tracing::debug!("token payload is not a json object");
        MalformedToken
    })
}

/// Build an unsigned token around `claims`.
///
/// Fixture helper for tests and offline tooling; the result decodes with
/// [`decode_token`] but carries no real signature.
pub fn encode_unsigned(claims: &Claims) -> String {
    let payload = Value::Object(claims.as_map().clone()).to_string();
    format!(
        "{}.{}.{}",
        URL_SAFE_NO_PAD.encode(UNSIGNED_HEADER),
        URL_SAFE_NO_PAD.encode(payload),
        UNSIGNED_SIGNATURE
    )
}
