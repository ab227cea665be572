//! Bearer token payload decoding
//!
//! Claims returned here are **untrusted**: no signature verification is
//! performed. Use them for display and routing hints only, never for
//! authorization decisions without server-side verification.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde_json::{Map, Value};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Decoded token claims
pub type Claims = Map<String, Value>;

// Matches browser `atob` leniency: padding optional, trailing bits ignored.
const FORGIVING: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Decode the payload segment of a three-segment bearer token.
///
/// Returns `None` when the token does not have exactly three `.`-delimited
/// segments, when the payload is not valid base64url, not UTF-8, not JSON,
/// or not a JSON object.
///
/// # Example
/// ```
/// use auth_session::auth::extract_claims;
///
/// // {"sub":"u1"}
/// let claims = extract_claims("e30.eyJzdWIiOiJ1MSJ9.sig").unwrap();
/// assert_eq!(claims["sub"], "u1");
///
/// assert!(extract_claims("not-a-token").is_none());
/// ```
#[must_use]
pub fn extract_claims(token: &str) -> Option<Claims> {
    let mut segments = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return None;
    };

    let normalized = payload.replace('-', "+").replace('_', "/");
    let bytes = FORGIVING.decode(normalized).ok()?;
    let text = String::from_utf8(bytes).ok()?;

    match serde_json::from_str::<Value>(&text).ok()? {
        Value::Object(claims) => Some(claims),
        _ => None,
    }
}

/// Read the numeric `exp` claim (seconds since the Unix epoch)
#[must_use]
pub fn expires_at(claims: &Claims) -> Option<u64> {
    claims.get("exp").and_then(Value::as_u64)
}

/// Time left until the token's `exp`, if known and still in the future
#[must_use]
pub fn remaining_validity(token: &str) -> Option<Duration> {
    let expires_at = extract_claims(token).as_ref().and_then(expires_at)?;
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs();
    (expires_at > now).then(|| Duration::from_secs(expires_at - now))
}
