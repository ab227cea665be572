//! Utility functions for logging session data
//!
//! Tokens are credentials. Anything that reaches a log goes through
//! [`redact_token`] first.

/// Number of leading token bytes kept by [`redact_token`]
pub const REDACTED_PREFIX_BYTES: usize = 8;

/// Safely truncate a string at a UTF-8 character boundary.
///
/// Returns a slice of at most `max_bytes` bytes.
///
/// # Example
/// ```
/// use auth_session::utils::safe_truncate;
///
/// let text = "Grüße";
/// assert_eq!(safe_truncate(text, 3), "Gr");
/// ```
#[inline]
#[must_use]
pub fn safe_truncate(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }

    let mut boundary = max_bytes;
    while boundary > 0 && !s.is_char_boundary(boundary) {
        boundary -= 1;
    }

    &s[..boundary]
}

/// Render a token for logs: a short prefix plus its length.
///
/// # Example
/// ```
/// use auth_session::utils::redact_token;
///
/// assert_eq!(redact_token("eyJhbGciOiJSUzI1NiJ9.payload.sig"), "eyJhbGci…(32 bytes)");
/// assert_eq!(redact_token(""), "<empty>");
/// ```
#[must_use]
pub fn redact_token(token: &str) -> String {
    if token.is_empty() {
        return "<empty>".to_string();
    }
    format!(
        "{}…({} bytes)",
        safe_truncate(token, REDACTED_PREFIX_BYTES),
        token.len()
    )
}
