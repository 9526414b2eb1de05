//! crates/webshell_core/src/token.rs
//!
//! Reads the claims of a compact `header.payload.signature` token without
//! verifying the signature. Trust is assumed from the issuing server; the
//! only decision made here is whether the token is still usable.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use chrono::Utc;
use serde_json::{Map, Value as JsonValue};
use tracing::debug;

/// URL-safe alphabet, padding optional. Standard-alphabet input is
/// normalized to it before decoding.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("expected 3 segments, found {0}")]
    SegmentCount(usize),
    #[error("payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("payload is not a JSON object")]
    NotAnObject,
}

/// Decoded payload claims.
#[derive(Debug, Clone)]
pub struct TokenClaims {
    inner: Map<String, JsonValue>,
}

impl TokenClaims {
    /// `exp` in epoch seconds; fractional values are truncated.
    pub fn exp(&self) -> Option<i64> {
        match self.inner.get("exp")? {
            JsonValue::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            _ => None,
        }
    }

    fn string_claim(&self, key: &str) -> Option<String> {
        match self.inner.get(key)? {
            JsonValue::String(s) => Some(s.clone()),
            JsonValue::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Identity fields carried in the token payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenIdentity {
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
}

/// Splits the token, base64-decodes the middle segment and parses it as a JSON object.
///
/// # Errors
///
/// Returns a [`TokenError`] for a wrong segment count, an undecodable payload,
/// or a payload that is not a JSON object.
pub fn decode_payload(token: &str) -> Result<TokenClaims, TokenError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(TokenError::SegmentCount(segments.len()));
    }

    let normalized: String = segments[1]
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();
    let bytes = PAYLOAD_ENGINE.decode(normalized.trim_end_matches('='))?;

    match serde_json::from_slice::<JsonValue>(&bytes)? {
        JsonValue::Object(inner) => Ok(TokenClaims { inner }),
        _ => Err(TokenError::NotAnObject),
    }
}

/// True when the token is malformed, has no usable `exp`, or `exp` lies in the past.
pub fn is_expired(token: &str) -> bool {
    is_expired_at(token, Utc::now().timestamp())
}

/// [`is_expired`] against an explicit clock, in epoch seconds.
pub fn is_expired_at(token: &str, now: i64) -> bool {
    match decode_payload(token) {
        Ok(claims) => match claims.exp() {
            Some(exp) => exp < now,
            None => {
                debug!("Token payload has no numeric exp claim; treating as expired");
                true
            }
        },
        Err(e) => {
            debug!(error = %e, "Token could not be decoded; treating as expired");
            true
        }
    }
}

/// Extracts `userId`, `email` and `name` from the payload.
pub fn identity_from_token(token: &str) -> Option<TokenIdentity> {
    let claims = decode_payload(token).ok()?;
    Some(TokenIdentity {
        user_id: claims.string_claim("userId"),
        email: claims.string_claim("email"),
        name: claims.string_claim("name"),
    })
}

#[cfg(test)]
pub(crate) fn make_token(payload: &JsonValue) -> String {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{header}.{body}.signature")
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD;
    use serde_json::json;

    const NOW: i64 = 1_700_000_000;

    #[test]
    fn past_exp_is_expired() {
        let token = make_token(&json!({ "exp": NOW - 1 }));
        assert!(is_expired_at(&token, NOW));
    }

    #[test]
    fn future_exp_is_valid() {
        let token = make_token(&json!({ "exp": NOW + 3600 }));
        assert!(!is_expired_at(&token, NOW));
    }

    #[test]
    fn exp_equal_to_now_is_still_valid() {
        let token = make_token(&json!({ "exp": NOW }));
        assert!(!is_expired_at(&token, NOW));
    }

    #[test]
    fn fractional_exp_is_truncated() {
        let token = make_token(&json!({ "exp": (NOW + 10) as f64 + 0.75 }));
        assert!(!is_expired_at(&token, NOW));
    }

    #[test]
    fn missing_exp_is_expired() {
        let token = make_token(&json!({ "userId": "1" }));
        assert!(is_expired_at(&token, NOW));
    }

    #[test]
    fn string_exp_is_expired() {
        let token = make_token(&json!({ "exp": "tomorrow" }));
        assert!(is_expired_at(&token, NOW));
    }

    #[test]
    fn malformed_tokens_are_expired() {
        assert!(is_expired_at("", NOW));
        assert!(is_expired_at("garbage", NOW));
        assert!(is_expired_at("a.b", NOW));
        assert!(is_expired_at("a.b.c.d", NOW));
        assert!(is_expired_at("a.!!!.c", NOW));
        // valid base64, not JSON
        assert!(is_expired_at("a.aGVsbG8.c", NOW));
    }

    #[test]
    fn non_object_payload_is_rejected() {
        let token = format!("h.{}.s", STANDARD.encode("[1,2,3]"));
        assert!(matches!(decode_payload(&token), Err(TokenError::NotAnObject)));
    }

    #[test]
    fn segment_count_is_reported() {
        assert!(matches!(decode_payload("a.b"), Err(TokenError::SegmentCount(2))));
    }

    #[test]
    fn standard_alphabet_with_padding_decodes() {
        let payload = json!({ "exp": NOW + 60, "note": "?>?>" }).to_string();
        let token = format!("h.{}.s", STANDARD.encode(payload));
        let claims = decode_payload(&token).unwrap();
        assert_eq!(claims.exp(), Some(NOW + 60));
        assert_eq!(claims.string_claim("note").as_deref(), Some("?>?>"));
    }

    #[test]
    fn identity_is_extracted() {
        let token = make_token(&json!({
            "exp": NOW,
            "userId": 7,
            "email": "a@b.c",
            "name": "A"
        }));
        let identity = identity_from_token(&token).unwrap();
        assert_eq!(identity.user_id.as_deref(), Some("7"));
        assert_eq!(identity.email.as_deref(), Some("a@b.c"));
        assert_eq!(identity.name.as_deref(), Some("A"));
    }

    #[test]
    fn identity_of_garbage_is_none() {
        assert!(identity_from_token("nope").is_none());
    }
}
