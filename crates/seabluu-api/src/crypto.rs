//! Password hashing and signed session tokens for the web admin.
//!
//! A session token is `{payload}.{signature}`: the payload is the URL-safe
//! base64 of `{"login":..,"exp":..}` and the signature is the hex
//! HMAC-SHA256 of the payload text under the admin secret. Tokens carry
//! their own expiry, so the server keeps no session table.

use base64::{engine::general_purpose::URL_SAFE, Engine};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Session token failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Token is not `{payload}.{signature}` or the payload is not valid JSON.
    #[error("malformed session token")]
    Malformed,
    /// Signature does not match the payload.
    #[error("session signature mismatch")]
    BadSignature,
    /// Token lifetime is over.
    #[error("session expired")]
    Expired,
    /// Secret cannot key an HMAC.
    #[error("invalid secret key")]
    InvalidSecret,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    login: String,
    exp: i64,
}

/// Hashes an admin password. The login is trimmed and lowercased so the
/// same account matches however it is typed. The password is trimmed too;
/// every place that stores or checks a hash goes through here.
pub fn hash_password(login: &str, password: &str, secret: &str) -> String {
    let base = format!("{}:{}:{secret}", login.trim().to_lowercase(), password.trim());
    hex::encode(Sha256::digest(base.as_bytes()))
}

/// Issues a session token for `login` valid for `ttl_seconds` from `now`.
///
/// # Errors
///
/// Returns `SessionError::InvalidSecret` if the secret cannot key an HMAC.
pub fn sign_session(
    login: &str,
    secret: &str,
    now: DateTime<Utc>,
    ttl_seconds: u64,
) -> Result<String, SessionError> {
    let ttl = i64::try_from(ttl_seconds).unwrap_or(i64::MAX);
    let claims = Claims { login: login.to_string(), exp: now.timestamp().saturating_add(ttl) };
    let json = serde_json::to_vec(&claims).map_err(|_| SessionError::Malformed)?;
    let payload = URL_SAFE.encode(json);
    let signature = generate_hmac_hex(payload.as_bytes(), secret)?;
    Ok(format!("{payload}.{signature}"))
}

/// Checks a session token and returns the login it was issued for.
///
/// # Errors
///
/// Fails when the token is malformed, forged, or expired at `now`.
pub fn verify_session(token: &str, secret: &str, now: DateTime<Utc>) -> Result<String, SessionError> {
    let (payload, signature) = token.split_once('.').ok_or(SessionError::Malformed)?;

    let expected = generate_hmac_hex(payload.as_bytes(), secret)?;
    if !timing_safe_eq(signature, &expected) {
        return Err(SessionError::BadSignature);
    }

    let json = URL_SAFE.decode(payload).map_err(|_| SessionError::Malformed)?;
    let claims: Claims = serde_json::from_slice(&json).map_err(|_| SessionError::Malformed)?;
    if claims.exp < now.timestamp() {
        return Err(SessionError::Expired);
    }
    Ok(claims.login)
}

/// Generates HMAC-SHA256 signature as hex string.
///
/// # Errors
///
/// Returns `SessionError::InvalidSecret` if the secret key is invalid.
pub fn generate_hmac_hex(payload: &[u8], secret: &str) -> Result<String, SessionError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SessionError::InvalidSecret)?;

    mac.update(payload);
    let result = mac.finalize();
    Ok(hex::encode(result.into_bytes()))
}

/// Constant-time string comparison.
pub fn timing_safe_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (a_byte, b_byte) in a.as_bytes().iter().zip(b.as_bytes()) {
        result |= a_byte ^ b_byte;
    }

    result == 0
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    const SECRET: &str = "test_secret";

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn password_hash_ignores_login_case_and_padding() {
        assert_eq!(hash_password(" Admin ", "pw", SECRET), hash_password("admin", "pw", SECRET));
        assert_ne!(hash_password("admin", "pw", SECRET), hash_password("admin", "pw2", SECRET));
        assert_ne!(hash_password("admin", "pw", SECRET), hash_password("admin", "pw", "other"));
        assert_eq!(hash_password("admin", "pw", SECRET).len(), 64);
    }

    #[test]
    fn password_hash_ignores_password_padding() {
        assert_eq!(hash_password("admin", " pw \n", SECRET), hash_password("admin", "pw", SECRET));
        assert_ne!(hash_password("admin", "p w", SECRET), hash_password("admin", "pw", SECRET));
    }

    #[test]
    fn password_hash_is_plain_sha256_of_the_triple() {
        let expected = hex::encode(Sha256::digest(b"admin:admin:dev-secret"));
        assert_eq!(hash_password("admin", "admin", "dev-secret"), expected);
    }

    #[test]
    fn session_round_trips_until_expiry() {
        let issued = at(1_700_000_000);
        let token = sign_session("olga", SECRET, issued, 3600).unwrap();

        assert_eq!(verify_session(&token, SECRET, issued).unwrap(), "olga");
        assert_eq!(verify_session(&token, SECRET, issued + Duration::seconds(3600)).unwrap(), "olga");
        assert_eq!(
            verify_session(&token, SECRET, issued + Duration::seconds(3601)),
            Err(SessionError::Expired)
        );
    }

    #[test]
    fn session_payload_is_padded_url_safe_json() {
        let token = sign_session("olga", SECRET, at(100), 20).unwrap();
        let (payload, signature) = token.split_once('.').unwrap();

        let json = URL_SAFE.decode(payload).unwrap();
        assert_eq!(json, br#"{"login":"olga","exp":120}"#);
        assert_eq!(signature, generate_hmac_hex(payload.as_bytes(), SECRET).unwrap());
    }

    #[test]
    fn forged_or_garbled_tokens_are_rejected() {
        let now = at(1_700_000_000);
        let token = sign_session("olga", SECRET, now, 60).unwrap();

        assert_eq!(verify_session(&token, "other_secret", now), Err(SessionError::BadSignature));
        assert_eq!(verify_session("no-dot-here", SECRET, now), Err(SessionError::Malformed));

        let (_, signature) = token.split_once('.').unwrap();
        let forged_payload = URL_SAFE.encode(br#"{"login":"owner","exp":9999999999}"#);
        let forged = format!("{forged_payload}.{signature}");
        assert_eq!(verify_session(&forged, SECRET, now), Err(SessionError::BadSignature));
    }

    #[test]
    fn timing_safe_eq_behaviour() {
        assert!(timing_safe_eq("abc", "abc"));
        assert!(!timing_safe_eq("abc", "abd"));
        assert!(!timing_safe_eq("abc", "abcd"));
        assert!(timing_safe_eq("", ""));
    }
}
