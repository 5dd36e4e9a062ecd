//! Cookie session authentication for the web admin.
//!
//! Reads the `adm_session` cookie, verifies its signature and expiry, and
//! injects the admin login for downstream handlers.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::{crypto::verify_session, error::ApiError, state::AppState};

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "adm_session";

/// Login of the authenticated admin, set by [`require_session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminLogin(pub String);

/// Extracts the session token from the `Cookie` headers.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}

/// Login of a valid session in `headers`, if any.
pub fn authenticated_login(state: &AppState, headers: &HeaderMap) -> Option<String> {
    let token = session_token(headers)?;
    match verify_session(&token, &state.admin.secret, state.clock.now_utc()) {
        Ok(login) => Some(login),
        Err(e) => {
            debug!(error = %e, "rejected admin session");
            None
        },
    }
}

/// Axum middleware that admits only requests with a valid admin session.
pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let login = authenticated_login(&state, req.headers()).ok_or(ApiError::Unauthorized)?;

    req.extensions_mut().insert(AdminLogin(login));

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn session_token_found_among_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; adm_session=abc.def; x=1"));
        assert_eq!(session_token(&headers).as_deref(), Some("abc.def"));
    }

    #[test]
    fn session_token_accepts_padded_payloads() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("adm_session=eyJsb2dpbiI6ImEifQ==.ff"));
        assert_eq!(session_token(&headers).as_deref(), Some("eyJsb2dpbiI6ImEifQ==.ff"));
    }

    #[test]
    fn missing_or_empty_cookie_yields_none() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_token(&headers), None);

        headers.insert(header::COOKIE, HeaderValue::from_static("adm_session="));
        assert_eq!(session_token(&headers), None);

        headers.insert(header::COOKIE, HeaderValue::from_static("adm_sessionx=abc"));
        assert_eq!(session_token(&headers), None);
    }
}
