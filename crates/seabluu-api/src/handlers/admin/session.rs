//! Admin page, login and logout.

use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::{
    crypto::{hash_password, sign_session, timing_safe_eq},
    error::{ApiError, ApiResult},
    middleware::auth::{authenticated_login, SESSION_COOKIE},
    state::AppState,
};

const ADMIN_PAGE: &str = include_str!("../../../assets/admin.html");
const LOGIN_PAGE: &str = include_str!("../../../assets/login.html");

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct LoginRequest {
    login: String,
    password: String,
}

/// The admin page, or the login form without a valid session.
pub(super) async fn page(State(state): State<AppState>, headers: HeaderMap) -> Html<&'static str> {
    match authenticated_login(&state, &headers) {
        Some(_) => Html(ADMIN_PAGE),
        None => Html(LOGIN_PAGE),
    }
}

#[instrument(name = "admin_login", skip_all)]
pub(super) async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Response> {
    let login = req.login.trim();
    let password = req.password.trim();

    let account = state.store.find_admin(login).await.map_err(ApiError::storage("login_failed"))?;
    let expected = hash_password(login, password, &state.admin.secret);
    let Some(account) = account.filter(|a| timing_safe_eq(&a.password_hash, &expected)) else {
        warn!(login, "admin login rejected");
        return Err(ApiError::InvalidCredentials);
    };

    let token = sign_session(
        &account.login,
        &state.admin.secret,
        state.clock.now_utc(),
        state.admin.session_ttl_seconds,
    )
    .map_err(|_| ApiError::InvalidCredentials)?;
    let cookie = format!(
        "{SESSION_COOKIE}={token}; Max-Age={}; Path=/admin; HttpOnly; SameSite=Lax",
        state.admin.session_ttl_seconds
    );

    info!(login = %account.login, role = %account.role, "admin logged in");
    Ok(([(header::SET_COOKIE, cookie)], Json(json!({ "ok": true }))).into_response())
}

pub(super) async fn logout() -> Response {
    let cookie = format!("{SESSION_COOKIE}=; Max-Age=0; Path=/admin; HttpOnly; SameSite=Lax");
    ([(header::SET_COOKIE, cookie)], Json(json!({ "ok": true }))).into_response()
}
