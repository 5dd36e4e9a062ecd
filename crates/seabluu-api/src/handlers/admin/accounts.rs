//! Admin accounts and avatars.

use std::path::Path;

use axum::{
    body::Bytes,
    extract::{Path as UrlPath, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Extension, Json,
};
use seabluu_core::{AdminAccount, AdminRole};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::{
    crypto::hash_password,
    error::{ApiError, ApiResult},
    middleware::auth::AdminLogin,
    state::AppState,
};

const AVATAR_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

async fn current_admin(state: &AppState, login: &str) -> ApiResult<AdminAccount> {
    state.store.find_admin(login).await?.ok_or(ApiError::Unauthorized)
}

/// Every admin for the owner; the caller alone for anyone else.
pub(super) async fn list(
    State(state): State<AppState>,
    Extension(AdminLogin(login)): Extension<AdminLogin>,
) -> ApiResult<Json<Value>> {
    let me = current_admin(&state, &login).await?;
    let items = match me.role {
        AdminRole::Owner => state.store.list_admins().await?,
        AdminRole::Admin => vec![me],
    };
    Ok(Json(json!({ "items": items })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct CreateAdminRequest {
    login: String,
    password: String,
    avatar: String,
}

/// Creates a regular admin. Owner only.
pub(super) async fn create(
    State(state): State<AppState>,
    Extension(AdminLogin(login)): Extension<AdminLogin>,
    Json(req): Json<CreateAdminRequest>,
) -> ApiResult<Json<Value>> {
    const REFUSED: ApiError = ApiError::Forbidden("not_allowed_or_exists");

    let me = current_admin(&state, &login).await?;
    let new_login = req.login.trim();
    if me.role != AdminRole::Owner || new_login.is_empty() || req.password.trim().is_empty() {
        return Err(REFUSED);
    }

    let hash = hash_password(new_login, &req.password, &state.admin.secret);
    let avatar = Some(req.avatar.trim()).filter(|a| !a.is_empty());
    if !state.store.create_admin(new_login, &hash, AdminRole::Admin, avatar).await? {
        return Err(REFUSED);
    }

    info!(by = %login, login = new_login, "admin created");
    Ok(Json(json!({ "ok": true })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct AvatarRequest {
    login: String,
    avatar: String,
}

/// Sets an avatar URL: one's own, or anyone's for the owner.
pub(super) async fn set_avatar(
    State(state): State<AppState>,
    Extension(AdminLogin(login)): Extension<AdminLogin>,
    Json(req): Json<AvatarRequest>,
) -> ApiResult<Json<Value>> {
    let target = Some(req.login.trim()).filter(|t| !t.is_empty()).unwrap_or(login.as_str());
    if !target.eq_ignore_ascii_case(&login) {
        let me = current_admin(&state, &login).await?;
        if me.role != AdminRole::Owner {
            return Err(ApiError::Forbidden("forbidden"));
        }
    }

    let avatar = req.avatar.trim();
    if avatar.is_empty() {
        return Err(ApiError::BadRequest("empty"));
    }

    let ok = state.store.set_admin_avatar(target, avatar).await?;
    Ok(Json(json!({ "ok": ok })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct UploadQuery {
    filename: String,
}

/// Stores a raw image body and returns its public URL.
pub(super) async fn upload_avatar(
    State(state): State<AppState>,
    Extension(AdminLogin(login)): Extension<AdminLogin>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    if body.is_empty() {
        return Err(ApiError::BadRequest("empty_body"));
    }

    let name = avatar_file_name(&login, &query.filename, state.clock.now_utc().timestamp());
    let dir = &state.admin.media_dir;
    tokio::fs::create_dir_all(dir).await.map_err(ApiError::io("upload_failed"))?;
    tokio::fs::write(dir.join(&name), &body).await.map_err(ApiError::io("upload_failed"))?;

    info!(login = %login, file = %name, bytes = body.len(), "avatar uploaded");
    Ok(Json(json!({ "ok": true, "url": format!("/admin/media/avatars/{name}") })))
}

/// `{safe_login}_{unix}{ext}`; unknown extensions become `.jpg`.
fn avatar_file_name(login: &str, filename: &str, unix: i64) -> String {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .filter(|e| AVATAR_EXTENSIONS.contains(&e.as_str()))
        .unwrap_or_else(|| "jpg".to_string());

    let safe: String =
        login.chars().filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_').collect();
    let safe = safe.trim_matches(|c| c == '-' || c == '_');
    let safe = if safe.is_empty() { "user" } else { safe };

    format!("{safe}_{unix}.{ext}")
}

/// Serves an uploaded avatar.
pub(super) async fn avatar_file(
    State(state): State<AppState>,
    UrlPath(name): UrlPath<String>,
) -> ApiResult<Response> {
    if !is_plain_file_name(&name) {
        debug!(name = %name, "rejected avatar path");
        return Err(ApiError::NotFound);
    }

    let bytes =
        tokio::fs::read(state.admin.media_dir.join(&name)).await.map_err(|_| ApiError::NotFound)?;
    Ok(([(header::CONTENT_TYPE, content_type(&name))], bytes).into_response())
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\'])
        && !name.contains("..")
}

fn content_type(name: &str) -> &'static str {
    let ext = Path::new(name).extension().and_then(|e| e.to_str()).map(str::to_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}
