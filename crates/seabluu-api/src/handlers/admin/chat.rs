//! Internal chat between admins.

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    error::{ApiError, ApiResult},
    middleware::auth::AdminLogin,
    state::AppState,
};

const CHAT_HISTORY: i64 = 120;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct ChatQuery {
    since_id: i64,
}

/// Latest messages, or those after `since_id`, oldest first.
pub(super) async fn list(
    State(state): State<AppState>,
    Query(query): Query<ChatQuery>,
) -> ApiResult<Json<Value>> {
    let items = state.store.chat_messages(query.since_id.max(0), CHAT_HISTORY).await?;
    Ok(Json(json!({ "ok": true, "items": items })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct ChatPost {
    text: String,
    #[serde(rename = "ref")]
    reference: String,
}

pub(super) async fn post(
    State(state): State<AppState>,
    Extension(AdminLogin(login)): Extension<AdminLogin>,
    Json(req): Json<ChatPost>,
) -> ApiResult<Json<Value>> {
    let text = req.text.trim();
    if text.is_empty() {
        return Err(ApiError::BadRequest("empty"));
    }
    let reference = Some(req.reference.trim()).filter(|r| !r.is_empty());

    let message = state
        .store
        .send_chat(&login, text, reference)
        .await
        .map_err(ApiError::storage("write_failed"))?;
    Ok(Json(json!({ "ok": true, "id": message.id, "created_at": message.created_at })))
}
