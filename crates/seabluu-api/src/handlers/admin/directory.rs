//! Client and address listings.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{error::ApiResult, state::AppState};

const LISTING_LIMIT: i64 = 20;

/// The most recently updated clients.
pub(super) async fn clients(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let (items, _) = state.store.clients_page(0, LISTING_LIMIT, None).await?;
    Ok(Json(json!({ "items": items })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct AddressQuery {
    q: String,
}

/// The latest addresses, optionally for one username.
pub(super) async fn addresses(
    State(state): State<AppState>,
    Query(query): Query<AddressQuery>,
) -> ApiResult<Json<Value>> {
    let username = Some(query.q.trim()).filter(|q| !q.is_empty());
    let items = state.store.recent_addresses(username, LISTING_LIMIT).await?;
    Ok(Json(json!({ "items": items })))
}
