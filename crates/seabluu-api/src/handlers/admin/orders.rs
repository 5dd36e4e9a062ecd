//! Order search, creation and status changes from the web admin.

use std::collections::HashSet;

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use seabluu_core::{
    canonical_status,
    parse::{extract_order_id, normalize_username, parse_origin},
    status_by_index, BotStore, NewOrder, Order, STATUSES,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

const DEFAULT_SEARCH_LIMIT: usize = 200;

/// One order in search results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchItem {
    /// Order id
    pub order_id: String,
    /// Current status
    pub status: String,
    /// Client name, if recorded
    pub client_name: Option<String>,
    /// Client phone, if recorded
    pub phone: Option<String>,
    /// Participant usernames
    pub participants: Vec<String>,
    /// Creation time
    pub created_at: Option<DateTime<Utc>>,
    /// Last change
    pub updated_at: Option<DateTime<Utc>>,
}

/// Search response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResponse {
    /// Matching orders
    pub items: Vec<SearchItem>,
    /// Number of items
    pub count: usize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct SearchQuery {
    q: String,
    limit: Option<usize>,
}

/// Recent orders for an empty query, otherwise every order the query
/// names by id, participant username or phone.
#[instrument(name = "admin_search", skip_all)]
pub(super) async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<SearchResponse>> {
    let q = query.q.trim();
    let limit = query.limit.unwrap_or(DEFAULT_SEARCH_LIMIT).clamp(1, DEFAULT_SEARCH_LIMIT);
    let cache_key = format!("{limit}:{}", q.to_lowercase());
    if let Some(hit) = state.search_cache.get(&cache_key).await {
        return Ok(Json(hit));
    }

    let store = state.store.as_ref();
    let mut orders = if q.is_empty() {
        store.recent_orders(i64::try_from(limit).unwrap_or(i64::MAX)).await?
    } else {
        find_orders(store, q).await?
    };
    orders.truncate(limit);

    let mut items = Vec::with_capacity(orders.len());
    for order in orders {
        let participants =
            store.participants(&order.order_id).await?.into_iter().map(|p| p.username).collect();
        items.push(SearchItem {
            order_id: order.order_id,
            status: order.status,
            client_name: order.client_name,
            phone: order.phone,
            participants,
            created_at: order.created_at,
            updated_at: order.updated_at,
        });
    }

    let response = SearchResponse { count: items.len(), items };
    state.search_cache.insert(cache_key, response.clone()).await;
    Ok(Json(response))
}

async fn find_orders(store: &dyn BotStore, q: &str) -> seabluu_core::Result<Vec<Order>> {
    let mut found = Vec::new();

    if let Some(order) = store.find_order(q).await? {
        found.push(order);
    }
    if let Some(order_id) = extract_order_id(q) {
        if let Some(order) = store.find_order(&order_id).await? {
            found.push(order);
        }
    }
    if q.starts_with('@') {
        found.extend(store.orders_by_username(q).await?);
    }
    if q.chars().any(|c| c.is_ascii_digit()) {
        found.extend(store.orders_by_phone(q).await?);
    }

    let mut seen = HashSet::new();
    found.retain(|o| seen.insert(o.order_id.to_uppercase()));
    Ok(found)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct BulkStatusRequest {
    ids: Vec<String>,
    status: String,
}

/// Moves several orders to one status and notifies their subscribers.
#[instrument(name = "admin_bulk_status", skip_all)]
pub(super) async fn bulk_status(
    State(state): State<AppState>,
    Json(req): Json<BulkStatusRequest>,
) -> ApiResult<Json<Value>> {
    let status = canonical_status(&req.status).ok_or(ApiError::BadRequest("unknown_status"))?;

    let mut updated = 0;
    let mut failed = 0;
    for order_id in req.ids.iter().map(|id| id.trim()).filter(|id| !id.is_empty()) {
        match apply_status(&state, order_id, status).await {
            Ok(true) => updated += 1,
            Ok(false) => {},
            Err(e) => {
                failed += 1;
                warn!(order_id, error = %e, "bulk status change failed for order");
            },
        }
    }
    state.search_cache.clear().await;

    info!(updated, failed, status, "bulk status change");
    Ok(Json(json!({ "ok": true, "updated": updated, "failed": failed })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct SetStatusRequest {
    order_id: String,
    pick_index: Option<i64>,
    status: String,
}

/// Sets one order's status by list index or by name.
#[instrument(name = "admin_set_status", skip_all)]
pub(super) async fn set_status(
    State(state): State<AppState>,
    Json(req): Json<SetStatusRequest>,
) -> ApiResult<Json<Value>> {
    let order_id = req.order_id.trim();
    if order_id.is_empty() {
        return Err(ApiError::BadRequest("order_id is required"));
    }

    let status = resolve_status(req.pick_index, &req.status)?;
    let ok = apply_status(&state, order_id, status).await?;
    state.search_cache.clear().await;

    Ok(Json(json!({ "ok": ok, "order_id": order_id, "status": status })))
}

fn resolve_status(pick_index: Option<i64>, status: &str) -> ApiResult<&'static str> {
    let picked = pick_index.and_then(|i| usize::try_from(i).ok()).and_then(status_by_index);
    if let Some(status) = picked {
        return Ok(status);
    }
    if status.trim().is_empty() {
        return Err(ApiError::BadRequest("status or pick_index is required"));
    }
    canonical_status(status).ok_or(ApiError::BadRequest("unknown_status"))
}

/// Updates the status, re-arms notifications and tells subscribers.
/// Returns whether the order exists.
async fn apply_status(state: &AppState, order_id: &str, status: &str) -> ApiResult<bool> {
    let store = &state.store;
    if !store.update_order_status(order_id, status).await.map_err(ApiError::storage("update_failed"))? {
        return Ok(false);
    }
    if let Err(e) = store.reset_last_sent(order_id).await {
        warn!(order_id, error = %e, "resetting last sent status failed");
    }
    match state.notifier().notify_subscribers(order_id, status).await {
        Ok(delivered) => info!(order_id, delivered, "status change notified"),
        Err(e) => warn!(order_id, error = %e, "status notification failed"),
    }
    Ok(true)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct CreateOrderRequest {
    order_id: String,
    origin: String,
    status: String,
    clients: String,
    note: String,
}

/// Creates or overwrites an order and records its participants.
#[instrument(name = "admin_create_order", skip_all)]
pub(super) async fn create_order(
    State(state): State<AppState>,
    Json(req): Json<CreateOrderRequest>,
) -> ApiResult<Json<Value>> {
    let raw_id = req.order_id.trim();
    if raw_id.is_empty() || req.origin.trim().is_empty() {
        return Err(ApiError::BadRequest("order_id and origin are required"));
    }
    let origin = parse_origin(&req.origin).map_err(|_| ApiError::BadRequest("origin must be CN or KR"))?;

    let upper = raw_id.to_uppercase();
    let order_id = if upper.starts_with("CN-") || upper.starts_with("KR-") {
        upper
    } else {
        format!("{}-{}", origin.code(), upper.trim_start_matches([' ', '-']))
    };

    let status = if req.status.trim().is_empty() {
        STATUSES[0]
    } else {
        canonical_status(&req.status).ok_or(ApiError::BadRequest("unknown_status"))?
    };
    let note = Some(req.note.trim().to_string()).filter(|n| !n.is_empty());
    let usernames: Vec<String> = req
        .clients
        .split(',')
        .map(normalize_username)
        .filter(|u| !u.is_empty())
        .collect();

    let store = &state.store;
    store
        .upsert_order(&NewOrder {
            order_id: order_id.clone(),
            origin: Some(origin.code().to_string()),
            country: Some(origin.code().to_string()),
            status: status.to_string(),
            note,
            ..NewOrder::default()
        })
        .await
        .map_err(ApiError::storage("create_failed"))?;
    if !usernames.is_empty() {
        store.ensure_participants(&order_id, &usernames).await.map_err(ApiError::storage("create_failed"))?;
    }
    state.search_cache.clear().await;

    info!(order_id, participants = usernames.len(), "order created from web admin");
    Ok(Json(json!({ "ok": true, "order_id": order_id })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_resolution_prefers_index() {
        assert_eq!(resolve_status(Some(3), "").unwrap(), STATUSES[3]);
        assert_eq!(resolve_status(Some(99), STATUSES[1]).unwrap(), STATUSES[1]);
        assert_eq!(resolve_status(None, &STATUSES[2].to_uppercase()).unwrap(), STATUSES[2]);
    }

    #[test]
    fn status_resolution_rejects_missing_and_unknown() {
        assert!(matches!(
            resolve_status(None, " "),
            Err(ApiError::BadRequest("status or pick_index is required"))
        ));
        assert!(matches!(resolve_status(Some(-1), "lost"), Err(ApiError::BadRequest("unknown_status"))));
    }
}
