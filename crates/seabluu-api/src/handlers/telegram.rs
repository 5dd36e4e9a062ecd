//! Telegram webhook endpoint.

use axum::{body::Bytes, extract::State, http::StatusCode};
use seabluu_telegram::Update;
use tracing::{info, instrument, warn};

use crate::state::AppState;

/// Receives one update from Telegram.
///
/// Always answers 200, including for undecodable bodies.
#[instrument(name = "telegram_webhook", skip_all)]
pub async fn telegram_webhook(State(state): State<AppState>, body: Bytes) -> StatusCode {
    let update: Update = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            warn!(error = %e, bytes = body.len(), "undecodable telegram update");
            return StatusCode::OK;
        },
    };

    info!(update_id = update.update_id, kind = update.kind().as_str(), "telegram update");
    state.dispatcher.handle_update(&update).await;

    StatusCode::OK
}
