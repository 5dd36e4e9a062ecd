//! `/health`, `/ready` and `/live`.
//!
//! The bot has a single dependency worth reporting: PostgreSQL. `/health`
//! and `/ready` run `SELECT 1` through the store; `/live` answers without
//! touching it.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use seabluu_core::{BotStore, Clock};
use serde::Serialize;
use tracing::{debug, error, instrument};

use crate::state::AppState;

/// Body of `/health` and `/ready`.
#[derive(Debug, Serialize)]
pub struct HealthReport {
    /// `healthy` while the database answers
    pub status: Health,
    /// When the check ran
    pub timestamp: DateTime<Utc>,
    /// Per-dependency results
    pub checks: Checks,
    /// Crate version
    pub version: String,
}

/// Overall verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    /// Database reachable
    Healthy,
    /// Database down
    Unhealthy,
}

/// Dependency checks, keyed by name in the JSON body.
#[derive(Debug, Serialize)]
pub struct Checks {
    /// PostgreSQL
    pub database: DatabaseCheck,
}

/// Outcome of the `SELECT 1` round trip.
#[derive(Debug, Serialize)]
pub struct DatabaseCheck {
    /// `up` or `down`
    pub status: DatabaseStatus,
    /// Store error, when down
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Round trip time
    pub response_time_ms: u64,
}

/// Database reachability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseStatus {
    /// Answered
    Up,
    /// Failed
    Down,
}

/// Runs the database check and times it with `clock`.
pub async fn check_store(store: &dyn BotStore, clock: &dyn Clock) -> HealthReport {
    let timestamp = clock.now_utc();
    let started = clock.now();

    let (status, message) = match store.health_check().await {
        Ok(()) => (DatabaseStatus::Up, None),
        Err(e) => {
            error!(error = %e, "database check failed");
            (DatabaseStatus::Down, Some(format!("Database connection failed: {e}")))
        },
    };
    let elapsed = clock.now().saturating_duration_since(started);

    HealthReport {
        status: if status == DatabaseStatus::Up { Health::Healthy } else { Health::Unhealthy },
        timestamp,
        checks: Checks {
            database: DatabaseCheck {
                status,
                message,
                response_time_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            },
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
    }
}

/// 200 while the database answers, 503 otherwise.
#[instrument(name = "health_check", skip_all)]
pub async fn health_check(State(state): State<AppState>) -> Response {
    let report = check_store(state.store.as_ref(), state.clock.as_ref()).await;
    debug!(status = ?report.status, "health checked");

    let code = match report.status {
        Health::Healthy => StatusCode::OK,
        Health::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (code, Json(report)).into_response()
}

/// Same answer as `/health`.
#[instrument(name = "readiness_check", skip_all)]
pub async fn readiness_check(state: State<AppState>) -> Response {
    health_check(state).await
}

/// Always 200; the process is up if it can answer.
#[instrument(name = "liveness_check", skip_all)]
pub async fn liveness_check(State(state): State<AppState>) -> Response {
    let body = serde_json::json!({
        "status": "alive",
        "timestamp": state.clock.now_utc(),
        "service": "seabluu"
    });

    (StatusCode::OK, Json(body)).into_response()
}
