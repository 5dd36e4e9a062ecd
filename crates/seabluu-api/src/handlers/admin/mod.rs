//! Cookie-authenticated web admin.
//!
//! Routes fall in two groups. The page, login, logout and avatar files are
//! public. Everything else under `/admin/api` passes
//! [`require_session`](crate::middleware::auth::require_session) first and
//! sees the caller as an [`AdminLogin`](crate::middleware::auth::AdminLogin)
//! extension.

mod accounts;
mod chat;
mod directory;
mod orders;
mod session;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{middleware::auth::require_session, state::AppState};

pub use orders::{SearchItem, SearchResponse};

/// Builds the `/admin` routes.
pub fn router(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/admin/api/search", get(orders::search))
        .route("/admin/api/bulk-status", post(orders::bulk_status))
        .route("/admin/api/status", post(orders::set_status))
        .route("/admin/api/orders", post(orders::create_order))
        .route("/admin/api/clients", get(directory::clients))
        .route("/admin/api/addresses", get(directory::addresses))
        .route("/admin/api/admins", get(accounts::list).post(accounts::create))
        .route("/admin/api/admins/avatar", post(accounts::set_avatar))
        .route("/admin/api/admins/upload_avatar", post(accounts::upload_avatar))
        .route("/admin/api/chat", get(chat::list).post(chat::post))
        .layer(middleware::from_fn_with_state(state, require_session));

    Router::new()
        .route("/admin", get(session::page))
        .route("/admin/", get(session::page))
        .route("/admin/api/login", post(session::login))
        .route("/admin/api/logout", post(session::logout))
        .route("/admin/media/avatars/{name}", get(accounts::avatar_file))
        .merge(protected)
}
