//! SEABLUU HTTP API: the Telegram webhook, health endpoints and the web admin.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
pub mod config;
pub mod crypto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod server;
pub mod state;

pub use config::Config;
pub use crypto::hash_password;
pub use error::{ApiError, ApiResult};
pub use server::{create_router, shutdown_signal, start_server};
pub use state::{AdminSettings, AppState};
