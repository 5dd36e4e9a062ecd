//! HTTP request handlers.
//!
//! - `health` - `/health`, `/ready` and `/live`
//! - `telegram` - the Bot API webhook
//! - `admin` - the cookie-authenticated web admin

pub mod admin;
pub mod health;
pub mod telegram;

pub use health::{health_check, liveness_check, readiness_check};
pub use telegram::telegram_webhook;
