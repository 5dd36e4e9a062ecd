//! Error types for the conversation engine.

use seabluu_core::{CoreError, ValidationError};
use seabluu_telegram::TelegramError;
use thiserror::Error;

/// Result type alias for bot operations.
pub type Result<T> = std::result::Result<T, BotError>;

/// Failures while handling one update.
#[derive(Debug, Error)]
pub enum BotError {
    /// Storage failed.
    #[error("store error: {0}")]
    Store(#[from] CoreError),

    /// Telegram rejected or never received a request.
    #[error("telegram error: {0}")]
    Telegram(#[from] TelegramError),

    /// User input failed validation.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}
