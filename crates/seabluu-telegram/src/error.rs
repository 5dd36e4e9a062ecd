//! Error types for Telegram Bot API calls.
//!
//! Failures are categorized so the bot can tell a user who blocked it apart
//! from a flood limit or a network problem, and report each with a short
//! label in admin reminder reports.

use thiserror::Error;

/// Result type alias for Telegram operations.
pub type Result<T> = std::result::Result<T, TelegramError>;

/// Telegram Bot API call failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TelegramError {
    /// Connection-level failure.
    #[error("network error: {message}")]
    Network {
        /// Underlying error message
        message: String,
    },

    /// Request exceeded the client timeout.
    #[error("request timeout after {timeout_seconds}s")]
    Timeout {
        /// Configured timeout
        timeout_seconds: u64,
    },

    /// Telegram answered `ok: false`.
    #[error("telegram api error {error_code}: {description}")]
    Api {
        /// Telegram error code, usually the HTTP status
        error_code: i64,
        /// Human readable description from Telegram
        description: String,
    },

    /// Flood control; retry after the given delay.
    #[error("rate limited: retry after {retry_after_seconds}s")]
    RateLimited {
        /// Seconds to wait
        retry_after_seconds: u64,
    },

    /// Client could not be built.
    #[error("invalid client configuration: {message}")]
    Configuration {
        /// Configuration error message
        message: String,
    },

    /// Response body was not the expected JSON.
    #[error("failed to decode telegram response: {message}")]
    Decode {
        /// Decoder error message
        message: String,
    },
}

impl TelegramError {
    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network { message: message.into() }
    }

    /// Creates an API error.
    pub fn api(error_code: i64, description: impl Into<String>) -> Self {
        Self::Api { error_code, description: description.into() }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// Creates a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode { message: message.into() }
    }

    /// Short Russian label for delivery reports.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Api { error_code, description } => {
                let description = description.to_lowercase();
                if *error_code == 403
                    || description.contains("blocked")
                    || description.contains("forbidden")
                {
                    "бот заблокирован"
                } else if description.contains("not found") {
                    "нет chat_id"
                } else if *error_code == 400 {
                    "bad request"
                } else {
                    "ошибка"
                }
            },
            Self::RateLimited { .. } => "rate limit",
            Self::Timeout { .. } => "timeout",
            Self::Network { .. } | Self::Configuration { .. } | Self::Decode { .. } => "ошибка",
        }
    }

    /// Whether the error is Telegram refusing to edit a message to identical
    /// content, which callers treat as success.
    pub fn is_not_modified(&self) -> bool {
        matches!(self, Self::Api { description, .. } if description.contains("message is not modified"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasons_follow_error_kind() {
        assert_eq!(TelegramError::api(403, "Forbidden: bot was blocked by the user").reason(), "бот заблокирован");
        assert_eq!(TelegramError::api(400, "Bad Request: chat not found").reason(), "нет chat_id");
        assert_eq!(TelegramError::api(400, "Bad Request: message text is empty").reason(), "bad request");
        assert_eq!(TelegramError::RateLimited { retry_after_seconds: 3 }.reason(), "rate limit");
        assert_eq!(TelegramError::Timeout { timeout_seconds: 30 }.reason(), "timeout");
        assert_eq!(TelegramError::network("reset").reason(), "ошибка");
        assert_eq!(TelegramError::api(500, "Internal").reason(), "ошибка");
    }

    #[test]
    fn not_modified_is_detected() {
        let err = TelegramError::api(
            400,
            "Bad Request: message is not modified: specified new message content and reply markup are exactly the same",
        );
        assert!(err.is_not_modified());
        assert!(!TelegramError::api(400, "Bad Request").is_not_modified());
    }

    #[test]
    fn display_format() {
        assert_eq!(
            TelegramError::RateLimited { retry_after_seconds: 5 }.to_string(),
            "rate limited: retry after 5s"
        );
    }
}
