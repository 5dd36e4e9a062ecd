//! Error responses of the web admin API.
//!
//! Every failure renders as `{"ok": false, "error": "<code>"}` with a
//! matching status code. Storage errors are logged and reduced to a stable
//! code so database details never reach the browser.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use seabluu_core::CoreError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Result type for admin handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Admin API failures.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No valid session cookie.
    #[error("auth")]
    Unauthorized,
    /// Login or password did not match.
    #[error("Неверные логин или пароль")]
    InvalidCredentials,
    /// Request is missing a field or carries a bad value.
    #[error("{0}")]
    BadRequest(&'static str),
    /// Caller's role does not allow the action.
    #[error("{0}")]
    Forbidden(&'static str),
    /// Requested file does not exist.
    #[error("not_found")]
    NotFound,
    /// Storage failed; the code names the operation.
    #[error("{code}")]
    Storage {
        /// Stable error code shown to the client.
        code: &'static str,
        /// Underlying failure.
        #[source]
        source: CoreError,
    },
    /// Local file I/O failed.
    #[error("{code}")]
    Io {
        /// Stable error code shown to the client.
        code: &'static str,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },
}

impl ApiError {
    /// Maps a storage error to a response with `code`.
    pub fn storage(code: &'static str) -> impl FnOnce(CoreError) -> Self {
        move |source| Self::Storage { code, source }
    }

    /// Maps an I/O error to a response with `code`.
    pub fn io(code: &'static str) -> impl FnOnce(std::io::Error) -> Self {
        move |source| Self::Io { code, source }
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Storage { .. } | Self::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(source: CoreError) -> Self {
        Self::Storage { code: "storage_failed", source }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::Storage { code, source } => error!(code, error = %source, "admin storage failure"),
            Self::Io { code, source } => error!(code, error = %source, "admin file failure"),
            _ => {},
        }
        let body = json!({ "ok": false, "error": self.to_string() });
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn render(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn errors_render_as_ok_false_with_code() {
        let (status, body) = render(ApiError::Unauthorized).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        insta::assert_json_snapshot!(body, @r###"
        {
          "error": "auth",
          "ok": false
        }
        "###);

        let (status, body) = render(ApiError::BadRequest("order_id is required")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "order_id is required");
    }

    #[tokio::test]
    async fn storage_details_stay_hidden() {
        let err = ApiError::storage("update_failed")(CoreError::Database("password=hunter2".into()));
        let (status, body) = render(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "update_failed");
    }
}
