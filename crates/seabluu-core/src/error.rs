//! Error types and result handling for order tracking operations.
//!
//! Storage failures are mapped into `CoreError` so callers never touch sqlx
//! error variants directly. User input failures carry stable codes that the
//! bot and the admin API surface to operators.

use thiserror::Error;

/// Result type alias using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error type for storage operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// Entity not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Constraint violation.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound("requested entity not found".to_string()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                Self::ConstraintViolation(format!("unique constraint violation: {db_err}"))
            },
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                Self::ConstraintViolation(format!("foreign key constraint violation: {db_err}"))
            },
            sqlx::Error::Database(db_err) if db_err.is_check_violation() => {
                Self::ConstraintViolation(format!("check constraint violation: {db_err}"))
            },
            _ => Self::Database(err.to_string()),
        }
    }
}

impl From<ValidationError> for CoreError {
    fn from(err: ValidationError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

/// Input validation failures with stable codes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Text does not contain a recognizable order id (E1001).
    #[error("[E1001] Invalid order id: {input:?}")]
    InvalidOrderId {
        /// The rejected input
        input: String,
    },

    /// Order origin is not one of the supported warehouses (E1002).
    #[error("[E1002] Unsupported origin: {origin:?}, expected CN or KR")]
    UnsupportedOrigin {
        /// The rejected origin
        origin: String,
    },

    /// Status is not in the fixed status list (E1003).
    #[error("[E1003] Unknown status: {status:?}")]
    UnknownStatus {
        /// The rejected status
        status: String,
    },

    /// Phone does not normalize to 11 digits starting with 8 (E1004).
    #[error("[E1004] Invalid phone: {input:?}")]
    InvalidPhone {
        /// The rejected input
        input: String,
    },

    /// Postcode is not 5 or 6 digits (E1005).
    #[error("[E1005] Invalid postcode: {input:?}")]
    InvalidPostcode {
        /// The rejected input
        input: String,
    },

    /// Required input was empty (E1006).
    #[error("[E1006] Empty input: {field}")]
    Empty {
        /// Name of the empty field
        field: &'static str,
    },
}

impl ValidationError {
    /// Returns the error code (E1001-E1006).
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidOrderId { .. } => "E1001",
            Self::UnsupportedOrigin { .. } => "E1002",
            Self::UnknownStatus { .. } => "E1003",
            Self::InvalidPhone { .. } => "E1004",
            Self::InvalidPostcode { .. } => "E1005",
            Self::Empty { .. } => "E1006",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_codes_are_stable() {
        assert_eq!(ValidationError::InvalidOrderId { input: "x".into() }.code(), "E1001");
        assert_eq!(ValidationError::UnsupportedOrigin { origin: "US".into() }.code(), "E1002");
        assert_eq!(ValidationError::UnknownStatus { status: "?".into() }.code(), "E1003");
        assert_eq!(ValidationError::InvalidPhone { input: "1".into() }.code(), "E1004");
        assert_eq!(ValidationError::InvalidPostcode { input: "1".into() }.code(), "E1005");
        assert_eq!(ValidationError::Empty { field: "text" }.code(), "E1006");
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err: CoreError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[test]
    fn validation_error_becomes_invalid_input() {
        let err: CoreError = ValidationError::Empty { field: "order_id" }.into();
        assert!(err.to_string().contains("E1006"));
    }
}
