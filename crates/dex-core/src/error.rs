//! # AppError
//!
//! Centralized error handling for the Animedex core.
//! Each variant carries a stable programmatic code; transports decide the
//! status code and the user-facing wording.

use crate::traits::GatewayError;
use serde::Serialize;
use thiserror::Error;

/// Which request argument was malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Argument {
    Id,
    Body,
}

/// A single schema violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// The primary error type for all dex-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed identifier or request body
    #[error("invalid {argument:?}: {detail}")]
    InvalidArgument { argument: Argument, detail: String },

    /// Caller is neither owner nor admin
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Resource not found (e.g., Entry)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Update payload violates the schema
    #[error("validation failed for {} field(s)", .0.len())]
    ValidationError(Vec<FieldError>),

    /// Gateway failure
    #[error("storage error: {0}")]
    StorageError(String),

    /// Deployment is missing something the operation needs
    #[error("configuration error: {0}")]
    ConfigurationError(String),
}

impl AppError {
    pub fn invalid_id(detail: impl Into<String>) -> Self {
        AppError::InvalidArgument {
            argument: Argument::Id,
            detail: detail.into(),
        }
    }

    pub fn invalid_body(detail: impl Into<String>) -> Self {
        AppError::InvalidArgument {
            argument: Argument::Body,
            detail: detail.into(),
        }
    }

    pub fn entry_not_found(id: impl ToString) -> Self {
        AppError::NotFound("Entry".to_string(), id.to_string())
    }

    /// Translates a gateway failure for the entry `id`.
    ///
    /// Only the explicit not-found signal becomes `NotFound`; everything else
    /// is a `StorageError`.
    pub fn from_gateway(err: GatewayError, id: impl ToString) -> Self {
        match err {
            GatewayError::NotFound => AppError::entry_not_found(id),
            GatewayError::Backend(msg) => AppError::StorageError(msg),
        }
    }

    /// Stable code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidArgument {
                argument: Argument::Id,
                ..
            } => "INVALID_ID",
            AppError::InvalidArgument { .. } => "INVALID_BODY",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(..) => "POST_NOT_FOUND",
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::StorageError(_) => "DATABASE_ERROR",
            AppError::ConfigurationError(_) => "CONFIGURATION_ERROR",
        }
    }
}

/// A specialized Result type for Animedex logic.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_not_found_is_not_a_storage_error() {
        let err = AppError::from_gateway(GatewayError::NotFound, "abc");
        assert_eq!(err.code(), "POST_NOT_FOUND");

        let err = AppError::from_gateway(GatewayError::Backend("timeout".into()), "abc");
        assert_eq!(err.code(), "DATABASE_ERROR");
    }

    #[test]
    fn test_invalid_argument_codes() {
        assert_eq!(AppError::invalid_id("nope").code(), "INVALID_ID");
        assert_eq!(AppError::invalid_body("nope").code(), "INVALID_BODY");
    }
}
