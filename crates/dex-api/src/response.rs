//! Maps [`AppError`] onto HTTP responses.

use crate::messages::{self, Locale};
use axum::http::{header::ALLOW, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use dex_core::error::{AppError, FieldError};
use serde::Serialize;
use tracing::error;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldError>>,
    #[serde(rename = "allowedMethods", skip_serializing_if = "Option::is_none")]
    pub allowed_methods: Option<&'static [&'static str]>,
}

/// An [`AppError`] paired with the locale its message is rendered in.
#[derive(Debug)]
pub struct ApiError {
    pub error: AppError,
    pub locale: Locale,
}

impl ApiError {
    pub fn new(error: AppError, locale: Locale) -> Self {
        Self { error, locale }
    }
}

pub fn status_for(err: &AppError) -> StatusCode {
    match err {
        AppError::InvalidArgument { .. } | AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
        AppError::Forbidden(_) => StatusCode::FORBIDDEN,
        AppError::NotFound(..) => StatusCode::NOT_FOUND,
        AppError::StorageError(_) | AppError::ConfigurationError(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.error);
        if status.is_server_error() {
            error!(code = self.error.code(), error = %self.error, "request failed");
        }

        let body = ErrorBody {
            code: self.error.code(),
            message: messages::error_message(&self.error, self.locale),
            fields: match self.error {
                AppError::ValidationError(fields) => Some(fields),
                _ => None,
            },
            allowed_methods: None,
        };
        (status, Json(body)).into_response()
    }
}

pub fn method_not_allowed(allowed: &'static [&'static str], locale: Locale) -> Response {
    let body = ErrorBody {
        code: "METHOD_NOT_ALLOWED",
        message: messages::method_not_allowed(locale),
        fields: None,
        allowed_methods: Some(allowed),
    };
    let mut response = (StatusCode::METHOD_NOT_ALLOWED, Json(body)).into_response();
    if let Ok(value) = HeaderValue::from_str(&allowed.join(", ")) {
        response.headers_mut().insert(ALLOW, value);
    }
    response
}
