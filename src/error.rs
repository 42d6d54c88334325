//! Error reporting shared by every HTTP surface.
//!
//! DESIGN
//! ======
//! Service errors stay typed inside their own modules. Each one implements
//! [`ErrorCode`] so the route layer can turn it into an [`ApiError`], which
//! renders as `{ code, message, retryable, fields }`. Errors never cross a
//! component boundary other than as this displayed string.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

/// Stable machine-readable classification of an error.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

/// A single failed form field, reported inline next to the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

impl FieldError {
    #[must_use]
    pub const fn new(field: &'static str, message: &'static str) -> Self {
        Self { field, message }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub retryable: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldError>,
}

/// Route-level error: an HTTP status plus the JSON body shown to the user.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, err: &(impl ErrorCode + ?Sized)) -> Self {
        Self {
            status,
            body: ErrorBody {
                code: err.error_code().to_owned(),
                message: err.to_string(),
                retryable: err.retryable(),
                fields: Vec::new(),
            },
        }
    }

    /// Per-field validation failure. No provider call was made.
    #[must_use]
    pub fn validation(fields: Vec<FieldError>) -> Self {
        let message = fields
            .first()
            .map_or("Invalid input", |f| f.message)
            .to_owned();
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            body: ErrorBody { code: "E_VALIDATION".into(), message, retryable: false, fields },
        }
    }

    /// The named vendor integration has no configuration.
    #[must_use]
    pub fn unavailable(feature: &str) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            body: ErrorBody {
                code: "E_NOT_CONFIGURED".into(),
                message: format!("{feature} not configured"),
                retryable: false,
                fields: Vec::new(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
