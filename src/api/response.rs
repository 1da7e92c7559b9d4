//! Response envelope and HTTP error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::error::StorageError;
use crate::metrics;

/// One violated validation rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FieldError {
    /// Request field that failed.
    pub field: String,
    /// Human-readable rule description.
    pub message: String,
}

impl FieldError {
    /// Create a field error.
    pub fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

/// Uniform response body: `{ success, message?, data?, errors? }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the request succeeded.
    pub success: bool,
    /// Short status message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Payload on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Violated rules on validation failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

impl<T> ApiResponse<T> {
    /// Success with data only.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            errors: None,
        }
    }

    /// Success with a message and data.
    pub fn ok_with_message(message: &str, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.to_string()),
            data: Some(data),
            errors: None,
        }
    }
}

impl ApiResponse<()> {
    /// Failure with a message.
    pub fn failure(message: &str) -> Self {
        Self {
            success: false,
            message: Some(message.to_string()),
            data: None,
            errors: None,
        }
    }

    /// Failure with a message and per-field errors.
    pub fn failure_with_errors(message: &str, errors: Vec<FieldError>) -> Self {
        Self {
            errors: Some(errors),
            ..Self::failure(message)
        }
    }
}

/// Errors surfaced at the HTTP boundary.
#[derive(Debug, Error)]
pub enum ApiError {
    /// One or more payload fields broke a rule.
    #[error("validation failed: {} error(s)", .0.len())]
    Validation(Vec<FieldError>),

    /// Body was not a JSON object.
    #[error("invalid JSON body: {0}")]
    InvalidBody(String),

    /// `update-dedication` without an id.
    #[error("dedication id is required")]
    MissingId,

    /// Referenced dedication does not exist.
    #[error("dedication not found")]
    DedicationNotFound,

    /// Persistence failed; only `message` reaches the client.
    #[error("{message}: {source}")]
    Storage {
        /// Generic client-facing message.
        message: &'static str,
        /// Underlying failure, logged server-side.
        source: StorageError,
    },

    /// No route matched under `/api`.
    #[error("endpoint not found")]
    RouteNotFound,

    /// A handler panicked.
    #[error("internal server error")]
    Internal,
}

impl ApiError {
    /// Map a storage error to a generic client message.
    pub fn storage(message: &'static str) -> impl FnOnce(StorageError) -> ApiError {
        move |source| ApiError::Storage { message, source }
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::InvalidBody(_) | ApiError::MissingId => {
                StatusCode::BAD_REQUEST
            }
            ApiError::DedicationNotFound | ApiError::RouteNotFound => StatusCode::NOT_FOUND,
            ApiError::Storage { .. } | ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Validation(errors) => {
                ApiResponse::failure_with_errors("Validation failed", errors)
            }
            ApiError::InvalidBody(detail) => {
                warn!(%detail, "Rejected request body");
                ApiResponse::failure_with_errors(
                    "Invalid JSON body",
                    vec![FieldError::new("body", "Request body must be a JSON object")],
                )
            }
            ApiError::MissingId => ApiResponse::failure("Dedication ID is required"),
            ApiError::DedicationNotFound => ApiResponse::failure("Dedication not found"),
            ApiError::Storage { message, source } => {
                error!(error = %source, "{}", message);
                metrics::inc_storage_errors();
                ApiResponse::failure(message)
            }
            ApiError::RouteNotFound => ApiResponse::failure("API endpoint not found"),
            ApiError::Internal => ApiResponse::failure("Internal server error"),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_envelope_omits_empty_fields() {
        let body = serde_json::to_value(ApiResponse::ok(vec![1, 2])).unwrap();
        assert_eq!(body, json!({"success": true, "data": [1, 2]}));
    }

    #[test]
    fn validation_envelope_lists_errors() {
        let body = serde_json::to_value(ApiResponse::failure_with_errors(
            "Validation failed",
            vec![FieldError::new("title", "Title is required")],
        ))
        .unwrap();
        assert_eq!(
            body,
            json!({
                "success": false,
                "message": "Validation failed",
                "errors": [{"field": "title", "message": "Title is required"}]
            })
        );
    }

    #[test]
    fn statuses_follow_error_kind() {
        assert_eq!(ApiError::MissingId.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::DedicationNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::RouteNotFound.status(), StatusCode::NOT_FOUND);
        let storage = ApiError::storage("Error retrieving dedications")(
            StorageError::Unconfigured("x".to_string()),
        );
        assert_eq!(storage.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
