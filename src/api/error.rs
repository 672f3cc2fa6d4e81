//! Error responses for the proxy endpoints.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use super::types::ErrorResponse;

/// A failed request, rendered as `{success: false, error, details?}`.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    /// Caller sent something unusable. 400.
    Validation(&'static str),
    /// The vault API failed, or the body could not be read. 500 with a
    /// generic message and the underlying error as `details`.
    Upstream {
        error: &'static str,
        details: String,
    },
}

impl ApiError {
    pub fn upstream(error: &'static str, cause: impl std::fmt::Display) -> Self {
        ApiError::Upstream {
            error,
            details: cause.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Validation(error) => ErrorResponse {
                success: false,
                error,
                details: None,
            },
            ApiError::Upstream { error, details } => ErrorResponse {
                success: false,
                error,
                details: Some(details),
            },
        };
        (status, Json(body)).into_response()
    }
}
