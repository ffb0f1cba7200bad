//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No session token was supplied.
    #[error("authentication required")]
    AuthenticationRequired,

    /// Session token signature or structure did not verify.
    #[error("invalid token signature")]
    InvalidSignature,

    /// Session token has expired.
    #[error("session expired")]
    Expired,

    /// Session token scope is not `admin`.
    #[error("invalid token scope")]
    InvalidScope,

    /// Missing or mismatched CSRF token on a mutating request.
    #[error("csrf validation failed")]
    CsrfValidationFailed,

    /// Webhook payload failed signature verification.
    #[error("webhook signature invalid: {0}")]
    WebhookSignatureInvalid(String),

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request - invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Durable store is configured but unreachable. Surfaced on the
    /// interactive admin path so the operator knows the write did not
    /// persist; the webhook path degrades to dry-run instead.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON error response body for admin-facing endpoints.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

/// Minimal body for the webhook endpoint, aimed at operator debugging.
#[derive(Debug, Serialize)]
struct WebhookErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // The webhook endpoint returns a flat error string; the provider
        // only cares about the non-2xx status, the message is for logs.
        if let Self::WebhookSignatureInvalid(msg) = &self {
            let body = WebhookErrorResponse {
                error: format!("webhook signature invalid: {msg}"),
            };
            return (StatusCode::BAD_REQUEST, Json(body)).into_response();
        }

        let (status, code, message) = match &self {
            Self::AuthenticationRequired => (
                StatusCode::UNAUTHORIZED,
                "authentication_required",
                self.to_string(),
            ),
            Self::InvalidSignature => (
                StatusCode::UNAUTHORIZED,
                "invalid_signature",
                self.to_string(),
            ),
            Self::Expired => (StatusCode::UNAUTHORIZED, "expired", self.to_string()),
            Self::InvalidScope => (StatusCode::UNAUTHORIZED, "invalid_scope", self.to_string()),
            Self::CsrfValidationFailed => (
                StatusCode::FORBIDDEN,
                "csrf_validation_failed",
                self.to_string(),
            ),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            Self::StoreUnavailable(msg) => {
                tracing::warn!(error = %msg, "Store unavailable on admin path");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "store_unavailable",
                    "durable store unavailable; change was not persisted".to_string(),
                )
            }
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
            Self::WebhookSignatureInvalid(_) => unreachable!("handled above"),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<backlist_store::StoreError> for ApiError {
    fn from(err: backlist_store::StoreError) -> Self {
        match err {
            backlist_store::StoreError::NotFound { order_id } => {
                Self::NotFound(format!("order not found: {order_id}"))
            }
            backlist_store::StoreError::Database(msg) => Self::StoreUnavailable(msg),
            backlist_store::StoreError::Serialization(msg) => Self::Internal(msg),
        }
    }
}
