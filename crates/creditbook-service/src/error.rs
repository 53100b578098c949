//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use creditbook_core::{LedgerError, INSUFFICIENT_CREDITS_MESSAGE};

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request - invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Conflict - resource already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A feature, plan or package the catalog does not know.
    #[error("{message}")]
    UnknownCatalogEntry {
        /// Machine-readable code (`unknown_feature`, `unknown_plan`, `unknown_package`).
        code: &'static str,
        /// Human-readable message.
        message: String,
    },

    /// Insufficient credits.
    #[error("insufficient credits: balance={balance}, required={required}")]
    InsufficientCredits {
        /// Current balance.
        balance: i64,
        /// Required amount.
        required: i64,
    },

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
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

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
                None,
            ),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone(), None),
            Self::UnknownCatalogEntry { code, message } => {
                (StatusCode::BAD_REQUEST, *code, message.clone(), None)
            }
            Self::InsufficientCredits { balance, required } => (
                StatusCode::PAYMENT_REQUIRED,
                "insufficient_credits",
                INSUFFICIENT_CREDITS_MESSAGE.to_string(),
                Some(serde_json::json!({
                    "balance": balance,
                    "required": required
                })),
            ),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::AccountNotFound { .. } => Self::NotFound(err.to_string()),
            LedgerError::AccountExists { .. } => Self::Conflict("Account already exists".into()),
            LedgerError::ReferenceConflict { .. } => Self::Conflict(err.to_string()),
            LedgerError::UnknownFeature { .. } => Self::UnknownCatalogEntry {
                code: "unknown_feature",
                message: err.to_string(),
            },
            LedgerError::UnknownPlan { .. } => Self::UnknownCatalogEntry {
                code: "unknown_plan",
                message: err.to_string(),
            },
            LedgerError::UnknownPackage { .. } => Self::UnknownCatalogEntry {
                code: "unknown_package",
                message: err.to_string(),
            },
            LedgerError::InsufficientCredits { balance, required } => {
                Self::InsufficientCredits { balance, required }
            }
            LedgerError::InvalidAmount(_) | LedgerError::InvalidId(_) => {
                Self::BadRequest(err.to_string())
            }
            LedgerError::Storage(msg) | LedgerError::Configuration(msg) => Self::Internal(msg),
        }
    }
}
