use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// The HTTP-facing error type for clubdues handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// Standard error response body for API errors.
#[derive(Serialize)]
pub struct ErrorResponse {
    error: String,
    error_id: String,
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        Self::ServiceUnavailable(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) | Self::Anyhow(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Returns a safe error message suitable for client responses.
    ///
    /// Client errors (4xx) expose their message; server errors (5xx)
    /// return a generic message so internal details are never disclosed.
    /// The full error is logged server-side either way.
    fn safe_message(&self) -> String {
        match self {
            Self::NotFound(msg) => format!("Not found: {}", msg),
            Self::BadRequest(msg) => format!("Bad request: {}", msg),
            Self::Unauthorized(msg) => format!("Unauthorized: {}", msg),
            Self::Forbidden(msg) => format!("Forbidden: {}", msg),
            Self::Conflict(msg) => format!("Conflict: {}", msg),
            Self::Internal(_) | Self::Anyhow(_) => "Internal server error".to_string(),
            Self::ServiceUnavailable(_) => "Service unavailable".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_id = uuid::Uuid::new_v4().to_string();

        tracing::error!(
            status = status.as_u16(),
            error_id = %error_id,
            error = %self,
            "Request failed"
        );

        let body = Json(ErrorResponse {
            error: self.safe_message(),
            error_id,
        });

        (status, body).into_response()
    }
}

/// Result type alias for clubdues handlers and stores.
pub type Result<T> = std::result::Result<T, ApiError>;

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            ApiError::BadRequest(format!("JSON error: {}", err))
        } else {
            ApiError::Internal(format!("JSON serialization error: {}", err))
        }
    }
}

/// Errors produced by the dues workflow managers.
///
/// These carry more context than [`ApiError`] and convert into it for
/// HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum DuesError {
    /// No dues cycle is currently active.
    #[error("No active dues cycle")]
    NoActiveCycle,

    /// The referenced cycle does not exist.
    #[error("Dues cycle not found: {cycle_id}")]
    CycleNotFound {
        /// The cycle ID that was not found.
        cycle_id: String,
    },

    /// The referenced dues record does not exist.
    #[error("Dues record not found: {record_id}")]
    RecordNotFound {
        /// The record ID that was not found.
        record_id: String,
    },

    /// The caller does not hold the required capability.
    #[error("Insufficient permissions: requires {required}")]
    InsufficientPermission {
        /// The required capability.
        required: String,
    },

    /// A field failed validation.
    #[error("Invalid {field}: {reason}")]
    Validation {
        /// The offending field.
        field: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Another approver modified the record first.
    #[error("Dues record for member '{member_id}' was modified concurrently, please retry")]
    ConcurrentModification {
        /// The member whose record was contested.
        member_id: String,
    },

    /// The hosted checkout provider failed.
    #[error("Checkout error during '{operation}': {message}")]
    Checkout {
        /// The operation that failed.
        operation: String,
        /// Provider-supplied message.
        message: String,
    },

    /// Storage error.
    #[error("Storage error: {0}")]
    Storage(#[from] ApiError),
}

impl DuesError {
    /// Create an insufficient permission error.
    pub fn insufficient_permission(required: impl Into<String>) -> Self {
        Self::InsufficientPermission {
            required: required.into(),
        }
    }

    /// Create a validation error.
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a cycle-not-found error.
    pub fn cycle_not_found(cycle_id: impl Into<String>) -> Self {
        Self::CycleNotFound {
            cycle_id: cycle_id.into(),
        }
    }

    /// Create a record-not-found error.
    pub fn record_not_found(record_id: impl Into<String>) -> Self {
        Self::RecordNotFound {
            record_id: record_id.into(),
        }
    }
}

impl From<DuesError> for ApiError {
    fn from(err: DuesError) -> Self {
        if let DuesError::Storage(inner) = err {
            return inner;
        }
        let msg = err.to_string();
        match err {
            DuesError::CycleNotFound { .. } | DuesError::RecordNotFound { .. } => {
                ApiError::NotFound(msg)
            }
            DuesError::InsufficientPermission { .. } => ApiError::Forbidden(msg),
            DuesError::NoActiveCycle | DuesError::Validation { .. } => ApiError::BadRequest(msg),
            DuesError::ConcurrentModification { .. } => ApiError::Conflict(msg),
            DuesError::Checkout { .. } => ApiError::ServiceUnavailable(msg),
            DuesError::Storage(_) => unreachable!(),
        }
    }
}

impl IntoResponse for DuesError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
