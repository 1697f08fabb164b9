use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "Not Found",
    "message": "Product FG-1042 not found",
    "timestamp": "2026-08-05T10:30:00.000Z"
}))]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Bad Request")
    #[schema(example = "Not Found")]
    pub error: String,
    /// Human-readable error description
    #[schema(example = "Product FG-1042 not found")]
    pub message: String,
    /// ISO 8601 timestamp when the error occurred
    #[schema(example = "2026-08-05T10:30:00.000Z")]
    pub timestamp: String,
}

/// Service-level error taxonomy.
///
/// Structural and input errors (`InvalidFilter`, `InvalidWindow`, `NotFound`)
/// abort the request. `DataUnavailable` means there is no price evidence at
/// all for the requested analysis. `CyclicBom` is raised only when the cycle
/// runs through the analysis root; cycles confined to a sub-branch degrade to
/// per-node `unavailable` markers instead of an error.
#[derive(thiserror::Error, Debug)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid category filter: {0}")]
    InvalidFilter(String),

    #[error("Invalid analysis window: {0} months (expected 3, 6 or 12)")]
    InvalidWindow(u32),

    #[error("No cost data available: {0}")]
    DataUnavailable(String),

    #[error("Cyclic bill of materials: {}", .path.join(" > "))]
    CyclicBom { path: Vec<String> },

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    /// HTTP status the error maps to at the API boundary
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::InvalidFilter(_)
            | ServiceError::InvalidWindow(_)
            | ServiceError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) | ServiceError::DataUnavailable(_) => StatusCode::NOT_FOUND,
            ServiceError::CyclicBom { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::DatabaseError(_)
            | ServiceError::InternalError(_)
            | ServiceError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to surface to the caller
    pub fn response_message(&self) -> String {
        match self {
            // Internal failure details stay in the logs
            ServiceError::DatabaseError(_)
            | ServiceError::InternalError(_)
            | ServiceError::Other(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

/// HTTP-boundary error wrapper
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("Service error: {0}")]
    ServiceError(#[from] ServiceError),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::ServiceError(service_error) => (
                service_error.status_code(),
                service_error.response_message(),
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        };

        let body = ErrorResponse {
            error: status
                .canonical_reason()
                .unwrap_or("Unknown Error")
                .to_string(),
            message,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(body)).into_response()
    }
}
