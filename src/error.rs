//! Typed errors and HTTP mapping.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid identifier for {kind}: '{name}'")]
    InvalidIdentifier { kind: &'static str, name: String },
    #[error("invalid primary key: resource {resource} column {column}")]
    InvalidPrimaryKey { resource: String, column: String },
    #[error("duplicate path segment: {0}")]
    DuplicatePathSegment(String),
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("invalid setting {key}: {message}")]
    Setting { key: &'static str, message: String },
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("route not found: {0}")]
    RouteNotFound(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    /// Storage failure with a caller-facing message; the driver error is logged, not returned.
    #[error("{message}")]
    Storage {
        message: String,
        #[source]
        source: sqlx::Error,
    },
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// Attach a human-readable message to a storage failure. Other variants pass through.
    pub fn storage_context(self, message: impl Into<String>) -> Self {
        match self {
            AppError::Db(source) => AppError::Storage {
                message: message.into(),
                source,
            },
            other => other,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) | AppError::RouteNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Db(_) | AppError::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config_error",
            AppError::NotFound(_) => "not_found",
            AppError::RouteNotFound(_) => "route_not_found",
            AppError::Validation(_) => "validation_error",
            AppError::Db(_) | AppError::Storage { .. } => "database_error",
            AppError::BadRequest(_) => "bad_request",
        }
    }
}

/// Request bodies that fail to extract answer with the same envelope as every other error.
/// Well-formed JSON of the wrong shape is a validation error; everything else is a bad request.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(e) => AppError::Validation(e.body_text()),
            other => AppError::BadRequest(other.body_text()),
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Storage { message, source } => {
                tracing::error!(error = %source, "{}", message);
                message.clone()
            }
            AppError::Db(e) => {
                tracing::error!(error = %e, "database error");
                "database error".to_string()
            }
            AppError::Config(e) => {
                tracing::error!(error = %e, "configuration error");
                self.to_string()
            }
            AppError::RouteNotFound(_) => "Route not found".to_string(),
            _ => self.to_string(),
        };
        let details = match &self {
            AppError::RouteNotFound(path) => Some(serde_json::json!({ "path": path })),
            _ => None,
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code().to_string(),
                message,
                details,
            },
        };
        (status, Json(body)).into_response()
    }
}
