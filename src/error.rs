use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use miette::Diagnostic;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Main error type for the application
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Environment error: {0}")]
    #[diagnostic(code(evently::environment))]
    Environment(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(evently::config))]
    Config(String),

    #[error("Storage error: {0}")]
    #[diagnostic(code(evently::storage))]
    Storage(String),

    #[error(transparent)]
    #[diagnostic(code(evently::io))]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    #[diagnostic(code(evently::other))]
    Other(String),
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

/// Type alias for Result with our Error type
pub type AppResult<T> = Result<T, Error>;

/// Helper to create environment errors
pub fn env_error(var: &str) -> Error {
    Error::Environment(format!("Missing environment variable: {}", var))
}

/// Helper to create configuration errors
pub fn config_error(message: &str) -> Error {
    Error::Config(message.to_string())
}

/// Helper to create storage errors
pub fn storage_error(message: &str) -> Error {
    Error::Storage(message.to_string())
}

/// Errors returned to API callers.
///
/// Each variant maps to one status code and a `{"error": ...}` body. Upstream
/// and storage details are logged and never sent to the client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthenticated,

    #[error("{0}")]
    InvalidInput(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Not found")]
    NotFound,

    #[error("Upstream failure: {0}")]
    UpstreamFailure(String),

    #[error("Storage failure: {0}")]
    Storage(String),
}

/// Message returned for a missing or empty generation title
pub const TITLE_REQUIRED: &str = "Title is required";

/// Generic message returned when the generation call fails
pub const GENERATION_FAILED: &str = "Failed to generate description";

impl ApiError {
    /// Helper to create input validation errors
    pub fn invalid(message: impl Into<String>) -> Self {
        ApiError::InvalidInput(message.into())
    }

    /// Status code this error is surfaced with
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::UpstreamFailure(_) | ApiError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to show to the caller
    pub fn public_message(&self) -> String {
        match self {
            ApiError::UpstreamFailure(_) => GENERATION_FAILED.to_string(),
            ApiError::Storage(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError::Storage(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidInput(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::InvalidInput(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::InvalidInput(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::UpstreamFailure(detail) => {
                error!("Error in generate-description: {}", detail);
            }
            ApiError::Storage(detail) => {
                error!("Storage error: {}", detail);
            }
            _ => {}
        }

        (self.status(), Json(json!({ "error": self.public_message() }))).into_response()
    }
}
