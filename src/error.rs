//! Error types for casescope

use std::time::Duration;
use thiserror::Error;

/// Result type alias for casescope operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for the application
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Operation failed: {0}")]
    Other(String),
}

/// Caller-facing classification of a failed read.
///
/// Separates "the source could not be reached" from "there is no such data",
/// leaving message formatting to whoever presents the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Upstream HTTP failure, timeout or malformed body
    Upstream { status: Option<u16> },
    /// The entity genuinely does not exist
    NotFound,
    /// Unexpected fault (database unreachable, IO, task failure)
    Internal,
}

impl ErrorKind {
    /// Short machine-readable label
    pub fn label(&self) -> &'static str {
        match self {
            ErrorKind::Upstream { .. } => "upstream_error",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Internal => "internal_error",
        }
    }
}

impl Error {
    /// Classify this error for the presentation layer.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Api(ApiError::NotFound(_)) | Error::NotFound(_) => ErrorKind::NotFound,
            Error::Api(api) => ErrorKind::Upstream {
                status: api.status(),
            },
            Error::Json(_) => ErrorKind::Upstream { status: None },
            Error::Config(_) | Error::Database(_) | Error::Io(_) | Error::Other(_) => {
                ErrorKind::Internal
            }
        }
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Other(format!("Background task failed: {}", err))
    }
}

/// Upstream API errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authentication failed. Check the configured API key.")]
    Unauthorized,

    #[error("Access denied. You don't have permission to access this resource.")]
    Forbidden,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded. Retry after {0:?}")]
    RateLimit(Duration),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid API response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// HTTP status associated with this failure, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized => Some(401),
            ApiError::Forbidden => Some(403),
            ApiError::NotFound(_) => Some(404),
            ApiError::RateLimit(_) => Some(429),
            ApiError::BadRequest(_) => Some(400),
            ApiError::ServerError { status, .. } => Some(*status),
            ApiError::Network(_) | ApiError::InvalidResponse(_) => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Network("Request timed out".to_string())
        } else if err.is_connect() {
            ApiError::Network("Failed to connect to API".to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("API key not configured. Set `api_key` in the config file or pass --api-key.")]
    MissingApiKey,

    #[error("No {0} database configured")]
    MissingDatabase(&'static str),
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Database errors (case store and telemetry store)
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Failed to open database {path}: {message}")]
    Open { path: String, message: String },

    #[error("Query failed: {0}")]
    Query(String),
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        DatabaseError::Query(err.to_string())
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(err.into())
    }
}
