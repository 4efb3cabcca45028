//! Error types for registry operations.
//!
//! This module provides the error hierarchy shared by the storage layer, the
//! event pipeline and the API server, with structured error codes for
//! programmatic handling.

use thiserror::Error;

/// Result type alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Main error type for all registry operations.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Input validation failed.
    #[error("Validation error: {message}")]
    Validation { message: String, code: ErrorCode },

    /// Resource not found.
    #[error("{resource} not found: {id}")]
    NotFound {
        resource: String,
        id: String,
        code: ErrorCode,
    },

    /// A uniqueness constraint was violated.
    #[error("Conflict: {message}")]
    Conflict { message: String, code: ErrorCode },

    /// Database operation failed.
    #[error("Database error: {message}")]
    Database {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Event relay misuse (dispatcher started twice, receiver taken).
    #[error("Relay error: {0}")]
    Relay(String),

    /// HTTP client setup failed.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Validation (VAL_xxx)
    ValInvalidInput,
    ValInvalidUrl,

    // Resources (RES_xxx)
    ResNotFound,
    ResConflict,

    // Database (DB_xxx)
    DbOperationFailed,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValInvalidInput => "VAL_001",
            ErrorCode::ValInvalidUrl => "VAL_002",
            ErrorCode::ResNotFound => "RES_001",
            ErrorCode::ResConflict => "RES_002",
            ErrorCode::DbOperationFailed => "DB_001",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl RegistryError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
        }
    }

    /// Create a validation error for a malformed URL.
    pub fn invalid_url(url: &str) -> Self {
        Self::Validation {
            message: format!("'{}' is not a valid URL", url),
            code: ErrorCode::ValInvalidUrl,
        }
    }

    /// Create a not found error for the given resource kind and id.
    pub fn not_found(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
            code: ErrorCode::ResNotFound,
        }
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
            code: ErrorCode::ResConflict,
        }
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            code: ErrorCode::DbOperationFailed,
            source: None,
        }
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation { code, .. } => *code,
            Self::NotFound { code, .. } => *code,
            Self::Conflict { code, .. } => *code,
            Self::Database { code, .. } => *code,
            _ => ErrorCode::Internal,
        }
    }

    /// Whether this error means the requested resource does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<rusqlite::Error> for RegistryError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(ref ffi, ref msg) = err {
            if ffi.code == rusqlite::ErrorCode::ConstraintViolation
                && ffi.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
            {
                return Self::conflict(msg.clone().unwrap_or_else(|| "duplicate value".to_string()));
            }
        }

        Self::Database {
            message: err.to_string(),
            code: ErrorCode::DbOperationFailed,
            source: Some(Box::new(err)),
        }
    }
}
