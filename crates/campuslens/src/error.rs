//! Error types for campuslens.
//!
//! This module defines the library error used by storage, import and
//! configuration code, and the [`ApiError`] that HTTP handlers convert it into.
//! Backend failures never leak their cause to the client: the cause is logged
//! and the caller sees a fixed message.

use std::path::PathBuf;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// The main error type for campuslens operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    /// No pooled connection became available in time.
    #[error("no database connection after {waited_ms}ms: {source}")]
    PoolTimeout {
        /// How long the caller waited.
        waited_ms: u64,
        /// The pool's error, carrying the last connection failure if any.
        #[source]
        source: r2d2::Error,
    },

    // === Import Errors ===
    /// The CSV source could not be read or parsed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The CSV source has no usable header row.
    #[error("CSV file {path} has no header columns")]
    MissingHeader {
        /// Path to the offending file.
        path: PathBuf,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for campuslens operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Static, caller-facing message.
    pub error: &'static str,
}

/// Errors returned by HTTP handlers.
///
/// Each variant carries the fixed message shown to the client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A required parameter is missing or empty.
    #[error("{0}")]
    BadRequest(&'static str),

    /// The requested resource does not exist.
    #[error("{0}")]
    NotFound(&'static str),

    /// The store failed; `source` is logged but never sent.
    #[error("{message}")]
    Backend {
        /// Fixed message for the client.
        message: &'static str,
        /// The underlying failure.
        #[source]
        source: Error,
    },
}

impl ApiError {
    /// Build a mapper that turns a library error into a backend failure.
    ///
    /// Meant for `map_err`: `store.profiles().await.map_err(ApiError::backend("..."))`.
    pub fn backend(message: &'static str) -> impl FnOnce(Error) -> Self {
        move |source| Self::Backend { message, source }
    }

    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Backend { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &'static str {
        match self {
            Self::BadRequest(message) | Self::NotFound(message) => *message,
            Self::Backend { message, .. } => *message,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Backend { message, source } = &self {
            error!(error = %source, "{message}");
        }

        let body = ErrorBody {
            error: self.message(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_error() {
        let err = Error::internal("something went wrong");
        assert_eq!(err.to_string(), "internal error: something went wrong");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_rusqlite_error() {
        let result = rusqlite::Connection::open_with_flags(
            "/nonexistent/path/db.sqlite",
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        );
        if let Err(sqlite_err) = result {
            let err: Error = sqlite_err.into();
            assert!(matches!(err, Error::DatabaseQuery(_)));
        }
    }

    #[test]
    fn test_from_csv_error() {
        let mut rdr = csv::ReaderBuilder::new().from_reader("a,b\n1,2,3\n".as_bytes());
        let csv_err = rdr.records().find_map(std::result::Result::err).unwrap();
        let err: Error = csv_err.into();
        assert!(err.to_string().starts_with("CSV error"));
    }

    #[test]
    fn test_missing_header_display() {
        let err = Error::MissingHeader {
            path: PathBuf::from("/tmp/empty.csv"),
        };
        assert!(err.to_string().contains("/tmp/empty.csv"));
    }

    #[test]
    fn test_config_validation_error_display() {
        let err = Error::ConfigValidation {
            message: "pool_size must be greater than 0".to_string(),
        };
        assert!(err.to_string().contains("pool_size"));
    }

    #[test]
    fn test_api_error_status() {
        assert_eq!(
            ApiError::BadRequest("Missing faceId").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::NotFound("Face image not found").status(),
            StatusCode::NOT_FOUND
        );
        let backend = ApiError::backend("Search failed")(Error::internal("boom"));
        assert_eq!(backend.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_backend_error_hides_cause() {
        let err = ApiError::backend("Failed to fetch data")(Error::internal("no such table: data"));
        assert_eq!(err.to_string(), "Failed to fetch data");
        assert_eq!(err.message(), "Failed to fetch data");
    }

    #[test]
    fn test_api_error_into_response_status() {
        let response = ApiError::NotFound("Face image not found").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
