//! Error types and result handling for ioc-sweep.

use crate::core::types::IndicatorKind;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our custom Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for ioc-sweep operations.
#[derive(Error, Debug)]
pub enum Error {
    // ===== I/O Errors =====
    #[error("Failed to read file: {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to access directory: {path}")]
    DirectoryAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ===== Configuration Errors =====
    #[error("Failed to load configuration: {0}")]
    ConfigLoad(String),

    #[error("Failed to save configuration: {0}")]
    ConfigSave(String),

    #[error("Invalid configuration value: {field} - {message}")]
    ConfigInvalid { field: String, message: String },

    // ===== Indicator Errors =====
    #[error("No {kind} indicators available: {reason}")]
    IndicatorsUnavailable { kind: IndicatorKind, reason: String },

    #[error("Feed request failed: {url}")]
    FeedRequest {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    // ===== Database Errors =====
    #[error("Database error: {0}")]
    DatabaseSql(#[from] rusqlite::Error),

    #[error("Database operation failed: {0}")]
    Database(String),

    #[error("Failed to initialize database: {0}")]
    DatabaseInit(String),

    #[error("Report not found: {0}")]
    ReportNotFound(String),

    // ===== Scanning Errors =====
    #[error("A scan is already in progress")]
    ScanInProgress,

    #[error("Failed to read connection table: {0}")]
    ConnectionTable(String),

    #[error("Failed to enumerate processes: {0}")]
    ProcessEnumeration(String),

    #[error("Scan worker failed: {0}")]
    Worker(String),

    // ===== Concurrency Errors =====
    #[error("Lock poisoned: {context}")]
    LockPoisoned { context: String },

    // ===== Serialization Errors =====
    #[error("JSON serialization error")]
    JsonSerialize(#[from] serde_json::Error),

    // ===== Generic Errors =====
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Worker(err.to_string())
    }
}

impl Error {
    /// Create a file read error.
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Create a file write error.
    pub fn file_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileWrite {
            path: path.into(),
            source,
        }
    }

    /// Create an error for an indicator kind with neither a feed nor a cache.
    pub fn indicators_unavailable(kind: IndicatorKind, reason: impl Into<String>) -> Self {
        Self::IndicatorsUnavailable {
            kind,
            reason: reason.into(),
        }
    }

    /// Create a feed request error.
    pub fn feed_request(
        url: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::FeedRequest {
            url: url.into(),
            source: Box::new(source),
        }
    }

    /// Create a lock poisoned error.
    pub fn lock_poisoned(context: impl Into<String>) -> Self {
        Self::LockPoisoned {
            context: context.into(),
        }
    }

    /// Check if this error is recoverable (scan can continue).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::FileRead { .. }
                | Error::DirectoryAccess { .. }
                | Error::FeedRequest { .. }
                | Error::ConnectionTable(_)
                | Error::ProcessEnumeration(_)
        )
    }

    /// Get a user-friendly suggestion for how to resolve this error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::IndicatorsUnavailable { .. } => Some(
                "Check network access to the indicator feeds or restore the cached lists in the data directory",
            ),
            Error::ConfigLoad(_) | Error::ConfigInvalid { .. } => {
                Some("Check your configuration file for syntax errors or missing fields")
            }
            Error::DatabaseInit(_) | Error::Database(_) => {
                Some("Try deleting the reports database and letting it be recreated")
            }
            Error::ScanInProgress => Some("Wait for the running scan to finish"),
            Error::ConnectionTable(_) | Error::ProcessEnumeration(_) => {
                Some("Try running with elevated privileges (sudo/administrator)")
            }
            Error::LockPoisoned { .. } => Some("Internal error: restart the application"),
            _ => None,
        }
    }

    /// Get the error category for logging.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::FileRead { .. }
            | Error::FileWrite { .. }
            | Error::DirectoryAccess { .. }
            | Error::Io(_) => ErrorCategory::Io,

            Error::ConfigLoad(_) | Error::ConfigSave(_) | Error::ConfigInvalid { .. } => {
                ErrorCategory::Configuration
            }

            Error::IndicatorsUnavailable { .. } | Error::FeedRequest { .. } => {
                ErrorCategory::Indicators
            }

            Error::DatabaseSql(_)
            | Error::Database(_)
            | Error::DatabaseInit(_)
            | Error::ReportNotFound(_) => ErrorCategory::Database,

            Error::ScanInProgress
            | Error::ConnectionTable(_)
            | Error::ProcessEnumeration(_)
            | Error::Worker(_) => ErrorCategory::Scanning,

            Error::LockPoisoned { .. } => ErrorCategory::Concurrency,

            Error::JsonSerialize(_) => ErrorCategory::Serialization,

            Error::Internal(_) | Error::Other(_) => ErrorCategory::Other,
        }
    }
}

/// Error category for classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Io,
    Configuration,
    Indicators,
    Database,
    Scanning,
    Concurrency,
    Serialization,
    Other,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io => write!(f, "I/O"),
            Self::Configuration => write!(f, "Configuration"),
            Self::Indicators => write!(f, "Indicators"),
            Self::Database => write!(f, "Database"),
            Self::Scanning => write!(f, "Scanning"),
            Self::Concurrency => write!(f, "Concurrency"),
            Self::Serialization => write!(f, "Serialization"),
            Self::Other => write!(f, "Other"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::indicators_unavailable(IndicatorKind::Hashes, "feed down, cache missing");
        assert_eq!(
            err.to_string(),
            "No hash indicators available: feed down, cache missing"
        );
    }

    #[test]
    fn test_recoverable_errors() {
        let err = Error::ProcessEnumeration("/proc unavailable".to_string());
        assert!(err.is_recoverable());

        let err = Error::indicators_unavailable(IndicatorKind::Ips, "gone");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_error_category() {
        assert_eq!(Error::ScanInProgress.category(), ErrorCategory::Scanning);
        assert_eq!(
            Error::indicators_unavailable(IndicatorKind::Processes, "x").category(),
            ErrorCategory::Indicators
        );
        assert!(Error::ScanInProgress.suggestion().is_some());
    }
}
