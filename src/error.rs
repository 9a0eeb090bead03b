//! Error handling and types

use thiserror::Error;

/// Synchronization errors
///
/// Each variant is one failure category callers can branch on; nothing in the
/// core retries, so any of these ends the operation that raised it.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Required configuration missing or out of range
    #[error("Invalid configuration: {0}")]
    Validation(String),

    /// Stat target does not exist
    #[error("No such file or directory: {path}")]
    NotFound {
        /// Backend-relative path
        path: String,
    },

    /// Destination holds a node of the wrong kind
    #[error("{path} already exists and is a file not a directory")]
    Conflict {
        /// Backend-relative path
        path: String,
    },

    /// Read or write stream failure while copying a file
    #[error("IO error on {path}: {source}")]
    Io {
        /// Path of the failing stream
        path: String,
        /// Underlying cause
        #[source]
        source: std::io::Error,
    },

    /// Any other backend failure, with the backend's native code
    #[error("{operation}({path}) errored with {code} code: {message}")]
    Backend {
        /// Capability operation that failed
        operation: &'static str,
        /// Backend-relative path
        path: String,
        /// Native error code (`PermissionDenied`, `NoSuchKey`, ...)
        code: String,
        /// Backend message
        message: String,
    },

    /// Internal application error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SyncError {
    /// Wrap a stream error
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Classify a non-stream `std::io::Error` from a backend call
    ///
    /// `NotFound` keeps its own category, everything else becomes
    /// [`SyncError::Backend`] carrying the error kind as its code.
    pub fn from_backend_io(operation: &'static str, path: &str, err: &std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            return Self::NotFound {
                path: path.to_string(),
            };
        }
        Self::Backend {
            operation,
            path: path.to_string(),
            code: format!("{:?}", err.kind()),
            message: err.to_string(),
        }
    }

    /// Check if error means the path is absent
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if error is a node-kind conflict
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Check if error is a configuration failure
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, SyncError>;
