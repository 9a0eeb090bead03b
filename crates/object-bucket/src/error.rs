//! Error types for object-bucket operations

use thiserror::Error;

/// Result type for object-bucket operations
pub type Result<T> = std::result::Result<T, BucketError>;

/// Errors surfaced by bucket backends
#[derive(Error, Debug)]
pub enum BucketError {
    /// The requested key does not exist
    #[error("no such key: {0}")]
    NoSuchKey(String),

    /// The key can never be stored
    #[error("invalid key: {0:?}")]
    InvalidKey(String),

    /// Underlying storage failed
    #[error("bucket I/O failed for {key}: {source}")]
    Io {
        /// Key being accessed ("" for bucket-wide operations)
        key: String,
        /// Storage error
        #[source]
        source: std::io::Error,
    },

    /// Background task failed to complete
    #[error("bucket task failed: {0}")]
    Task(String),
}

impl BucketError {
    /// Stable S3-style error code
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoSuchKey(_) => "NoSuchKey",
            Self::InvalidKey(_) => "InvalidKey",
            Self::Io { .. } => "InternalError",
            Self::Task(_) => "ServiceUnavailable",
        }
    }

    /// Check if error means the key is absent
    #[must_use]
    pub fn is_no_such_key(&self) -> bool {
        matches!(self, Self::NoSuchKey(_))
    }
}

/// Helper for wrapping storage errors with the key they concern
pub fn io_error(key: &str, source: std::io::Error) -> BucketError {
    BucketError::Io {
        key: key.to_string(),
        source,
    }
}
