//! Validated synchronization settings
//!
//! Settings are built once, validated once, and then handed to the
//! orchestrator by reference. There is no process-wide default object.

use crate::error::{Result, SyncError};

/// Default bound on concurrent backend operations
pub const DEFAULT_MAX_IN_FLIGHT: usize = 256;

/// Default stream chunk size in bytes
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Upper bound for `max_in_flight`
const MAX_IN_FLIGHT_LIMIT: usize = 65_536;

/// Upper bound for `chunk_size` (64 MiB)
const MAX_CHUNK_SIZE: usize = 64 * 1024 * 1024;

/// Configuration for one sync engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    bucket: String,
    region: String,
    verbose: bool,
    max_in_flight: usize,
    chunk_size: usize,
}

impl SyncSettings {
    /// Start building settings
    #[must_use]
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::default()
    }

    /// Remote bucket name
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Remote bucket region
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Whether per-node progress lines are reported
    #[must_use]
    pub const fn verbose(&self) -> bool {
        self.verbose
    }

    /// Bound on concurrent backend operations
    #[must_use]
    pub const fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    /// Stream chunk size in bytes
    #[must_use]
    pub const fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

/// Builder for [`SyncSettings`]
#[derive(Debug, Clone, Default)]
pub struct SettingsBuilder {
    bucket: Option<String>,
    region: Option<String>,
    verbose: bool,
    max_in_flight: Option<usize>,
    chunk_size: Option<usize>,
}

impl SettingsBuilder {
    /// Remote bucket name (required)
    #[must_use]
    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    /// Remote bucket region (required)
    #[must_use]
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Report per-node progress lines
    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Bound on concurrent backend operations
    #[must_use]
    pub fn max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = Some(max_in_flight);
        self
    }

    /// Stream chunk size in bytes
    #[must_use]
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    /// Validate and build
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Validation`] if:
    /// - bucket or region is missing or blank
    /// - max in flight is outside 1..=65536
    /// - chunk size is outside 1 byte..=64 MiB
    pub fn build(self) -> Result<SyncSettings> {
        let bucket = required(self.bucket, "bucket")?;
        let region = required(self.region, "region")?;

        let max_in_flight = self.max_in_flight.unwrap_or(DEFAULT_MAX_IN_FLIGHT);
        if max_in_flight == 0 || max_in_flight > MAX_IN_FLIGHT_LIMIT {
            return Err(SyncError::Validation(format!(
                "Max in flight must be between 1 and {MAX_IN_FLIGHT_LIMIT}, got: {max_in_flight}"
            )));
        }

        let chunk_size = self.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE);
        if chunk_size == 0 || chunk_size > MAX_CHUNK_SIZE {
            return Err(SyncError::Validation(format!(
                "Chunk size must be between 1 and {MAX_CHUNK_SIZE} bytes, got: {chunk_size}"
            )));
        }

        Ok(SyncSettings {
            bucket,
            region,
            verbose: self.verbose,
            max_in_flight,
            chunk_size,
        })
    }
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(SyncError::Validation(format!("{field} option is required"))),
    }
}
