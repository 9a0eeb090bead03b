//! Idempotent directory creation on any capability
//!
//! The ensurer stats the destination first and only creates a marker when
//! nothing is there. Running it twice on the same path is a no-op the second
//! time, and two concurrent callers for one path both succeed because the
//! backends treat an existing directory marker as success.

use crate::capability::Capability;
use crate::error::{Result, SyncError};
use crate::progress::ProgressTracker;
use tracing::trace;

/// What [`ensure_directory`] found or did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryOutcome {
    /// A new directory (marker) was created
    Created,
    /// A directory was already present
    AlreadyExists,
}

/// Directory path with exactly one trailing separator
#[must_use]
pub fn directory_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    format!("{trimmed}/")
}

/// Make sure a directory exists at `path` on `capability`
///
/// # Errors
///
/// - [`SyncError::Conflict`] when a file already occupies `path`
/// - any non-`NotFound` stat error, or a marker creation error, unchanged
pub async fn ensure_directory<C: Capability>(
    path: &str,
    capability: &C,
    tracker: &ProgressTracker,
) -> Result<DirectoryOutcome> {
    let path = directory_path(path);
    trace!("ensure_directory {} on {}", path, capability.name());

    match capability.stat(&path).await {
        Ok(info) if info.is_directory => {
            tracker.directory_exists(&path);
            Ok(DirectoryOutcome::AlreadyExists)
        }
        Ok(_) => Err(SyncError::Conflict { path }),
        Err(e) if e.is_not_found() => {
            capability.ensure_directory_marker(&path).await?;
            tracker.directory_created(&path);
            Ok(DirectoryOutcome::Created)
        }
        Err(e) => Err(e),
    }
}
