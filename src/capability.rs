//! Storage capability contract
//!
//! Both backends (local disk and the object-store adapter) implement
//! [`Capability`]. The walker, copier and directory ensurer are generic over
//! it and never look at which backend they are talking to.
//!
//! Paths are backend-relative strings. They are deliberately not `PathBuf`s:
//! object-store keys are not filesystem paths, and path remapping is a pure
//! string transform.

use crate::error::Result;
use std::collections::BTreeMap;
use std::io;

/// Snapshot of one node, produced by [`Capability::stat`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    /// Path that was stat'ed
    pub path: String,
    /// Directory (or directory marker) rather than a file
    pub is_directory: bool,
    /// File size when the backend knows it
    pub size: Option<u64>,
}

/// One node handed to a walk visitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitEvent {
    /// Backend-relative path of the node
    pub path: String,
    /// Directory rather than a file
    pub is_directory: bool,
}

impl VisitEvent {
    /// Event for a directory node
    pub fn directory(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_directory: true,
        }
    }

    /// Event for a file node
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_directory: false,
        }
    }
}

/// Backend-specific options for a destination write
///
/// Local disk ignores them; the object store records them on the object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// MIME type of the content
    pub content_type: Option<String>,
    /// Cache-Control value
    pub cache_control: Option<String>,
    /// Free-form metadata
    pub metadata: BTreeMap<String, String>,
}

impl WriteOptions {
    /// Set the content type
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Set the cache-control value
    #[must_use]
    pub fn with_cache_control(mut self, cache_control: impl Into<String>) -> Self {
        self.cache_control = Some(cache_control.into());
        self
    }

    /// Add one metadata entry
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// True when no option is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content_type.is_none() && self.cache_control.is_none() && self.metadata.is_empty()
    }
}

/// Default write-options factory: no options for any path
#[must_use]
pub fn no_write_options(_source_path: &str) -> WriteOptions {
    WriteOptions::default()
}

/// Readable byte stream opened by [`Capability::open_read`]
#[allow(async_fn_in_trait)]
pub trait ByteSource {
    /// Next chunk, `Ok(None)` at end of stream
    ///
    /// # Errors
    ///
    /// Returns the underlying read error
    async fn read_chunk(&mut self) -> io::Result<Option<Vec<u8>>>;
}

/// Writable byte sink opened by [`Capability::open_write`]
///
/// Dropping a sink without calling [`ByteSink::close`] abandons it; whatever
/// was already written may stay behind.
#[allow(async_fn_in_trait)]
pub trait ByteSink {
    /// Append one chunk
    ///
    /// # Errors
    ///
    /// Returns the underlying write error
    async fn write_chunk(&mut self, chunk: Vec<u8>) -> io::Result<()>;

    /// Flush and release the sink
    ///
    /// # Errors
    ///
    /// Returns the error raised while committing the written bytes
    async fn close(self) -> io::Result<()>;
}

/// Filesystem-like storage backend
///
/// Stream-opening failures are reported as [`SyncError::Io`]; everything else
/// uses `NotFound`, `Conflict` or `Backend`.
///
/// [`SyncError::Io`]: crate::error::SyncError::Io
#[allow(async_fn_in_trait)]
pub trait Capability {
    /// Stream type returned by [`Capability::open_read`]
    type Reader: ByteSource;
    /// Sink type returned by [`Capability::open_write`]
    type Writer: ByteSink;

    /// Short backend name used in logs
    fn name(&self) -> &str;

    /// Describe the node at `path`
    ///
    /// # Errors
    ///
    /// `NotFound` when absent, `Backend` for anything else
    async fn stat(&self, path: &str) -> Result<NodeInfo>;

    /// Names of the immediate children of the directory at `path`
    ///
    /// # Errors
    ///
    /// `NotFound` when absent, `Backend` for anything else
    async fn list_children(&self, path: &str) -> Result<Vec<String>>;

    /// Create the directory (marker) at `path` if it is missing
    ///
    /// # Errors
    ///
    /// `Conflict` when a file occupies `path`, `Backend` for anything else
    async fn ensure_directory_marker(&self, path: &str) -> Result<()>;

    /// Open `path` for reading
    ///
    /// # Errors
    ///
    /// `Io` when the source is absent or unreadable
    async fn open_read(&self, path: &str) -> Result<Self::Reader>;

    /// Open `path` for writing, replacing any existing content
    ///
    /// # Errors
    ///
    /// `Io` when the destination cannot be written
    async fn open_write(&self, path: &str, options: &WriteOptions) -> Result<Self::Writer>;
}

/// Path of child `name` under directory `parent`
///
/// A separator is only inserted when `parent` does not already end with one.
#[must_use]
pub fn join_child(parent: &str, name: &str) -> String {
    if parent.ends_with('/') {
        format!("{parent}{name}")
    } else {
        format!("{parent}/{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_child() {
        assert_eq!(join_child("a", "x.txt"), "a/x.txt");
        assert_eq!(join_child("a/", "x.txt"), "a/x.txt");
        assert_eq!(join_child("/", "etc"), "/etc");
    }

    #[test]
    fn test_write_options_builders() {
        let options = WriteOptions::default()
            .with_content_type("text/html")
            .with_cache_control("max-age=60")
            .with_metadata("origin", "dirsync");
        assert!(!options.is_empty());
        assert_eq!(options.metadata.get("origin").map(String::as_str), Some("dirsync"));
        assert!(no_write_options("any/path").is_empty());
    }
}
