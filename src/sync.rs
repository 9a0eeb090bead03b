//! Main synchronization logic
//!
//! [`DirSync`] composes the walker, the directory ensurer and the stream
//! copier into the three operations of the tool:
//!
//! | operation  | walked tree | directories ensured on | files copied    |
//! |------------|-------------|------------------------|-----------------|
//! | `copy`     | local       | local                  | local → local   |
//! | `upload`   | local       | remote                 | local → remote  |
//! | `download` | remote      | local                  | remote → local  |
//!
//! All three share one generic transfer routine; nothing below the
//! constructor knows which backend is which.
//!
//! # Path remapping
//!
//! Every visited source path is mapped to its destination by swapping the
//! source root prefix for the destination root:
//! `dest + path[src.len()..]`. This is a plain string transform. Roots with
//! inconsistent trailing separators are passed through as given, so
//! `upload("a/", "c")` writes `a/x.txt` to `cx.txt`; callers are expected to
//! spell both roots the same way.
//!
//! # Usage
//!
//! ```rust,no_run
//! use dirsync::{DirSync, SyncSettings};
//! use object_bucket::MemoryBucket;
//!
//! #[compio::main]
//! async fn main() -> dirsync::Result<()> {
//!     let settings = SyncSettings::builder()
//!         .bucket("assets")
//!         .region("eu-west-1")
//!         .build()?;
//!     let sync = DirSync::with_bucket(settings, MemoryBucket::new("assets"));
//!
//!     let stats = sync.upload("./public", "site").await?;
//!     println!("Uploaded {} files, {} bytes in {:?}",
//!              stats.files_copied, stats.bytes_copied, stats.duration);
//!     Ok(())
//! }
//! ```
//!
//! # Error Handling
//!
//! The first error anywhere in the tree fails the whole operation and
//! drops every transfer still in flight. Nothing is rolled back: the
//! destination may be left partially synchronized.

use crate::capability::{no_write_options, Capability, VisitEvent, WriteOptions};
use crate::config::SyncSettings;
use crate::copy::copy_file;
use crate::directory::ensure_directory;
use crate::error::{Result, SyncError};
use crate::limiter::FanOutLimiter;
use crate::local::LocalFs;
use crate::progress::{ProgressTracker, SyncStats};
use crate::remote::ObjectStoreFs;
use crate::walk::{walk, Visitor};
use object_bucket::{DirBucket, ObjectBucket};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Which way a transfer goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Local to local
    Copy,
    /// Local to remote
    Upload,
    /// Remote to local
    Download,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Copy => "copy",
            Self::Upload => "upload",
            Self::Download => "download",
        };
        f.write_str(name)
    }
}

/// Map a visited source path onto the destination tree
///
/// # Errors
///
/// Returns [`SyncError::Internal`] if `path` is not under `source_root`
pub fn remap_path(source_root: &str, dest_root: &str, path: &str) -> Result<String> {
    let suffix = path.strip_prefix(source_root).ok_or_else(|| {
        SyncError::Internal(format!("{path} is outside the source root {source_root}"))
    })?;
    Ok(format!("{dest_root}{suffix}"))
}

/// Synchronization engine bound to one local disk and one remote capability
pub struct DirSync<R> {
    settings: SyncSettings,
    local: LocalFs,
    remote: R,
    limiter: FanOutLimiter,
    show_progress: bool,
}

impl<R: Capability> DirSync<R> {
    /// Engine over an arbitrary remote capability
    pub fn new(settings: SyncSettings, remote: R) -> Self {
        Self {
            local: LocalFs::new(settings.chunk_size()),
            limiter: FanOutLimiter::new(settings.max_in_flight()),
            settings,
            remote,
            show_progress: false,
        }
    }

    /// Drive a terminal spinner while transferring
    #[must_use]
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Validated settings this engine was built with
    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Object-store side of uploads and downloads
    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Local disk side of every operation
    pub fn local(&self) -> &LocalFs {
        &self.local
    }

    /// Limiter shared by every operation of this engine
    pub fn limiter(&self) -> &FanOutLimiter {
        &self.limiter
    }

    /// Copy a local tree to another local path
    ///
    /// # Errors
    ///
    /// The first error raised anywhere in the tree
    pub async fn copy(&self, source: &str, destination: &str) -> Result<SyncStats> {
        self.copy_with(source, destination, &no_write_options).await
    }

    /// [`DirSync::copy`] with per-file write options
    ///
    /// # Errors
    ///
    /// The first error raised anywhere in the tree
    pub async fn copy_with<F>(
        &self,
        source: &str,
        destination: &str,
        options: &F,
    ) -> Result<SyncStats>
    where
        F: Fn(&str) -> WriteOptions,
    {
        self.transfer(
            Direction::Copy,
            source,
            destination,
            &self.local,
            &self.local,
            options,
        )
        .await
    }

    /// Upload a local tree to the remote
    ///
    /// # Errors
    ///
    /// The first error raised anywhere in the tree
    pub async fn upload(&self, source: &str, destination: &str) -> Result<SyncStats> {
        self.upload_with(source, destination, &no_write_options).await
    }

    /// [`DirSync::upload`] with per-file write options
    ///
    /// # Errors
    ///
    /// The first error raised anywhere in the tree
    pub async fn upload_with<F>(
        &self,
        source: &str,
        destination: &str,
        options: &F,
    ) -> Result<SyncStats>
    where
        F: Fn(&str) -> WriteOptions,
    {
        self.transfer(
            Direction::Upload,
            source,
            destination,
            &self.local,
            &self.remote,
            options,
        )
        .await
    }

    /// Download a remote tree to local disk
    ///
    /// # Errors
    ///
    /// The first error raised anywhere in the tree; `NotFound` when the
    /// remote root is missing, before anything local is touched
    pub async fn download(&self, source: &str, destination: &str) -> Result<SyncStats> {
        self.download_with(source, destination, &no_write_options).await
    }

    /// [`DirSync::download`] with per-file write options
    ///
    /// # Errors
    ///
    /// The first error raised anywhere in the tree
    pub async fn download_with<F>(
        &self,
        source: &str,
        destination: &str,
        options: &F,
    ) -> Result<SyncStats>
    where
        F: Fn(&str) -> WriteOptions,
    {
        self.transfer(
            Direction::Download,
            source,
            destination,
            &self.remote,
            &self.local,
            options,
        )
        .await
    }

    async fn transfer<S, D, F>(
        &self,
        direction: Direction,
        source_root: &str,
        dest_root: &str,
        source: &S,
        dest: &D,
        options: &F,
    ) -> Result<SyncStats>
    where
        S: Capability,
        D: Capability,
        F: Fn(&str) -> WriteOptions,
    {
        let start_time = Instant::now();
        let tracker = if self.show_progress {
            ProgressTracker::with_spinner(self.settings.verbose())
        } else {
            ProgressTracker::new(self.settings.verbose())
        };

        info!(
            "Starting {} from {}:{} to {}:{}",
            direction,
            source.name(),
            source_root,
            dest.name(),
            dest_root
        );

        let visitor = TransferVisitor {
            source_root,
            dest_root,
            source,
            dest,
            options,
            limiter: &self.limiter,
            tracker: &tracker,
        };
        let result = walk(source_root, source, &visitor, &self.limiter).await;
        tracker.finish();
        result?;

        let stats = tracker.stats(start_time.elapsed());
        info!(
            "{} completed: {} files, {} bytes, {} directories created in {:?}",
            direction,
            stats.files_copied,
            stats.bytes_copied,
            stats.directories_created,
            stats.duration
        );
        Ok(stats)
    }
}

impl<B: ObjectBucket> DirSync<ObjectStoreFs<B>> {
    /// Engine whose remote side is `bucket`
    pub fn with_bucket(settings: SyncSettings, bucket: B) -> Self {
        Self::with_shared_bucket(settings, Arc::new(bucket))
    }

    /// Engine over a bucket the caller keeps a handle to
    pub fn with_shared_bucket(settings: SyncSettings, bucket: Arc<B>) -> Self {
        let remote = ObjectStoreFs::from_shared(bucket, settings.region(), settings.chunk_size());
        Self::new(settings, remote)
    }
}

impl DirSync<ObjectStoreFs<DirBucket>> {
    /// Engine over a directory-backed bucket at `<bucket_root>/<bucket>`
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Backend`] if the bucket directory cannot be created
    pub async fn open_dir_bucket(
        settings: SyncSettings,
        bucket_root: impl AsRef<Path>,
    ) -> Result<Self> {
        let root = bucket_root.as_ref().join(settings.bucket());
        let bucket = DirBucket::open(settings.bucket(), &root)
            .await
            .map_err(|e| SyncError::Backend {
                operation: "open_bucket",
                path: root.display().to_string(),
                code: e.code().to_string(),
                message: e.to_string(),
            })?;
        debug!("Opened bucket {} at {}", settings.bucket(), root.display());
        Ok(Self::with_bucket(settings, bucket))
    }
}

/// Visitor that mirrors each node into the destination
struct TransferVisitor<'a, S, D, F> {
    source_root: &'a str,
    dest_root: &'a str,
    source: &'a S,
    dest: &'a D,
    options: &'a F,
    limiter: &'a FanOutLimiter,
    tracker: &'a ProgressTracker,
}

impl<S, D, F> Visitor for TransferVisitor<'_, S, D, F>
where
    S: Capability,
    D: Capability,
    F: Fn(&str) -> WriteOptions,
{
    async fn visit(&self, event: VisitEvent) -> Result<()> {
        let target = remap_path(self.source_root, self.dest_root, &event.path)?;
        let _permit = self.limiter.acquire().await;

        if event.is_directory {
            ensure_directory(&target, self.dest, self.tracker).await?;
        } else {
            let bytes =
                copy_file(&event.path, &target, self.source, self.dest, self.options).await?;
            self.tracker.file_copied(&target, bytes);
        }
        Ok(())
    }
}
