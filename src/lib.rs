//! dirsync: directory tree synchronization over pluggable storage backends
//!
//! A tree is walked on one capability (local disk or an object bucket) and
//! mirrored onto another: directories are ensured before anything below them
//! is copied, files are streamed chunk by chunk, and siblings run
//! concurrently under a global in-flight bound.

#![warn(missing_docs)]

pub mod capability;
pub mod cli;
pub mod config;
pub mod copy;
pub mod directory;
pub mod error;
pub mod limiter;
pub mod local;
pub mod progress;
pub mod remote;
pub mod sync;
pub mod walk;

// Re-export commonly used types
pub use capability::{
    join_child, no_write_options, ByteSink, ByteSource, Capability, NodeInfo, VisitEvent,
    WriteOptions,
};
pub use config::SyncSettings;
pub use copy::copy_file;
pub use directory::{ensure_directory, DirectoryOutcome};
pub use error::{Result, SyncError};
pub use limiter::FanOutLimiter;
pub use local::LocalFs;
pub use progress::{ProgressTracker, SyncStats};
pub use remote::ObjectStoreFs;
pub use sync::{remap_path, DirSync, Direction};
pub use walk::{walk, Visitor};
