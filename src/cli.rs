//! Command-line interface definitions

use crate::capability::WriteOptions;
use crate::config::{SyncSettings, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_IN_FLIGHT};
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Synchronize directory trees between local disk and an object bucket
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Bucket name (required)
    #[arg(long, global = true, env = "DIRSYNC_BUCKET")]
    pub bucket: Option<String>,

    /// Bucket region (required)
    #[arg(long, global = true, env = "DIRSYNC_REGION")]
    pub region: Option<String>,

    /// Directory holding the local bucket emulation, one subdirectory per bucket
    #[arg(long, global = true, env = "DIRSYNC_BUCKET_ROOT", default_value = ".dirsync")]
    pub bucket_root: PathBuf,

    /// Content type recorded on every uploaded object
    ///
    /// Local destinations have nowhere to keep it and ignore it.
    #[arg(long, global = true)]
    pub content_type: Option<String>,

    /// Maximum backend operations in flight at once
    ///
    /// Bounds stats, listings, directory creation and file copies across the
    /// whole tree. Deep or wide trees never start more than this many.
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_IN_FLIGHT)]
    pub max_in_flight: usize,

    /// Stream chunk size in KB
    #[arg(long, global = true, default_value_t = DEFAULT_CHUNK_SIZE / 1024)]
    pub chunk_size_kb: usize,

    /// Show progress information
    #[arg(long, global = true)]
    pub progress: bool,

    /// Verbose output (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Transfer to run
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Copy a local tree to another local path
    Copy {
        /// Source file or directory
        source: String,
        /// Destination path
        destination: String,
    },
    /// Upload a local tree into the bucket
    Upload {
        /// Local source file or directory
        source: String,
        /// Destination key prefix
        destination: String,
    },
    /// Download a tree from the bucket
    Download {
        /// Source key prefix
        source: String,
        /// Local destination path
        destination: String,
    },
}

impl Command {
    /// Source and destination roots
    #[must_use]
    pub fn paths(&self) -> (&str, &str) {
        match self {
            Self::Copy {
                source,
                destination,
            }
            | Self::Upload {
                source,
                destination,
            }
            | Self::Download {
                source,
                destination,
            } => (source.as_str(), destination.as_str()),
        }
    }
}

impl Args {
    /// Validate flag combinations clap cannot express
    ///
    /// # Errors
    ///
    /// Returns an error if `--quiet` is combined with `-v`
    pub fn validate(&self) -> Result<()> {
        if self.quiet && self.verbose > 0 {
            anyhow::bail!("--quiet cannot be combined with --verbose");
        }
        Ok(())
    }

    /// Build validated engine settings
    ///
    /// # Errors
    ///
    /// Returns an error if bucket or region is missing, or a bound is out of range
    pub fn settings(&self) -> Result<SyncSettings> {
        let mut builder = SyncSettings::builder()
            .verbose(self.verbose > 0)
            .max_in_flight(self.max_in_flight)
            .chunk_size(self.chunk_size_kb.saturating_mul(1024));
        if let Some(bucket) = &self.bucket {
            builder = builder.bucket(bucket.as_str());
        }
        if let Some(region) = &self.region {
            builder = builder.region(region.as_str());
        }
        Ok(builder.build()?)
    }

    /// Write options applied to every destination file
    #[must_use]
    pub fn write_options(&self) -> WriteOptions {
        match &self.content_type {
            Some(content_type) => WriteOptions::default().with_content_type(content_type.as_str()),
            None => WriteOptions::default(),
        }
    }
}
