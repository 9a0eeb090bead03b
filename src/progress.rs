//! Progress tracking and reporting

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info};

/// Counters and an optional spinner shared by every task of one operation
pub struct ProgressTracker {
    progress_bar: Option<ProgressBar>,
    verbose: bool,
    files_copied: AtomicU64,
    bytes_copied: AtomicU64,
    directories_created: AtomicU64,
    directories_existing: AtomicU64,
}

/// Statistics for one copy, upload or download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStats {
    /// Files written to the destination
    pub files_copied: u64,
    /// Bytes written to the destination
    pub bytes_copied: u64,
    /// Directories (markers) created
    pub directories_created: u64,
    /// Directories that were already in place
    pub directories_existing: u64,
    /// Wall-clock time of the operation
    pub duration: Duration,
}

impl ProgressTracker {
    /// Tracker that reports through logs only
    ///
    /// With `verbose` set, per-node lines are logged at INFO instead of DEBUG.
    pub fn new(verbose: bool) -> Self {
        Self {
            progress_bar: None,
            verbose,
            files_copied: AtomicU64::new(0),
            bytes_copied: AtomicU64::new(0),
            directories_created: AtomicU64::new(0),
            directories_existing: AtomicU64::new(0),
        }
    }

    /// Tracker that also drives a terminal spinner
    pub fn with_spinner(verbose: bool) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(120));

        Self {
            progress_bar: Some(pb),
            ..Self::new(verbose)
        }
    }

    fn report(&self, line: String) {
        if self.verbose {
            info!("{}", line);
        } else {
            debug!("{}", line);
        }
    }

    fn refresh(&self) {
        if let Some(pb) = &self.progress_bar {
            pb.set_message(format!(
                "{} files, {} bytes, {} directories",
                self.files_copied.load(Ordering::Relaxed),
                self.bytes_copied.load(Ordering::Relaxed),
                self.directories_created.load(Ordering::Relaxed)
                    + self.directories_existing.load(Ordering::Relaxed),
            ));
        }
    }

    pub fn directory_created(&self, path: &str) {
        self.directories_created.fetch_add(1, Ordering::Relaxed);
        self.report(format!("Created directory {path} (OK)"));
        self.refresh();
    }

    pub fn directory_exists(&self, path: &str) {
        self.directories_existing.fetch_add(1, Ordering::Relaxed);
        self.report(format!("Directory {path} already exists (OK)"));
        self.refresh();
    }

    pub fn file_copied(&self, path: &str, bytes: u64) {
        self.files_copied.fetch_add(1, Ordering::Relaxed);
        self.bytes_copied.fetch_add(bytes, Ordering::Relaxed);
        self.report(format!("Copied file {path} (OK)"));
        self.refresh();
    }

    pub fn finish(&self) {
        if let Some(pb) = &self.progress_bar {
            pb.finish_with_message("Sync completed");
        }
    }

    /// Snapshot the counters
    pub fn stats(&self, duration: Duration) -> SyncStats {
        SyncStats {
            files_copied: self.files_copied.load(Ordering::Relaxed),
            bytes_copied: self.bytes_copied.load(Ordering::Relaxed),
            directories_created: self.directories_created.load(Ordering::Relaxed),
            directories_existing: self.directories_existing.load(Ordering::Relaxed),
            duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let tracker = ProgressTracker::new(false);
        tracker.directory_created("c/");
        tracker.directory_exists("c/b/");
        tracker.file_copied("c/x.txt", 10);
        tracker.file_copied("c/b/y.txt", 5);
        tracker.finish();

        let stats = tracker.stats(Duration::from_millis(3));
        assert_eq!(stats.files_copied, 2);
        assert_eq!(stats.bytes_copied, 15);
        assert_eq!(stats.directories_created, 1);
        assert_eq!(stats.directories_existing, 1);
        assert_eq!(stats.duration, Duration::from_millis(3));
    }
}
