//! Shared helpers for integration tests

#![allow(dead_code)]

use dirsync::{Capability, NodeInfo, Result, SyncSettings, WriteOptions};
use std::cell::RefCell;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use walkdir::WalkDir;

pub struct TestTimeoutGuard {
    cancelled: Arc<AtomicBool>,
}

impl Drop for TestTimeoutGuard {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

/// Abort the test process if the guard is still alive after `duration`
///
/// A deadlocked walk would otherwise hang the whole test binary.
pub fn test_timeout_guard(duration: Duration) -> TestTimeoutGuard {
    let cancelled = Arc::new(AtomicBool::new(false));
    let cancelled_clone = Arc::clone(&cancelled);
    std::thread::spawn(move || {
        std::thread::sleep(duration);
        if !cancelled_clone.load(Ordering::SeqCst) {
            eprintln!("Test timeout exceeded ({}s). Aborting.", duration.as_secs());
            std::process::abort();
        }
    });
    TestTimeoutGuard { cancelled }
}

pub fn settings() -> SyncSettings {
    settings_with_limit(256)
}

pub fn settings_with_limit(max_in_flight: usize) -> SyncSettings {
    SyncSettings::builder()
        .bucket("test-bucket")
        .region("us-east-1")
        .max_in_flight(max_in_flight)
        .chunk_size(7)
        .build()
        .unwrap()
}

/// Create `entries` under `root`; a name ending in `/` is a directory
pub fn write_tree(root: &Path, entries: &[(&str, &str)]) {
    for (rel, content) in entries {
        let path = root.join(rel.trim_end_matches('/'));
        if rel.ends_with('/') {
            std::fs::create_dir_all(&path).unwrap();
        } else {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(&path, content).unwrap();
        }
    }
}

/// Every node under `root` as `(relative path, contents)`, directories with a
/// trailing `/` and no contents
pub fn read_tree(root: &Path) -> Vec<(String, Option<String>)> {
    let mut nodes: Vec<_> = WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .map(|entry| {
            let entry = entry.unwrap();
            let rel = entry
                .path()
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .into_owned();
            if entry.file_type().is_dir() {
                (format!("{rel}/"), None)
            } else {
                (rel, Some(std::fs::read_to_string(entry.path()).unwrap()))
            }
        })
        .collect();
    nodes.sort();
    nodes
}

pub fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Capability wrapper that logs every call in completion order
pub struct RecordingCapability<C> {
    inner: C,
    events: RefCell<Vec<String>>,
}

impl<C> RecordingCapability<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            events: RefCell::new(Vec::new()),
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn events(&self) -> Vec<String> {
        self.events.borrow().clone()
    }

    /// Position of the first event equal to `event`
    pub fn position(&self, event: &str) -> usize {
        self.events
            .borrow()
            .iter()
            .position(|e| e == event)
            .unwrap_or_else(|| panic!("no event {event:?} in {:?}", self.events.borrow()))
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .count()
    }

    fn record(&self, event: String) {
        self.events.borrow_mut().push(event);
    }
}

impl<C: Capability> Capability for RecordingCapability<C> {
    type Reader = C::Reader;
    type Writer = C::Writer;

    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn stat(&self, path: &str) -> Result<NodeInfo> {
        let result = self.inner.stat(path).await;
        self.record(format!("stat {path}"));
        result
    }

    async fn list_children(&self, path: &str) -> Result<Vec<String>> {
        let result = self.inner.list_children(path).await;
        self.record(format!("list {path}"));
        result
    }

    async fn ensure_directory_marker(&self, path: &str) -> Result<()> {
        let result = self.inner.ensure_directory_marker(path).await;
        self.record(format!("mkdir {path}"));
        result
    }

    async fn open_read(&self, path: &str) -> Result<Self::Reader> {
        self.record(format!("read {path}"));
        self.inner.open_read(path).await
    }

    async fn open_write(&self, path: &str, options: &WriteOptions) -> Result<Self::Writer> {
        self.record(format!("write {path}"));
        self.inner.open_write(path, options).await
    }
}
