//! Local filesystem capability
//!
//! Thin adapter from the [`Capability`] contract onto `compio::fs`. Paths are
//! used as given after trailing separators are trimmed, so `"dir/"` and
//! `"dir"` name the same node.

use crate::capability::{ByteSink, ByteSource, Capability, NodeInfo, WriteOptions};
use crate::config::DEFAULT_CHUNK_SIZE;
use crate::error::{Result, SyncError};
use compio::fs::{File, OpenOptions};
use compio::io::{AsyncReadAt, AsyncWriteAtExt};
use std::io::{self, ErrorKind};
use tracing::{debug, trace};

/// Local disk backend
#[derive(Debug, Clone)]
pub struct LocalFs {
    chunk_size: usize,
}

impl Default for LocalFs {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl LocalFs {
    /// Backend reading files in chunks of `chunk_size` bytes
    #[must_use]
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }
}

/// Strip trailing separators, keeping a bare `/` intact
fn trim_path(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() && path.starts_with('/') {
        "/"
    } else {
        trimmed
    }
}

impl Capability for LocalFs {
    type Reader = LocalReader;
    type Writer = LocalWriter;

    fn name(&self) -> &str {
        "local"
    }

    async fn stat(&self, path: &str) -> Result<NodeInfo> {
        let target = trim_path(path);
        let metadata = compio::fs::metadata(target)
            .await
            .map_err(|e| SyncError::from_backend_io("stat", path, &e))?;

        let is_directory = metadata.is_dir();
        Ok(NodeInfo {
            path: path.to_string(),
            is_directory,
            size: (!is_directory).then(|| metadata.len()),
        })
    }

    async fn list_children(&self, path: &str) -> Result<Vec<String>> {
        let target = trim_path(path).to_string();
        let listed = compio::runtime::spawn_blocking(move || -> io::Result<Vec<String>> {
            let mut names = Vec::new();
            for entry in std::fs::read_dir(&target)? {
                let name = entry?.file_name().into_string().map_err(|name| {
                    io::Error::new(
                        ErrorKind::InvalidData,
                        format!("non UTF-8 entry {name:?} in {target}"),
                    )
                })?;
                names.push(name);
            }
            names.sort();
            Ok(names)
        })
        .await
        .map_err(|e| SyncError::Internal(format!("listing {path} panicked: {e:?}")))?;

        listed.map_err(|e| SyncError::from_backend_io("readdir", path, &e))
    }

    async fn ensure_directory_marker(&self, path: &str) -> Result<()> {
        match compio::fs::create_dir(trim_path(path)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                // Lost a race with another creator, or a file is in the way
                let info = self.stat(path).await?;
                if info.is_directory {
                    debug!("mkdir {} raced with another creator", path);
                    Ok(())
                } else {
                    Err(SyncError::Conflict {
                        path: path.to_string(),
                    })
                }
            }
            Err(e) => Err(SyncError::from_backend_io("mkdir", path, &e)),
        }
    }

    async fn open_read(&self, path: &str) -> Result<LocalReader> {
        let file = File::open(trim_path(path))
            .await
            .map_err(|e| SyncError::io(path, e))?;
        Ok(LocalReader {
            file,
            offset: 0,
            chunk_size: self.chunk_size,
        })
    }

    async fn open_write(&self, path: &str, options: &WriteOptions) -> Result<LocalWriter> {
        if !options.is_empty() {
            trace!("Ignoring write options for local file {}", path);
        }
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(trim_path(path))
            .await
            .map_err(|e| SyncError::io(path, e))?;
        Ok(LocalWriter { file, offset: 0 })
    }
}

/// Positional chunked reader over a local file
#[derive(Debug)]
pub struct LocalReader {
    file: File,
    offset: u64,
    chunk_size: usize,
}

impl ByteSource for LocalReader {
    async fn read_chunk(&mut self) -> io::Result<Option<Vec<u8>>> {
        let result = self
            .file
            .read_at(Vec::with_capacity(self.chunk_size), self.offset)
            .await;
        let read = result.0?;
        if read == 0 {
            return Ok(None);
        }
        let mut buffer = result.1;
        buffer.truncate(read);
        self.offset += read as u64;
        Ok(Some(buffer))
    }
}

/// Positional writer over a local file
pub struct LocalWriter {
    file: File,
    offset: u64,
}

impl ByteSink for LocalWriter {
    async fn write_chunk(&mut self, chunk: Vec<u8>) -> io::Result<()> {
        let len = chunk.len() as u64;
        self.file.write_all_at(chunk, self.offset).await.0?;
        self.offset += len;
        Ok(())
    }

    async fn close(self) -> io::Result<()> {
        self.file.sync_all().await
    }
}
