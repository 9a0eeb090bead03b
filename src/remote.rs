//! Object-store capability
//!
//! Presents a flat [`ObjectBucket`] as a directory tree:
//!
//! - a file is an object whose key does not end in `/`
//! - a directory is either a zero-byte marker object `key/` or any prefix
//!   that still has keys below it
//! - listing a directory is a prefix scan with `/` as delimiter
//! - writes are buffered and committed as one `put` when the sink closes
//!
//! Paths are mapped to keys by dropping leading separators; the empty key is
//! the bucket root and is always a directory.

use crate::capability::{ByteSink, ByteSource, Capability, NodeInfo, WriteOptions};
use crate::config::DEFAULT_CHUNK_SIZE;
use crate::error::{Result, SyncError};
use object_bucket::{BucketError, ObjectAttributes, ObjectBucket};
use std::collections::BTreeSet;
use std::io::{self, ErrorKind};
use std::sync::Arc;
use tracing::trace;

const DELIMITER: char = '/';

/// Capability backed by an object bucket
pub struct ObjectStoreFs<B> {
    bucket: Arc<B>,
    region: String,
    chunk_size: usize,
}

impl<B> Clone for ObjectStoreFs<B> {
    fn clone(&self) -> Self {
        Self {
            bucket: Arc::clone(&self.bucket),
            region: self.region.clone(),
            chunk_size: self.chunk_size,
        }
    }
}

impl<B: ObjectBucket> ObjectStoreFs<B> {
    /// Wrap `bucket`, reading objects back in `DEFAULT_CHUNK_SIZE` chunks
    pub fn new(bucket: B, region: impl Into<String>) -> Self {
        Self::from_shared(Arc::new(bucket), region, DEFAULT_CHUNK_SIZE)
    }

    /// Wrap a bucket the caller keeps a handle to
    pub fn from_shared(bucket: Arc<B>, region: impl Into<String>, chunk_size: usize) -> Self {
        Self {
            bucket,
            region: region.into(),
            chunk_size: chunk_size.max(1),
        }
    }

    /// Underlying bucket
    pub fn bucket(&self) -> &B {
        &self.bucket
    }

    /// Region the bucket lives in
    pub fn region(&self) -> &str {
        &self.region
    }
}

/// Object key for a node path, without the trailing separator
fn object_key(path: &str) -> &str {
    path.trim_start_matches(DELIMITER).trim_end_matches(DELIMITER)
}

/// Listing prefix for the children of `key`
fn child_prefix(key: &str) -> String {
    if key.is_empty() {
        String::new()
    } else {
        format!("{key}{DELIMITER}")
    }
}

fn map_bucket_error(operation: &'static str, path: &str, err: BucketError) -> SyncError {
    if err.is_no_such_key() {
        return SyncError::NotFound {
            path: path.to_string(),
        };
    }
    SyncError::Backend {
        operation,
        path: path.to_string(),
        code: err.code().to_string(),
        message: err.to_string(),
    }
}

fn stream_error(err: BucketError) -> io::Error {
    let kind = if err.is_no_such_key() {
        ErrorKind::NotFound
    } else {
        ErrorKind::Other
    };
    io::Error::new(kind, err)
}

fn attributes_from(options: &WriteOptions) -> ObjectAttributes {
    ObjectAttributes {
        content_type: options.content_type.clone(),
        cache_control: options.cache_control.clone(),
        metadata: options.metadata.clone(),
    }
}

impl<B: ObjectBucket> Capability for ObjectStoreFs<B> {
    type Reader = ObjectReader;
    type Writer = ObjectWriter<B>;

    fn name(&self) -> &str {
        self.bucket.name()
    }

    async fn stat(&self, path: &str) -> Result<NodeInfo> {
        let key = object_key(path);
        if key.is_empty() {
            return Ok(NodeInfo {
                path: path.to_string(),
                is_directory: true,
                size: None,
            });
        }

        if let Some(meta) = self
            .bucket
            .head(key)
            .await
            .map_err(|e| map_bucket_error("stat", path, e))?
        {
            return Ok(NodeInfo {
                path: path.to_string(),
                is_directory: false,
                size: Some(meta.size),
            });
        }

        let prefix = child_prefix(key);
        let marker = self
            .bucket
            .head(&prefix)
            .await
            .map_err(|e| map_bucket_error("stat", path, e))?;
        let is_directory = marker.is_some()
            || !self
                .bucket
                .list(&prefix, Some(DELIMITER))
                .await
                .map_err(|e| map_bucket_error("stat", path, e))?
                .is_empty();

        if is_directory {
            Ok(NodeInfo {
                path: path.to_string(),
                is_directory: true,
                size: None,
            })
        } else {
            Err(SyncError::NotFound {
                path: path.to_string(),
            })
        }
    }

    async fn list_children(&self, path: &str) -> Result<Vec<String>> {
        let prefix = child_prefix(object_key(path));
        let listing = self
            .bucket
            .list(&prefix, Some(DELIMITER))
            .await
            .map_err(|e| map_bucket_error("list", path, e))?;

        // The directory's own marker lists as an empty name
        let names: BTreeSet<String> = listing
            .objects
            .iter()
            .chain(listing.common_prefixes.iter())
            .filter_map(|key| key.strip_prefix(prefix.as_str()))
            .map(|rest| rest.trim_end_matches(DELIMITER))
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
        Ok(names.into_iter().collect())
    }

    async fn ensure_directory_marker(&self, path: &str) -> Result<()> {
        let key = object_key(path);
        if key.is_empty() {
            return Ok(());
        }
        if self
            .bucket
            .head(key)
            .await
            .map_err(|e| map_bucket_error("mkdir", path, e))?
            .is_some()
        {
            return Err(SyncError::Conflict {
                path: path.to_string(),
            });
        }
        self.bucket
            .put(&child_prefix(key), Vec::new(), ObjectAttributes::default())
            .await
            .map_err(|e| map_bucket_error("mkdir", path, e))
    }

    async fn open_read(&self, path: &str) -> Result<ObjectReader> {
        let object = self
            .bucket
            .get(object_key(path))
            .await
            .map_err(|e| SyncError::io(path, stream_error(e)))?;
        Ok(ObjectReader {
            body: object.body,
            position: 0,
            chunk_size: self.chunk_size,
        })
    }

    async fn open_write(&self, path: &str, options: &WriteOptions) -> Result<ObjectWriter<B>> {
        let key = object_key(path);
        if key.is_empty() {
            return Err(SyncError::io(
                path,
                io::Error::new(ErrorKind::InvalidInput, "cannot write to the bucket root"),
            ));
        }
        trace!("Opening object {} in {}", key, self.bucket.name());
        Ok(ObjectWriter {
            bucket: Arc::clone(&self.bucket),
            key: key.to_string(),
            attributes: attributes_from(options),
            body: Vec::new(),
        })
    }
}

/// Chunked view over a fetched object body
#[derive(Debug)]
pub struct ObjectReader {
    body: Vec<u8>,
    position: usize,
    chunk_size: usize,
}

impl ByteSource for ObjectReader {
    async fn read_chunk(&mut self) -> io::Result<Option<Vec<u8>>> {
        if self.position >= self.body.len() {
            return Ok(None);
        }
        let end = (self.position + self.chunk_size).min(self.body.len());
        let chunk = self.body[self.position..end].to_vec();
        self.position = end;
        Ok(Some(chunk))
    }
}

/// Buffers chunks and stores the object on close
pub struct ObjectWriter<B> {
    bucket: Arc<B>,
    key: String,
    attributes: ObjectAttributes,
    body: Vec<u8>,
}

impl<B: ObjectBucket> ByteSink for ObjectWriter<B> {
    async fn write_chunk(&mut self, chunk: Vec<u8>) -> io::Result<()> {
        self.body.extend_from_slice(&chunk);
        Ok(())
    }

    async fn close(self) -> io::Result<()> {
        self.bucket
            .put(&self.key, self.body, self.attributes)
            .await
            .map_err(stream_error)
    }
}
