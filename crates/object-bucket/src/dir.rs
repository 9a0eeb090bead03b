//! Directory-backed bucket
//!
//! Keys are laid out as nested paths under the bucket root, one directory
//! per `/`-separated segment, so long keys never turn into one oversized
//! file name. Every path component carries a suffix naming its role:
//!
//! | key            | on disk                      |
//! |----------------|------------------------------|
//! | `a`            | `a.o`                        |
//! | `a/`           | `a.d/.o`                     |
//! | `a/b.txt`      | `a.d/b.txt.o`                |
//! | attributes     | `<same name>.a` next to `.o` |
//!
//! so the object `a` and the marker `a/` never collide. Segments are
//! percent-encoded for `%` and NUL only. Attributes live in a small
//! `field=value` sidecar that is removed again when an object is rewritten
//! without attributes.

use crate::error::{io_error, BucketError, Result};
use crate::{
    partition_keys, validate_key, Listing, Object, ObjectAttributes, ObjectBucket, ObjectMeta,
};
use compio::fs::File;
use compio::io::{AsyncReadAt, AsyncWriteAtExt};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use tracing::trace;

const READ_CHUNK: usize = 64 * 1024;

const DIR_SUFFIX: &str = ".d";
const OBJECT_SUFFIX: &str = ".o";
const ATTRS_SUFFIX: &str = ".a";

const CONTENT_TYPE_FIELD: &str = "content-type";
const CACHE_CONTROL_FIELD: &str = "cache-control";
const METADATA_FIELD_PREFIX: &str = "meta.";

/// Bucket persisted as a tree of files
#[derive(Debug, Clone)]
pub struct DirBucket {
    name: String,
    root: PathBuf,
}

impl DirBucket {
    /// Open (creating if needed) the bucket stored at `root`
    ///
    /// # Errors
    ///
    /// Returns an error if the root directory cannot be created
    pub async fn open(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        compio::fs::create_dir_all(&root)
            .await
            .map_err(|e| io_error("", e))?;
        Ok(Self {
            name: name.into(),
            root,
        })
    }

    /// Directory holding the object tree
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File holding the body of `key`
    #[must_use]
    pub fn object_path(&self, key: &str) -> PathBuf {
        entry_path(&self.root, key, OBJECT_SUFFIX)
    }

    fn attributes_path(&self, key: &str) -> PathBuf {
        entry_path(&self.root, key, ATTRS_SUFFIX)
    }

    async fn read_attributes(&self, key: &str) -> Result<ObjectAttributes> {
        match read_file(&self.attributes_path(key)).await {
            Ok(raw) => parse_attributes(&raw).ok_or_else(|| {
                io_error(
                    key,
                    io::Error::new(ErrorKind::InvalidData, "corrupt attribute sidecar"),
                )
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(ObjectAttributes::default()),
            Err(e) => Err(io_error(key, e)),
        }
    }

    async fn write_attributes(&self, key: &str, attributes: &ObjectAttributes) -> Result<()> {
        let path = self.attributes_path(key);
        if attributes.is_empty() {
            return match compio::fs::remove_file(&path).await {
                Err(e) if e.kind() != ErrorKind::NotFound => Err(io_error(key, e)),
                _ => Ok(()),
            };
        }
        write_file(&path, render_attributes(attributes).into_bytes())
            .await
            .map_err(|e| io_error(key, e))
    }
}

/// Path of `key` below `root`, the last component ending in `suffix`
fn entry_path(root: &Path, key: &str, suffix: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    let name = match key.rsplit_once('/') {
        Some((dirs, name)) => {
            for segment in dirs.split('/') {
                path.push(format!("{}{DIR_SUFFIX}", escape(segment, &['\0'])));
            }
            name
        }
        None => key,
    };
    path.push(format!("{}{suffix}", escape(name, &['\0'])));
    path
}

/// Percent-encode `%` and every `reserved` ASCII character
fn escape(raw: &str, reserved: &[char]) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c == '%' || reserved.contains(&c) {
            escaped.push_str(&format!("%{:02X}", u32::from(c)));
        } else {
            escaped.push(c);
        }
    }
    escaped
}

/// Inverse of [`escape`], `None` for text this bucket did not write
fn unescape(escaped: &str) -> Option<String> {
    let mut raw = String::with_capacity(escaped.len());
    let mut rest = escaped;
    while let Some(pos) = rest.find('%') {
        raw.push_str(&rest[..pos]);
        let hex = rest.get(pos + 1..pos + 3)?;
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let byte = u8::from_str_radix(hex, 16).ok()?;
        if !byte.is_ascii() {
            return None;
        }
        raw.push(char::from(byte));
        rest = &rest[pos + 3..];
    }
    raw.push_str(rest);
    Some(raw)
}

fn render_attributes(attributes: &ObjectAttributes) -> String {
    let mut fields = Vec::new();
    if let Some(content_type) = &attributes.content_type {
        fields.push((CONTENT_TYPE_FIELD.to_string(), content_type));
    }
    if let Some(cache_control) = &attributes.cache_control {
        fields.push((CACHE_CONTROL_FIELD.to_string(), cache_control));
    }
    for (name, value) in &attributes.metadata {
        fields.push((format!("{METADATA_FIELD_PREFIX}{name}"), value));
    }

    let reserved = ['\n', '\r', '='];
    fields
        .into_iter()
        .map(|(field, value)| format!("{}={}\n", escape(&field, &reserved), escape(value, &reserved)))
        .collect()
}

fn parse_attributes(raw: &[u8]) -> Option<ObjectAttributes> {
    let text = std::str::from_utf8(raw).ok()?;
    let mut attributes = ObjectAttributes::default();
    for line in text.lines().filter(|line| !line.is_empty()) {
        let (field, value) = line.split_once('=')?;
        let (field, value) = (unescape(field)?, unescape(value)?);
        match field.as_str() {
            CONTENT_TYPE_FIELD => attributes.content_type = Some(value),
            CACHE_CONTROL_FIELD => attributes.cache_control = Some(value),
            other => {
                let name = other.strip_prefix(METADATA_FIELD_PREFIX)?;
                attributes.metadata.insert(name.to_string(), value);
            }
        }
    }
    Some(attributes)
}

async fn read_file(path: &Path) -> io::Result<Vec<u8>> {
    let file = File::open(path).await?;
    let mut body = Vec::new();
    loop {
        let result = file
            .read_at(Vec::with_capacity(READ_CHUNK), body.len() as u64)
            .await;
        let read = result.0?;
        if read == 0 {
            return Ok(body);
        }
        body.extend_from_slice(&result.1[..read]);
    }
}

async fn write_file(path: &Path, body: Vec<u8>) -> io::Result<()> {
    let mut file = File::create(path).await?;
    if !body.is_empty() {
        file.write_all_at(body, 0).await.0?;
    }
    file.sync_all().await
}

/// Gather every key stored under `dir`, whose keys all start with `key_prefix`
fn collect_keys(dir: &Path, key_prefix: &str, keys: &mut Vec<String>) -> io::Result<()> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    for entry in entries {
        let entry = entry?;
        let file_name = entry.file_name();
        // Stray names are not ours
        let Some(name) = file_name.to_str() else {
            continue;
        };
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            if let Some(segment) = name.strip_suffix(DIR_SUFFIX).and_then(unescape) {
                collect_keys(&entry.path(), &format!("{key_prefix}{segment}/"), keys)?;
            }
        } else if file_type.is_file() {
            if let Some(segment) = name.strip_suffix(OBJECT_SUFFIX).and_then(unescape) {
                keys.push(format!("{key_prefix}{segment}"));
            }
        }
    }
    Ok(())
}

impl ObjectBucket for DirBucket {
    fn name(&self) -> &str {
        &self.name
    }

    async fn head(&self, key: &str) -> Result<Option<ObjectMeta>> {
        validate_key(key)?;
        match compio::fs::metadata(self.object_path(key)).await {
            Ok(metadata) if metadata.is_file() => Ok(Some(ObjectMeta {
                key: key.to_string(),
                size: metadata.len(),
                attributes: self.read_attributes(key).await?,
            })),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(key, e)),
        }
    }

    async fn list(&self, prefix: &str, delimiter: Option<char>) -> Result<Listing> {
        // Only the directory named by the prefix's complete segments can match
        let (start, key_prefix) = match prefix.rsplit_once('/') {
            Some((dirs, _)) => (
                entry_path(&self.root, dirs, DIR_SUFFIX),
                format!("{dirs}/"),
            ),
            None => (self.root.clone(), String::new()),
        };

        let keys = compio::runtime::spawn_blocking(move || -> io::Result<Vec<String>> {
            let mut keys = Vec::new();
            collect_keys(&start, &key_prefix, &mut keys)?;
            Ok(keys)
        })
        .await
        .map_err(|e| BucketError::Task(format!("listing {} panicked: {:?}", self.name, e)))?
        .map_err(|e| io_error(prefix, e))?;

        Ok(partition_keys(keys.iter().map(String::as_str), prefix, delimiter))
    }

    async fn get(&self, key: &str) -> Result<Object> {
        validate_key(key)?;
        let body = read_file(&self.object_path(key)).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                BucketError::NoSuchKey(key.to_string())
            } else {
                io_error(key, e)
            }
        })?;

        Ok(Object {
            meta: ObjectMeta {
                key: key.to_string(),
                size: body.len() as u64,
                attributes: self.read_attributes(key).await?,
            },
            body,
        })
    }

    async fn put(&self, key: &str, body: Vec<u8>, attributes: ObjectAttributes) -> Result<()> {
        validate_key(key)?;
        trace!("dir bucket {}: put {} ({} bytes)", self.name, key, body.len());

        let path = self.object_path(key);
        if let Some(parent) = path.parent() {
            compio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(key, e))?;
        }
        write_file(&path, body).await.map_err(|e| io_error(key, e))?;
        self.write_attributes(key, &attributes).await
    }
}
