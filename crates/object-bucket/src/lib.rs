//! # object-bucket
//!
//! Flat key/value object buckets for compio with S3-like semantics:
//! - keys are `/`-separated strings, but the namespace itself is flat
//! - listing is a prefix scan with an optional delimiter that folds deeper
//!   keys into common prefixes
//! - objects are written whole; a zero-byte object whose key ends in `/` is
//!   the conventional directory marker
//!
//! Two backends are provided: [`MemoryBucket`] keeps objects in process and
//! [`DirBucket`] stores one file per object in a directory tree.
//!
//! ## Example
//!
//! ```rust,no_run
//! use object_bucket::{MemoryBucket, ObjectAttributes, ObjectBucket};
//!
//! # async fn example() -> object_bucket::Result<()> {
//! let bucket = MemoryBucket::new("assets");
//! bucket
//!     .put("site/index.html", b"<html/>".to_vec(), ObjectAttributes::default())
//!     .await?;
//!
//! let listing = bucket.list("site/", Some('/')).await?;
//! assert_eq!(listing.objects, vec!["site/index.html".to_string()]);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod dir;
pub mod error;
pub mod memory;

use std::collections::{BTreeMap, BTreeSet};

pub use dir::DirBucket;
pub use error::{BucketError, Result};
pub use memory::MemoryBucket;

/// Attributes stored alongside an object body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectAttributes {
    /// MIME type of the body
    pub content_type: Option<String>,
    /// Cache-Control header value
    pub cache_control: Option<String>,
    /// User metadata
    pub metadata: BTreeMap<String, String>,
}

impl ObjectAttributes {
    /// True when no attribute is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content_type.is_none() && self.cache_control.is_none() && self.metadata.is_empty()
    }
}

/// Result of a `HEAD` request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    /// Object key
    pub key: String,
    /// Body length in bytes
    pub size: u64,
    /// Stored attributes
    pub attributes: ObjectAttributes,
}

/// A whole object as returned by `GET`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Object {
    /// Object metadata
    pub meta: ObjectMeta,
    /// Object body
    pub body: Vec<u8>,
}

/// Result of a prefix listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    /// Keys directly under the prefix (full keys, sorted)
    pub objects: Vec<String>,
    /// Folded prefixes ending with the delimiter (full prefixes, sorted)
    pub common_prefixes: Vec<String>,
}

impl Listing {
    /// True when neither objects nor prefixes were found
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty() && self.common_prefixes.is_empty()
    }
}

/// Flat object namespace with S3-like operations
///
/// Implementations are used from a single compio runtime thread, so the
/// returned futures are not required to be `Send`.
#[allow(async_fn_in_trait)]
pub trait ObjectBucket {
    /// Bucket name
    fn name(&self) -> &str;

    /// Fetch metadata for `key`, `Ok(None)` when absent
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the backend fails
    async fn head(&self, key: &str) -> Result<Option<ObjectMeta>>;

    /// List keys starting with `prefix`
    ///
    /// With a delimiter, keys containing the delimiter after the prefix are
    /// folded into [`Listing::common_prefixes`].
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails
    async fn list(&self, prefix: &str, delimiter: Option<char>) -> Result<Listing>;

    /// Fetch a whole object
    ///
    /// # Errors
    ///
    /// Returns [`BucketError::NoSuchKey`] when absent
    async fn get(&self, key: &str) -> Result<Object>;

    /// Store a whole object, replacing any previous body
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the backend fails
    async fn put(&self, key: &str, body: Vec<u8>, attributes: ObjectAttributes) -> Result<()>;
}

/// Reject keys that no S3-like store would accept
///
/// # Errors
///
/// Returns [`BucketError::InvalidKey`] for empty keys and keys starting with `/`
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() || key.starts_with('/') {
        return Err(BucketError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Build a [`Listing`] from an arbitrary set of keys
///
/// Shared by the backends so they agree on delimiter folding.
pub fn partition_keys<'a, I>(keys: I, prefix: &str, delimiter: Option<char>) -> Listing
where
    I: IntoIterator<Item = &'a str>,
{
    let mut objects = BTreeSet::new();
    let mut common_prefixes = BTreeSet::new();

    for key in keys {
        let Some(rest) = key.strip_prefix(prefix) else {
            continue;
        };

        match delimiter.and_then(|d| rest.find(d).map(|pos| pos + d.len_utf8())) {
            Some(end) => {
                common_prefixes.insert(format!("{prefix}{}", &rest[..end]));
            }
            None => {
                objects.insert(key.to_string());
            }
        }
    }

    Listing {
        objects: objects.into_iter().collect(),
        common_prefixes: common_prefixes.into_iter().collect(),
    }
}
