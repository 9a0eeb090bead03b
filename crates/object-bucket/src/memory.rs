//! In-process bucket

use crate::error::{BucketError, Result};
use crate::{
    partition_keys, validate_key, Listing, Object, ObjectAttributes, ObjectBucket, ObjectMeta,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone)]
struct StoredObject {
    body: Vec<u8>,
    attributes: ObjectAttributes,
}

/// Bucket holding every object in memory
///
/// Counts `PUT` requests so callers can assert on write side effects.
#[derive(Debug)]
pub struct MemoryBucket {
    name: String,
    objects: Mutex<BTreeMap<String, StoredObject>>,
    puts: AtomicU64,
}

impl MemoryBucket {
    /// Create an empty bucket
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            objects: Mutex::new(BTreeMap::new()),
            puts: AtomicU64::new(0),
        }
    }

    /// Number of `PUT` requests served so far
    #[must_use]
    pub fn put_count(&self) -> u64 {
        self.puts.load(Ordering::Relaxed)
    }

    /// Every stored key, sorted
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, StoredObject>> {
        self.objects.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ObjectBucket for MemoryBucket {
    fn name(&self) -> &str {
        &self.name
    }

    async fn head(&self, key: &str) -> Result<Option<ObjectMeta>> {
        validate_key(key)?;
        Ok(self.lock().get(key).map(|stored| ObjectMeta {
            key: key.to_string(),
            size: stored.body.len() as u64,
            attributes: stored.attributes.clone(),
        }))
    }

    async fn list(&self, prefix: &str, delimiter: Option<char>) -> Result<Listing> {
        let objects = self.lock();
        let keys = objects
            .range(prefix.to_string()..)
            .map(|(key, _)| key.as_str())
            .take_while(|key| key.starts_with(prefix));
        Ok(partition_keys(keys, prefix, delimiter))
    }

    async fn get(&self, key: &str) -> Result<Object> {
        validate_key(key)?;
        let objects = self.lock();
        let stored = objects
            .get(key)
            .ok_or_else(|| BucketError::NoSuchKey(key.to_string()))?;
        Ok(Object {
            meta: ObjectMeta {
                key: key.to_string(),
                size: stored.body.len() as u64,
                attributes: stored.attributes.clone(),
            },
            body: stored.body.clone(),
        })
    }

    async fn put(&self, key: &str, body: Vec<u8>, attributes: ObjectAttributes) -> Result<()> {
        validate_key(key)?;
        tracing::trace!("memory bucket {}: put {} ({} bytes)", self.name, key, body.len());
        self.lock()
            .insert(key.to_string(), StoredObject { body, attributes });
        self.puts.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
