//! In-memory key-value store for testing and ephemeral sessions.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::provider::KeyValueStore;
use jamtalk_common::{Bucket, Error, Result};

type Buckets = HashMap<Bucket, HashMap<String, Value>>;

/// In-memory store.
///
/// All data is lost on drop. `None` marks a closed store.
pub struct MemoryStore {
    buckets: RwLock<Option<Buckets>>,
}

impl MemoryStore {
    /// Create a new store with every bucket present and empty.
    pub fn new() -> Self {
        let buckets = Bucket::ALL
            .iter()
            .map(|b| (*b, HashMap::new()))
            .collect();

        Self {
            buckets: RwLock::new(Some(buckets)),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Option<Buckets>>> {
        self.buckets
            .read()
            .map_err(|_| Error::Storage("Memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Option<Buckets>>> {
        self.buckets
            .write()
            .map_err(|_| Error::Storage("Memory store lock poisoned".to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn closed() -> Error {
    Error::StoreUnavailable("Memory store is closed".to_string())
}

fn bucket_mut(buckets: &mut Buckets, bucket: Bucket) -> &mut HashMap<String, Value> {
    buckets.entry(bucket).or_default()
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn put(&self, bucket: Bucket, key: &str, value: Value) -> Result<()> {
        let mut guard = self.write()?;
        let buckets = guard.as_mut().ok_or_else(closed)?;
        bucket_mut(buckets, bucket).insert(key.to_string(), value);
        Ok(())
    }

    async fn put_if_absent(&self, bucket: Bucket, key: &str, value: Value) -> Result<bool> {
        let mut guard = self.write()?;
        let buckets = guard.as_mut().ok_or_else(closed)?;
        match bucket_mut(buckets, bucket).entry(key.to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(value);
                Ok(true)
            }
        }
    }

    async fn get(&self, bucket: Bucket, key: &str) -> Result<Option<Value>> {
        let guard = self.read()?;
        let buckets = guard.as_ref().ok_or_else(closed)?;
        Ok(buckets.get(&bucket).and_then(|b| b.get(key)).cloned())
    }

    async fn get_all(&self, bucket: Bucket) -> Result<Vec<Value>> {
        let guard = self.read()?;
        let buckets = guard.as_ref().ok_or_else(closed)?;
        Ok(buckets
            .get(&bucket)
            .map(|b| b.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn delete(&self, bucket: Bucket, key: &str) -> Result<()> {
        let mut guard = self.write()?;
        let buckets = guard.as_mut().ok_or_else(closed)?;
        bucket_mut(buckets, bucket).remove(key);
        Ok(())
    }

    async fn clear(&self, bucket: Bucket) -> Result<()> {
        let mut guard = self.write()?;
        let buckets = guard.as_mut().ok_or_else(closed)?;
        bucket_mut(buckets, bucket).clear();
        Ok(())
    }

    async fn count(&self, bucket: Bucket) -> Result<u64> {
        let guard = self.read()?;
        let buckets = guard.as_ref().ok_or_else(closed)?;
        Ok(buckets.get(&bucket).map(|b| b.len() as u64).unwrap_or(0))
    }

    async fn close(&self) -> Result<()> {
        self.write()?.take();
        Ok(())
    }
}
