//! Key-value store trait definition.

use async_trait::async_trait;
use serde_json::Value;

use jamtalk_common::{Bucket, Result};

/// Persistent key-value store with fixed named buckets.
///
/// Each operation is its own transaction. Implementations never inspect the
/// values they hold.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Get the backend name (e.g., "sqlite", "memory").
    fn name(&self) -> &str;

    /// Insert or overwrite the value stored under `key`.
    ///
    /// # Errors
    /// - `StoreUnavailable` if the store has been closed
    /// - `Storage` if the write fails
    async fn put(&self, bucket: Bucket, key: &str, value: Value) -> Result<()>;

    /// Insert `value` only if `key` is absent, atomically.
    ///
    /// Returns `false` and leaves the existing value untouched when `key`
    /// is already present.
    async fn put_if_absent(&self, bucket: Bucket, key: &str, value: Value) -> Result<bool>;

    /// Read the value stored under `key`, if any.
    async fn get(&self, bucket: Bucket, key: &str) -> Result<Option<Value>>;

    /// Read every value in a bucket. Order is unspecified.
    async fn get_all(&self, bucket: Bucket) -> Result<Vec<Value>>;

    /// Delete `key`. Deleting an absent key succeeds.
    async fn delete(&self, bucket: Bucket, key: &str) -> Result<()>;

    /// Remove every record in a bucket. Idempotent.
    async fn clear(&self, bucket: Bucket) -> Result<()>;

    /// Number of records in a bucket.
    async fn count(&self, bucket: Bucket) -> Result<u64>;

    /// Release the underlying database. Later operations fail with
    /// `StoreUnavailable`.
    async fn close(&self) -> Result<()>;
}
