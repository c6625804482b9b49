//! Storage Backend Module
//!
//! Persistent byte storage addressed by `(bucket, key)`. Buckets are created
//! on first write. Implementations must be safe to share across concurrent
//! request tasks.

mod memory;
mod sled_store;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

pub use memory::MemoryStorage;
pub use sled_store::SledStorage;

/// Byte store consulted by the cache engine.
#[async_trait]
pub trait StorageBackend: Send + Sync + 'static {
    /// Returns the stored bytes, or `None` when the bucket or key is absent.
    async fn get(&self, bucket: &str, key: &str) -> Result<Option<Bytes>>;

    /// Stores `value`, creating the bucket if needed and replacing any previous value.
    async fn set(&self, bucket: &str, key: &str, value: Bytes) -> Result<()>;

    /// Removes the entry. Deleting an absent entry succeeds.
    async fn delete(&self, bucket: &str, key: &str) -> Result<()>;
}
