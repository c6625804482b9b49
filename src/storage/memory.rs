//! Memory Storage Backend
//!
//! Nested maps behind an async lock, for tests and `STORAGE=memory`.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use super::StorageBackend;
use crate::error::Result;

/// In-process storage. Contents are lost on shutdown.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    buckets: RwLock<HashMap<String, HashMap<String, Bytes>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of buckets created so far.
    pub async fn bucket_count(&self) -> usize {
        self.buckets.read().await.len()
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn get(&self, bucket: &str, key: &str) -> Result<Option<Bytes>> {
        let buckets = self.buckets.read().await;
        Ok(buckets.get(bucket).and_then(|entries| entries.get(key)).cloned())
    }

    async fn set(&self, bucket: &str, key: &str, value: Bytes) -> Result<()> {
        let mut buckets = self.buckets.write().await;
        buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        let mut buckets = self.buckets.write().await;
        if let Some(entries) = buckets.get_mut(bucket) {
            entries.remove(key);
        }
        Ok(())
    }
}
