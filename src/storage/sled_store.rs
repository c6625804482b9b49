//! Sled Storage Backend
//!
//! Persistent storage on an embedded sled database. Each bucket is a tree
//! named `bucket:{name}`, so no bucket name can address sled's own trees.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use sled::{Db, Tree};
use tracing::debug;

use super::StorageBackend;
use crate::cache::lock::{rw_read, rw_write};
use crate::error::{ProxyError, Result};

const TREE_PREFIX: &str = "bucket:";

/// Persistent storage backed by sled.
///
/// sled serializes writes internally, so one handle is shared by every request.
#[derive(Clone)]
pub struct SledStorage {
    db: Db,
    /// Open trees by bucket name; a bucket missing here has never been written
    trees: Arc<RwLock<HashMap<String, Tree>>>,
}

impl SledStorage {
    /// Opens (or creates) the database directory at `path` and its existing buckets.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let db = sled::open(path)
            .map_err(|e| ProxyError::Storage(format!("failed to open {path:?}: {e}")))?;

        let mut trees = HashMap::new();
        for name in db.tree_names() {
            let Some(bucket) = name.strip_prefix(TREE_PREFIX.as_bytes()) else {
                continue;
            };
            let tree = db
                .open_tree(&name)
                .map_err(|e| ProxyError::Storage(format!("failed to open tree: {e}")))?;
            trees.insert(String::from_utf8_lossy(bucket).into_owned(), tree);
        }
        debug!(path = ?path, buckets = trees.len(), "Opened sled storage");

        Ok(Self {
            db,
            trees: Arc::new(RwLock::new(trees)),
        })
    }

    fn tree(&self, bucket: &str) -> Option<Tree> {
        rw_read(&self.trees, "sled.trees.get").get(bucket).cloned()
    }

    fn tree_or_create(&self, bucket: &str) -> sled::Result<Tree> {
        if let Some(tree) = self.tree(bucket) {
            return Ok(tree);
        }
        let tree = self.db.open_tree(format!("{TREE_PREFIX}{bucket}"))?;
        Ok(rw_write(&self.trees, "sled.trees.insert")
            .entry(bucket.to_string())
            .or_insert(tree)
            .clone())
    }
}

/// Runs a sled operation on the blocking pool.
async fn blocking<T, F>(op: &'static str, f: F) -> Result<T>
where
    F: FnOnce() -> sled::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ProxyError::Storage(format!("{op} task failed: {e}")))?
        .map_err(|e| ProxyError::Storage(format!("{op}: {e}")))
}

#[async_trait]
impl StorageBackend for SledStorage {
    async fn get(&self, bucket: &str, key: &str) -> Result<Option<Bytes>> {
        let Some(tree) = self.tree(bucket) else {
            return Ok(None);
        };
        let key = key.to_string();
        blocking("get", move || {
            Ok(tree.get(key.as_bytes())?.map(|v| Bytes::copy_from_slice(&v)))
        })
        .await
    }

    async fn set(&self, bucket: &str, key: &str, value: Bytes) -> Result<()> {
        let storage = self.clone();
        let (bucket, key) = (bucket.to_string(), key.to_string());
        blocking("set", move || {
            let tree = storage.tree_or_create(&bucket)?;
            tree.insert(key.as_bytes(), value.as_ref())?;
            tree.flush()?;
            debug!(bucket = %bucket, key = %key, size = value.len(), "Stored entry");
            Ok(())
        })
        .await
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        let Some(tree) = self.tree(bucket) else {
            return Ok(());
        };
        let key = key.to_string();
        blocking("delete", move || {
            tree.remove(key.as_bytes())?;
            tree.flush()?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_temp() -> (TempDir, SledStorage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = SledStorage::open(dir.path().join("db")).unwrap();
        (dir, storage)
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let (_dir, storage) = open_temp();
        storage
            .set("pages", "home", Bytes::from_static(b"<html>v1</html>"))
            .await
            .unwrap();

        let value = storage.get("pages", "home").await.unwrap();
        assert_eq!(value, Some(Bytes::from_static(b"<html>v1</html>")));
    }

    #[tokio::test]
    async fn test_missing_bucket_and_key() {
        let (_dir, storage) = open_temp();
        assert_eq!(storage.get("pages", "home").await.unwrap(), None);

        storage.set("pages", "home", Bytes::from_static(b"x")).await.unwrap();
        assert_eq!(storage.get("pages", "about").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete() {
        let (_dir, storage) = open_temp();
        storage.set("pages", "home", Bytes::from_static(b"x")).await.unwrap();
        storage.delete("pages", "home").await.unwrap();
        assert_eq!(storage.get("pages", "home").await.unwrap(), None);

        storage.delete("unknown", "home").await.unwrap();
    }

    #[tokio::test]
    async fn test_reads_do_not_create_buckets() {
        let (_dir, storage) = open_temp();
        let before = storage.db.tree_names().len();

        assert_eq!(storage.get("pages", "home").await.unwrap(), None);
        storage.delete("pages", "home").await.unwrap();

        assert_eq!(storage.db.tree_names().len(), before);
    }

    #[tokio::test]
    async fn test_sled_default_tree_name_is_an_ordinary_bucket() {
        let (_dir, storage) = open_temp();
        storage
            .set("__sled__default", "home", Bytes::from_static(b"v1"))
            .await
            .unwrap();

        assert_eq!(storage.db.get("home").unwrap(), None);
        assert_eq!(
            storage.get("__sled__default", "home").await.unwrap(),
            Some(Bytes::from_static(b"v1"))
        );
    }

    #[tokio::test]
    async fn test_entries_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db");
        {
            let storage = SledStorage::open(&path).unwrap();
            storage
                .set("assets", "css/main.css", Bytes::from_static(b"body{}"))
                .await
                .unwrap();
        }

        let storage = SledStorage::open(&path).unwrap();
        assert_eq!(
            storage.get("assets", "css/main.css").await.unwrap(),
            Some(Bytes::from_static(b"body{}"))
        );
    }
}
