use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

use suito_core::TraceContext;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid blob key: {0}")]
    InvalidKey(String),
    #[error("Blob store rejected {0}")]
    Rejected(String),
}

/// Destination for form artifacts (original photo, processed photo, CSV).
/// Keys are `/`-separated relative paths such as `processed/ab/<hash>.csv`.
pub trait BlobStore: Send + Sync {
    fn put(
        &self,
        ctx: &TraceContext,
        key: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Stores blobs as files below a root directory.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a key below the root. Absolute keys and `..` are refused.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let rel = Path::new(key);
        let clean = !key.is_empty() && rel.components().all(|c| matches!(c, Component::Normal(_)));
        if !clean {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(rel))
    }
}

impl BlobStore for FsBlobStore {
    async fn put(
        &self,
        ctx: &TraceContext,
        key: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<(), StoreError> {
        let dest = self.path_for(key)?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&dest, bytes).await?;
        info!(trace_id = %ctx, key, content_type, bytes = bytes.len(), "blob stored");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// In-memory store for tests. Can be told to reject keys with a given suffix.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<BTreeMap<String, StoredBlob>>,
    reject_suffix: Option<String>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting(suffix: impl Into<String>) -> Self {
        Self { reject_suffix: Some(suffix.into()), ..Self::default() }
    }

    pub fn get(&self, key: &str) -> Option<StoredBlob> {
        self.lock().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, StoredBlob>> {
        self.blobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl BlobStore for MemoryBlobStore {
    async fn put(
        &self,
        _ctx: &TraceContext,
        key: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<(), StoreError> {
        if self.reject_suffix.as_deref().is_some_and(|s| key.ends_with(s)) {
            return Err(StoreError::Rejected(key.to_string()));
        }
        self.lock().insert(
            key.to_string(),
            StoredBlob { bytes: bytes.to_vec(), content_type: content_type.to_string() },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> TraceContext {
        TraceContext::new("test")
    }

    #[tokio::test]
    async fn fs_store_writes_nested_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());
        store.put(&ctx(), "processed/ab/abcd.csv", b"a,b\r\n", "text/csv").await.unwrap();

        let written = std::fs::read(dir.path().join("processed/ab/abcd.csv")).unwrap();
        assert_eq!(written, b"a,b\r\n");
    }

    #[tokio::test]
    async fn fs_store_overwrites_same_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());
        store.put(&ctx(), "x/y.jpg", b"one", "image/jpeg").await.unwrap();
        store.put(&ctx(), "x/y.jpg", b"two", "image/jpeg").await.unwrap();
        assert_eq!(std::fs::read(dir.path().join("x/y.jpg")).unwrap(), b"two");
    }

    #[test]
    fn fs_store_refuses_escaping_keys() {
        let store = FsBlobStore::new("/data/store");
        assert!(matches!(store.path_for("../etc/passwd"), Err(StoreError::InvalidKey(_))));
        assert!(matches!(store.path_for("/etc/passwd"), Err(StoreError::InvalidKey(_))));
        assert!(matches!(store.path_for(""), Err(StoreError::InvalidKey(_))));
        assert_eq!(
            store.path_for("review/ab/c.csv").unwrap(),
            PathBuf::from("/data/store/review/ab/c.csv")
        );
    }

    #[tokio::test]
    async fn memory_store_records_content_type() {
        let store = MemoryBlobStore::new();
        store.put(&ctx(), "failed/ab/abcd.png", b"png", "image/png").await.unwrap();
        let blob = store.get("failed/ab/abcd.png").unwrap();
        assert_eq!(blob.bytes, b"png");
        assert_eq!(blob.content_type, "image/png");
        assert_eq!(store.keys(), vec!["failed/ab/abcd.png".to_string()]);
    }

    #[tokio::test]
    async fn memory_store_rejects_configured_suffix() {
        let store = MemoryBlobStore::rejecting(".csv");
        assert!(store.put(&ctx(), "processed/ab/a.csv", b"", "text/csv").await.is_err());
        assert!(store.put(&ctx(), "processed/ab/a.jpg", b"", "image/jpeg").await.is_ok());
        assert_eq!(store.keys().len(), 1);
    }
}
