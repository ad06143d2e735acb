//! Mock stores for exercising failure paths.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use warrant_storage::{KvStore, MemoryKvStore, StorageError, StorageResult};

/// An in-memory [`KvStore`] whose writes can be switched off.
///
/// Reads keep working while writes are rejected, which is how a replica
/// behaves when its primary is unreachable.
#[derive(Debug, Default)]
pub struct FlakyKvStore {
    inner: MemoryKvStore,
    rejecting: AtomicBool,
    rejected: AtomicU64,
}

impl FlakyKvStore {
    /// Create a store that accepts writes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start or stop rejecting writes.
    pub fn reject_writes(&self, reject: bool) {
        self.rejecting.store(reject, Ordering::SeqCst);
    }

    /// Number of writes rejected so far.
    #[must_use]
    pub fn rejected_writes(&self) -> u64 {
        self.rejected.load(Ordering::SeqCst)
    }

    fn check_writable(&self) -> StorageResult<()> {
        if self.rejecting.load(Ordering::SeqCst) {
            self.rejected.fetch_add(1, Ordering::SeqCst);
            return Err(StorageError::Unavailable("writes rejected".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl KvStore for FlakyKvStore {
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
        self.inner.get(namespace, key).await
    }

    async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> StorageResult<()> {
        self.check_writable()?;
        self.inner.set(namespace, key, value).await
    }

    async fn delete(&self, namespace: &str, key: &str) -> StorageResult<bool> {
        self.check_writable()?;
        self.inner.delete(namespace, key).await
    }

    async fn exists(&self, namespace: &str, key: &str) -> StorageResult<bool> {
        self.inner.exists(namespace, key).await
    }

    async fn list_keys(&self, namespace: &str) -> StorageResult<Vec<String>> {
        self.inner.list_keys(namespace).await
    }

    async fn clear_namespace(&self, namespace: &str) -> StorageResult<u64> {
        self.check_writable()?;
        self.inner.clear_namespace(namespace).await
    }
}
