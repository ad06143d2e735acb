//! Audit log storage trait and KV-backed implementation.

use async_trait::async_trait;
use std::sync::Arc;
use warrant_storage::{KvStore, MemoryKvStore};

use crate::entry::AuditEntry;
use crate::error::{AuditError, AuditResult};

/// Storage backend for audit logs.
///
/// Implementations must be thread-safe. Entries are only ever appended;
/// there is no update or delete.
#[async_trait]
pub trait AuditStorage: Send + Sync {
    /// Persist a sealed entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be persisted.
    async fn append(&self, entry: &AuditEntry) -> AuditResult<()>;

    /// All stored entries in sequence order.
    ///
    /// # Errors
    ///
    /// Returns an error if retrieval or deserialization fails.
    async fn entries(&self) -> AuditResult<Vec<AuditEntry>>;

    /// Count stored entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails.
    async fn count(&self) -> AuditResult<usize>;

    /// The entry with the highest sequence number, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if retrieval or deserialization fails.
    async fn last(&self) -> AuditResult<Option<AuditEntry>>;
}

// -- Namespace constants --

const NS_ENTRIES: &str = "audit:entries";

/// Zero-padded so lexical key order matches sequence order.
fn entry_key(sequence: u64) -> String {
    format!("{sequence:020}")
}

/// Audit storage on top of any [`KvStore`].
pub struct KvAuditStorage {
    store: Arc<dyn KvStore>,
}

impl KvAuditStorage {
    /// Store entries in the `audit:entries` namespace of `store`.
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Create an in-memory storage.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryKvStore::new()))
    }

    async fn sorted_keys(&self) -> AuditResult<Vec<String>> {
        let mut keys = self.store.list_keys(NS_ENTRIES).await?;
        keys.sort_unstable();
        Ok(keys)
    }

    async fn get(&self, key: &str) -> AuditResult<Option<AuditEntry>> {
        match self.store.get(NS_ENTRIES, key).await? {
            Some(bytes) => {
                let entry = serde_json::from_slice(&bytes)
                    .map_err(|e| AuditError::SerializationError(e.to_string()))?;
                Ok(Some(entry))
            },
            None => Ok(None),
        }
    }
}

#[async_trait]
impl AuditStorage for KvAuditStorage {
    async fn append(&self, entry: &AuditEntry) -> AuditResult<()> {
        let data =
            serde_json::to_vec(entry).map_err(|e| AuditError::SerializationError(e.to_string()))?;
        self.store
            .set(NS_ENTRIES, &entry_key(entry.sequence), data)
            .await?;
        Ok(())
    }

    async fn entries(&self) -> AuditResult<Vec<AuditEntry>> {
        let keys = self.sorted_keys().await?;
        let mut entries = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(entry) = self.get(&key).await? {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    async fn count(&self) -> AuditResult<usize> {
        Ok(self.store.list_keys(NS_ENTRIES).await?.len())
    }

    async fn last(&self) -> AuditResult<Option<AuditEntry>> {
        let keys = self.sorted_keys().await?;
        match keys.last() {
            Some(key) => self.get(key).await,
            None => Ok(None),
        }
    }
}

impl std::fmt::Debug for KvAuditStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvAuditStorage")
            .field("namespace", &NS_ENTRIES)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{ActorType, AuditEvent, AuditEventType};
    use warrant_crypto::ContentHash;

    fn entry(sequence: u64) -> AuditEntry {
        AuditEntry::seal(
            AuditEvent::new(AuditEventType::HumanLogin, "usr-alice-001", ActorType::Human),
            sequence,
            ContentHash::zero(),
        )
    }

    #[test]
    fn test_entry_key_orders_lexically() {
        assert!(entry_key(9) < entry_key(10));
        assert!(entry_key(99) < entry_key(100));
        assert_eq!(entry_key(7).len(), 20);
    }

    #[tokio::test]
    async fn test_append_and_read_in_order() {
        let storage = KvAuditStorage::in_memory();
        for seq in [2, 0, 11, 1] {
            storage.append(&entry(seq)).await.unwrap();
        }

        let sequences: Vec<u64> = storage
            .entries()
            .await
            .unwrap()
            .iter()
            .map(|e| e.sequence)
            .collect();
        assert_eq!(sequences, vec![0, 1, 2, 11]);
        assert_eq!(storage.count().await.unwrap(), 4);
        assert_eq!(storage.last().await.unwrap().unwrap().sequence, 11);
    }

    #[tokio::test]
    async fn test_empty_storage() {
        let storage = KvAuditStorage::in_memory();
        assert_eq!(storage.count().await.unwrap(), 0);
        assert!(storage.last().await.unwrap().is_none());
        assert!(storage.entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_shared_store_is_namespaced() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
        store.set("auth:sessions", "sess-1", b"{}".to_vec()).await.unwrap();

        let storage = KvAuditStorage::new(Arc::clone(&store));
        storage.append(&entry(0)).await.unwrap();

        assert_eq!(storage.count().await.unwrap(), 1);
        assert_eq!(store.list_keys("auth:sessions").await.unwrap().len(), 1);
    }
}
