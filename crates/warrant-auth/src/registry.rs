//! Token-keyed identity registries.
//!
//! Sessions and agent delegations live in an [`IdentityRegistry`] keyed by
//! their bearer token. [`MemoryRegistry`] keeps them in process;
//! [`KvRegistry`] puts them in a [`KvStore`] so several instances can share
//! revocations.
//!
//! Every read-modify-write (evict on expiry, revoke a whole task) runs under
//! one write guard, so a reader never sees a token after a concurrent
//! removal of it has returned.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use warrant_crypto::SecretToken;
use warrant_storage::{KvStore, ScopedKvStore, StorageResult};

/// Predicate used by [`IdentityRegistry::remove_where`].
pub type Predicate<'a, T> = &'a (dyn Fn(&T) -> bool + Send + Sync);

/// Storage for identities keyed by bearer token.
#[async_trait]
pub trait IdentityRegistry<T>: Send + Sync
where
    T: Clone + Send + Sync + 'static,
{
    /// Look up the identity registered under `token`.
    async fn get(&self, token: &SecretToken) -> StorageResult<Option<T>>;

    /// Register `identity` under `token`, replacing any previous value.
    async fn put(&self, token: &SecretToken, identity: T) -> StorageResult<()>;

    /// Register `identity` under `token` only while `anchor` is registered
    /// and its identity satisfies `live`. The check and the insert are one
    /// atomic step, so a removal of `anchor` that has returned is never
    /// followed by a successful insert.
    ///
    /// Returns whether `identity` was registered.
    async fn put_if_live(
        &self,
        anchor: &SecretToken,
        live: Predicate<'_, T>,
        token: &SecretToken,
        identity: T,
    ) -> StorageResult<bool>;

    /// Remove the identity under `token`. Removing an absent token is not
    /// an error.
    async fn remove(&self, token: &SecretToken) -> StorageResult<Option<T>>;

    /// Remove every identity matching `predicate` in one atomic sweep.
    async fn remove_where(&self, predicate: Predicate<'_, T>) -> StorageResult<Vec<T>>;

    /// Number of registered identities.
    async fn len(&self) -> StorageResult<usize>;

    /// Whether the registry holds no identities.
    async fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.len().await? == 0)
    }
}

// ---------------------------------------------------------------------------
// In-memory registry
// ---------------------------------------------------------------------------

/// In-process registry behind a single `RwLock`.
pub struct MemoryRegistry<T> {
    entries: RwLock<HashMap<SecretToken, T>>,
}

impl<T> MemoryRegistry<T> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<T> Default for MemoryRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for MemoryRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryRegistry").finish_non_exhaustive()
    }
}

#[async_trait]
impl<T> IdentityRegistry<T> for MemoryRegistry<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn get(&self, token: &SecretToken) -> StorageResult<Option<T>> {
        Ok(self.entries.read().await.get(token).cloned())
    }

    async fn put(&self, token: &SecretToken, identity: T) -> StorageResult<()> {
        self.entries.write().await.insert(token.clone(), identity);
        Ok(())
    }

    async fn put_if_live(
        &self,
        anchor: &SecretToken,
        live: Predicate<'_, T>,
        token: &SecretToken,
        identity: T,
    ) -> StorageResult<bool> {
        let mut entries = self.entries.write().await;
        if !entries.get(anchor).is_some_and(live) {
            return Ok(false);
        }
        entries.insert(token.clone(), identity);
        Ok(true)
    }

    async fn remove(&self, token: &SecretToken) -> StorageResult<Option<T>> {
        Ok(self.entries.write().await.remove(token))
    }

    async fn remove_where(&self, predicate: Predicate<'_, T>) -> StorageResult<Vec<T>> {
        let mut entries = self.entries.write().await;
        let doomed: Vec<SecretToken> = entries
            .iter()
            .filter(|(_, identity)| predicate(identity))
            .map(|(token, _)| token.clone())
            .collect();

        Ok(doomed
            .iter()
            .filter_map(|token| entries.remove(token))
            .collect())
    }

    async fn len(&self) -> StorageResult<usize> {
        Ok(self.entries.read().await.len())
    }
}

// ---------------------------------------------------------------------------
// KV-backed registry
// ---------------------------------------------------------------------------

/// Registry stored as JSON values in a [`KvStore`] namespace.
///
/// Operations are serialised through a local `RwLock` gate, which makes
/// scan-and-remove atomic for readers in this process. Atomicity across
/// processes is whatever the backing store provides.
pub struct KvRegistry<T> {
    store: ScopedKvStore,
    gate: RwLock<()>,
    _identity: PhantomData<fn() -> T>,
}

impl<T> KvRegistry<T> {
    /// Create a registry over `namespace` of `store`.
    ///
    /// # Errors
    ///
    /// Returns [`warrant_storage::StorageError::InvalidKey`] if the
    /// namespace is empty or contains null bytes.
    pub fn new(store: Arc<dyn KvStore>, namespace: &str) -> StorageResult<Self> {
        Ok(Self {
            store: ScopedKvStore::new(store, namespace)?,
            gate: RwLock::new(()),
            _identity: PhantomData,
        })
    }
}

impl<T> std::fmt::Debug for KvRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvRegistry")
            .field("namespace", &self.store.namespace())
            .finish_non_exhaustive()
    }
}

/// Tokens the store cannot hold as keys can never have been registered.
fn storable(token: &SecretToken) -> bool {
    let key = token.as_str();
    !key.is_empty() && !key.contains('\0')
}

#[async_trait]
impl<T> IdentityRegistry<T> for KvRegistry<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn get(&self, token: &SecretToken) -> StorageResult<Option<T>> {
        if !storable(token) {
            return Ok(None);
        }
        let _guard = self.gate.read().await;
        self.store.get_json(token.as_str()).await
    }

    async fn put(&self, token: &SecretToken, identity: T) -> StorageResult<()> {
        let _guard = self.gate.write().await;
        self.store.set_json(token.as_str(), &identity).await
    }

    async fn put_if_live(
        &self,
        anchor: &SecretToken,
        live: Predicate<'_, T>,
        token: &SecretToken,
        identity: T,
    ) -> StorageResult<bool> {
        if !storable(anchor) {
            return Ok(false);
        }
        let _guard = self.gate.write().await;
        let Some(current) = self.store.get_json::<T>(anchor.as_str()).await? else {
            return Ok(false);
        };
        if !live(&current) {
            return Ok(false);
        }
        self.store.set_json(token.as_str(), &identity).await?;
        Ok(true)
    }

    async fn remove(&self, token: &SecretToken) -> StorageResult<Option<T>> {
        if !storable(token) {
            return Ok(None);
        }
        let _guard = self.gate.write().await;
        let existing = self.store.get_json(token.as_str()).await?;
        if existing.is_some() {
            self.store.delete(token.as_str()).await?;
        }
        Ok(existing)
    }

    async fn remove_where(&self, predicate: Predicate<'_, T>) -> StorageResult<Vec<T>> {
        let _guard = self.gate.write().await;
        let mut removed = Vec::new();
        for key in self.store.list_keys().await? {
            let Some(identity) = self.store.get_json::<T>(&key).await? else {
                continue;
            };
            if predicate(&identity) {
                self.store.delete(&key).await?;
                removed.push(identity);
            }
        }
        Ok(removed)
    }

    async fn len(&self) -> StorageResult<usize> {
        let _guard = self.gate.read().await;
        Ok(self.store.list_keys().await?.len())
    }
}
