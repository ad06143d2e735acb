//! Warrant Storage - the injected store behind sessions, tokens and audit.
//!
//! The auth kernel never touches a concrete database. Session and token
//! registries and the audit log sit on the [`KvStore`] trait, so a test can
//! use [`MemoryKvStore`] while a multi-instance deployment plugs in a shared
//! key-value service without changing any policy logic.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use warrant_storage::{KvStore, MemoryKvStore, ScopedKvStore};
//!
//! let store: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
//! let tokens = ScopedKvStore::new(store, "auth:agent_tokens")?;
//!
//! tokens.set_json("agent-1", &vec!["alice", "agent-1"]).await?;
//! let chain: Option<Vec<String>> = tokens.get_json("agent-1").await?;
//! assert_eq!(chain.unwrap().len(), 2);
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod kv;

pub use error::{StorageError, StorageResult};
pub use kv::{KvStore, MemoryKvStore, ScopedKvStore};
