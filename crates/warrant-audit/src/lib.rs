//! Warrant Audit - Chain-linked audit logging for the delegated-auth kernel.
//!
//! This crate provides:
//! - Audit entries for logins, delegations, permission checks and revocations
//! - Chain-linked entries (each contains the hash of the previous one)
//! - Storage over any [`warrant_storage::KvStore`]
//! - Provenance queries and chain integrity verification
//!
//! # Security Model
//!
//! Every audit entry carries:
//! - A gap-free sequence number
//! - The BLAKE3 link hash of the previous entry
//! - The full delegation chain of the acting agent
//!
//! Any modification to historical entries breaks the chain and is
//! detectable with [`AuditLog::verify_chain`]. Writing never fails: entries
//! the store rejects are buffered and retried.
//!
//! # Example
//!
//! ```
//! use warrant_audit::{AuditEventType, AuditLog, AuditQuery};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let log = AuditLog::in_memory();
//!
//! log.log_human_login("usr-alice-001", "alice@example.com").await;
//! log.log_token_revoked("agent-x", "task finished").await;
//!
//! let logins = log
//!     .query(&AuditQuery::new().event_type(AuditEventType::HumanLogin))
//!     .await
//!     .unwrap();
//! assert_eq!(logins.len(), 1);
//!
//! // Verify chain integrity
//! let result = log.verify_chain().await.unwrap();
//! assert!(result.valid);
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod entry;
mod error;
mod log;
mod storage;

pub use entry::{ActorType, AuditEntry, AuditEntryId, AuditEvent, AuditEventType};
pub use error::{AuditError, AuditResult};
pub use log::{
    AuditLog, AuditQuery, ChainIssue, ChainVerificationResult, DEFAULT_PENDING_CAPACITY,
    DEFAULT_QUERY_LIMIT, DelegationRecord,
};
pub use storage::{AuditStorage, KvAuditStorage};
