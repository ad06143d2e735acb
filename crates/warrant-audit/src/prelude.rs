//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warrant_audit::prelude::*;` to import all essential types.

pub use crate::{
    ActorType, AuditEntry, AuditEntryId, AuditError, AuditEvent, AuditEventType, AuditLog,
    AuditQuery, AuditResult, AuditStorage, ChainIssue, ChainVerificationResult, DelegationRecord,
    KvAuditStorage,
};
