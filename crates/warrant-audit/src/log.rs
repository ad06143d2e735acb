//! Audit log - main interface for audit logging.
//!
//! Recording never fails. If the storage backend rejects a write the entry
//! is held in a bounded pending buffer and retried ahead of the next append,
//! so a flaky store delays persistence without stopping the caller.

use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, error, warn};
use warrant_core::{ActionDecision, ResourceAction};
use warrant_crypto::ContentHash;

use crate::entry::{ActorType, AuditEntry, AuditEntryId, AuditEvent, AuditEventType};
use crate::error::AuditResult;
use crate::storage::{AuditStorage, KvAuditStorage};

/// Default bound on entries buffered while storage is unavailable.
pub const DEFAULT_PENDING_CAPACITY: usize = 10_000;

/// Default number of entries returned by [`AuditLog::query`].
pub const DEFAULT_QUERY_LIMIT: usize = 100;

/// Sequence and link state, guarded by one lock so each append is atomic.
#[derive(Debug)]
struct ChainState {
    next_sequence: u64,
    head: ContentHash,
    pending: VecDeque<AuditEntry>,
}

impl ChainState {
    fn genesis() -> Self {
        Self {
            next_sequence: 0,
            head: ContentHash::zero(),
            pending: VecDeque::new(),
        }
    }
}

/// A delegation to be recorded.
#[derive(Debug, Clone, Copy)]
pub struct DelegationRecord<'a> {
    /// The agent that received the delegation.
    pub agent_id: &'a str,
    /// Free-form agent type.
    pub agent_type: &'a str,
    /// The new agent's chain, ending with `agent_id`.
    pub delegation_chain: &'a [String],
    /// Task the agent was created for.
    pub task_id: &'a str,
    /// Resource scope requested by the delegator, if any.
    pub scoped_resources: Option<&'a [String]>,
    /// Whether the delegation was narrowed to read-only.
    pub read_only: bool,
}

impl DelegationRecord<'_> {
    /// The delegator: the entry before the new agent in the chain.
    fn delegator(&self) -> &str {
        self.delegation_chain
            .len()
            .checked_sub(2)
            .and_then(|i| self.delegation_chain.get(i))
            .map_or(self.agent_id, String::as_str)
    }

    fn is_direct(&self) -> bool {
        self.delegation_chain.len() <= 2
    }
}

/// Filter for [`AuditLog::query`]. Every set field must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditQuery {
    /// Only entries by this actor.
    pub actor_id: Option<String>,
    /// Only entries of this type.
    pub event_type: Option<AuditEventType>,
    /// Only entries for this task.
    pub task_id: Option<String>,
    /// Most recent matches to return; [`DEFAULT_QUERY_LIMIT`] when unset.
    pub limit: Option<usize>,
}

impl AuditQuery {
    /// Match everything, up to the default limit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to one actor.
    #[must_use]
    pub fn actor(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = Some(actor_id.into());
        self
    }

    /// Restrict to one event type.
    #[must_use]
    pub fn event_type(mut self, event_type: AuditEventType) -> Self {
        self.event_type = Some(event_type);
        self
    }

    /// Restrict to one task.
    #[must_use]
    pub fn task(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    /// Return at most `limit` entries.
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn matches(&self, entry: &AuditEntry) -> bool {
        self.actor_id.as_ref().is_none_or(|a| *a == entry.actor_id)
            && self.event_type.is_none_or(|t| t == entry.event_type)
            && self
                .task_id
                .as_ref()
                .is_none_or(|t| entry.task_id.as_ref() == Some(t))
    }
}

/// Append-only audit log for logins, delegations, checks and revocations.
pub struct AuditLog {
    storage: Arc<dyn AuditStorage>,
    state: Mutex<ChainState>,
    pending_capacity: usize,
    dropped: AtomicU64,
}

impl AuditLog {
    /// Create a new audit log starting a fresh chain on `storage`.
    #[must_use]
    pub fn new(storage: Arc<dyn AuditStorage>) -> Self {
        Self {
            storage,
            state: Mutex::new(ChainState::genesis()),
            pending_capacity: DEFAULT_PENDING_CAPACITY,
            dropped: AtomicU64::new(0),
        }
    }

    /// Create an in-memory audit log.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(KvAuditStorage::in_memory()))
    }

    /// Open a log over storage that may already hold entries, continuing
    /// its chain.
    ///
    /// # Errors
    ///
    /// Returns an error if the last stored entry cannot be read.
    pub async fn resume(storage: Arc<dyn AuditStorage>) -> AuditResult<Self> {
        let state = match storage.last().await? {
            Some(last) => ChainState {
                next_sequence: last.sequence.saturating_add(1),
                head: last.content_hash(),
                pending: VecDeque::new(),
            },
            None => ChainState::genesis(),
        };
        debug!(next_sequence = state.next_sequence, "Resuming audit chain");
        Ok(Self {
            storage,
            state: Mutex::new(state),
            pending_capacity: DEFAULT_PENDING_CAPACITY,
            dropped: AtomicU64::new(0),
        })
    }

    /// Set the bound on entries buffered while storage is unavailable.
    #[must_use]
    pub fn with_pending_capacity(mut self, capacity: usize) -> Self {
        self.pending_capacity = capacity;
        self
    }

    /// Seal and append an event. Never fails.
    pub async fn record(&self, event: AuditEvent) -> AuditEntryId {
        let mut state = self.state.lock().await;
        self.flush_locked(&mut state).await;

        let entry = AuditEntry::seal(event, state.next_sequence, state.head);
        state.head = entry.content_hash();
        state.next_sequence = state.next_sequence.saturating_add(1);

        let entry_id = entry.id.clone();
        debug!(
            entry_id = %entry_id,
            sequence = entry.sequence,
            event_type = %entry.event_type,
            actor_id = %entry.actor_id,
            "Appending audit entry"
        );

        // Keep order: nothing overtakes an entry still waiting in the buffer.
        if !state.pending.is_empty() {
            self.buffer(&mut state, entry);
            return entry_id;
        }

        if let Err(e) = self.storage.append(&entry).await {
            error!(
                entry_id = %entry_id,
                sequence = entry.sequence,
                error = %e,
                "Audit store rejected entry, buffering"
            );
            self.buffer(&mut state, entry);
        }
        entry_id
    }

    fn buffer(&self, state: &mut ChainState, entry: AuditEntry) {
        if self.pending_capacity == 0 {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            error!(sequence = entry.sequence, "Audit entry dropped, no pending capacity");
            return;
        }
        if state.pending.len() >= self.pending_capacity
            && let Some(oldest) = state.pending.pop_front()
        {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            error!(
                entry_id = %oldest.id,
                sequence = oldest.sequence,
                capacity = self.pending_capacity,
                "Audit pending buffer full, dropped oldest entry"
            );
        }
        state.pending.push_back(entry);
    }

    async fn flush_locked(&self, state: &mut ChainState) {
        while let Some(entry) = state.pending.front() {
            if let Err(e) = self.storage.append(entry).await {
                warn!(
                    pending = state.pending.len(),
                    error = %e,
                    "Audit store still unavailable"
                );
                return;
            }
            state.pending.pop_front();
        }
    }

    /// Retry buffered entries now. Returns how many remain buffered.
    pub async fn flush(&self) -> usize {
        let mut state = self.state.lock().await;
        self.flush_locked(&mut state).await;
        state.pending.len()
    }

    /// Entries waiting for storage to accept them.
    pub async fn pending_entries(&self) -> usize {
        self.state.lock().await.pending.len()
    }

    /// Entries lost to pending-buffer overflow since this log was opened.
    #[must_use]
    pub fn dropped_entries(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    // -- Event helpers --

    /// Record a successful human login.
    pub async fn log_human_login(&self, user_id: &str, email: &str) -> AuditEntryId {
        self.record(
            AuditEvent::new(AuditEventType::HumanLogin, user_id, ActorType::Human)
                .detail("email", email),
        )
        .await
    }

    /// Record a human logout.
    pub async fn log_human_logout(&self, user_id: &str) -> AuditEntryId {
        self.record(AuditEvent::new(
            AuditEventType::HumanLogout,
            user_id,
            ActorType::Human,
        ))
        .await
    }

    /// Record a failed login. The actor is unknown by construction.
    pub async fn log_human_login_failed(&self, email: &str, reason: &str) -> AuditEntryId {
        self.record(
            AuditEvent::new(AuditEventType::HumanLoginFailed, "unknown", ActorType::Human)
                .detail("email", email)
                .detail("reason", reason),
        )
        .await
    }

    /// Record eviction of an expired human session.
    pub async fn log_session_expired(&self, user_id: &str) -> AuditEntryId {
        self.record(AuditEvent::new(
            AuditEventType::SessionExpired,
            user_id,
            ActorType::System,
        ))
        .await
    }

    /// Record a delegation. A two-element chain is a human delegating to an
    /// agent; anything longer is an agent delegating to a sub-agent.
    pub async fn log_delegation(&self, record: &DelegationRecord<'_>) -> AuditEntryId {
        let (event_type, actor_type) = if record.is_direct() {
            (AuditEventType::AgentDelegated, ActorType::Human)
        } else {
            (AuditEventType::AgentSubdelegated, ActorType::Agent)
        };
        let scope: Vec<Value> = record
            .scoped_resources
            .unwrap_or_default()
            .iter()
            .map(|r| Value::from(r.as_str()))
            .collect();

        self.record(
            AuditEvent::new(event_type, record.delegator(), actor_type)
                .chain(record.delegation_chain)
                .task(record.task_id)
                .detail("agent_id", record.agent_id)
                .detail("agent_type", record.agent_type)
                .detail("scoped_resources", scope)
                .detail("read_only", record.read_only),
        )
        .await
    }

    /// Record a refused delegation attempt.
    pub async fn log_delegation_denied(
        &self,
        actor_id: &str,
        actor_type: ActorType,
        agent_id: &str,
        task_id: &str,
        reason: &str,
    ) -> AuditEntryId {
        self.record(
            AuditEvent::new(AuditEventType::AgentDelegationDenied, actor_id, actor_type)
                .task(task_id)
                .detail("agent_id", agent_id)
                .detail("reason", reason),
        )
        .await
    }

    /// Record a permission check. Denials are logged as `permission.denied`.
    pub async fn log_permission_check(
        &self,
        actor_id: &str,
        resource: &str,
        action: ResourceAction,
        decision: ActionDecision,
        delegation_chain: &[String],
        task_id: Option<&str>,
    ) -> AuditEntryId {
        let event_type = if decision == ActionDecision::Denied {
            AuditEventType::PermissionDenied
        } else {
            AuditEventType::PermissionCheck
        };
        let mut event = AuditEvent::new(event_type, actor_id, ActorType::Agent)
            .target(resource, action.as_str())
            .result(decision)
            .chain(delegation_chain);
        if let Some(task_id) = task_id {
            event = event.task(task_id);
        }
        self.record(event).await
    }

    /// Record revocation of a single agent token.
    pub async fn log_token_revoked(&self, agent_id: &str, reason: &str) -> AuditEntryId {
        self.record(
            AuditEvent::new(AuditEventType::TokenRevoked, agent_id, ActorType::Agent)
                .detail("reason", reason),
        )
        .await
    }

    /// Record revocation of every token belonging to a task.
    pub async fn log_task_revoked(&self, task_id: &str, tokens_revoked: usize) -> AuditEntryId {
        self.record(
            AuditEvent::new(AuditEventType::TaskRevoked, "system", ActorType::System)
                .task(task_id)
                .detail("tokens_revoked", tokens_revoked),
        )
        .await
    }

    // -- Queries --

    /// Every entry, stored and pending, in sequence order.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend cannot be read.
    pub async fn entries(&self) -> AuditResult<Vec<AuditEntry>> {
        let state = self.state.lock().await;
        let mut by_sequence: BTreeMap<u64, AuditEntry> = self
            .storage
            .entries()
            .await?
            .into_iter()
            .map(|e| (e.sequence, e))
            .collect();
        for entry in &state.pending {
            by_sequence
                .entry(entry.sequence)
                .or_insert_with(|| entry.clone());
        }
        Ok(by_sequence.into_values().collect())
    }

    /// The most recent matches, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend cannot be read.
    pub async fn query(&self, query: &AuditQuery) -> AuditResult<Vec<AuditEntry>> {
        let limit = query.limit.unwrap_or(DEFAULT_QUERY_LIMIT);
        let mut matches: Vec<AuditEntry> = self
            .entries()
            .await?
            .into_iter()
            .filter(|e| query.matches(e))
            .collect();
        let skip = matches.len().saturating_sub(limit);
        matches.drain(..skip);
        Ok(matches)
    }

    /// Every entry the agent took part in, as actor or anywhere in the
    /// delegation chain.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend cannot be read.
    pub async fn trace_delegation_chain(&self, agent_id: &str) -> AuditResult<Vec<AuditEntry>> {
        Ok(self
            .entries()
            .await?
            .into_iter()
            .filter(|e| e.involves(agent_id))
            .collect())
    }

    /// Count of entries held, stored plus pending.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails.
    pub async fn total_entries(&self) -> AuditResult<usize> {
        let state = self.state.lock().await;
        Ok(self
            .storage
            .count()
            .await?
            .saturating_add(state.pending.len()))
    }

    /// Verify sequence continuity and hash links across the whole log.
    ///
    /// # Errors
    ///
    /// Returns an error if entries cannot be retrieved from storage.
    pub async fn verify_chain(&self) -> AuditResult<ChainVerificationResult> {
        let entries = self.entries().await?;
        let mut issues = Vec::new();

        if let Some(first) = entries.first()
            && !(first.sequence == 0 && first.previous_hash.is_zero())
        {
            issues.push(ChainIssue::InvalidGenesis {
                entry_id: first.id.clone(),
            });
        }

        for pair in entries.windows(2) {
            let [prev, curr] = pair else { continue };
            let expected_sequence = prev.sequence.saturating_add(1);
            if curr.sequence != expected_sequence {
                warn!(
                    current = %curr.id,
                    expected_sequence,
                    actual_sequence = curr.sequence,
                    "Audit sequence gap"
                );
                issues.push(ChainIssue::SequenceGap {
                    entry_id: curr.id.clone(),
                    expected_sequence,
                    actual_sequence: curr.sequence,
                });
            }
            let expected_previous = prev.content_hash();
            if curr.previous_hash != expected_previous {
                warn!(current = %curr.id, previous = %prev.id, "Chain link broken");
                issues.push(ChainIssue::BrokenLink {
                    entry_id: curr.id.clone(),
                    expected_previous,
                    actual_previous: curr.previous_hash,
                });
            }
        }

        Ok(ChainVerificationResult {
            valid: issues.is_empty(),
            entries_verified: entries.len(),
            issues,
        })
    }
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog")
            .field("pending_capacity", &self.pending_capacity)
            .field("dropped", &self.dropped_entries())
            .finish_non_exhaustive()
    }
}

/// Result of chain verification.
#[derive(Debug, Clone)]
pub struct ChainVerificationResult {
    /// Whether the chain is valid.
    pub valid: bool,
    /// Number of entries verified.
    pub entries_verified: usize,
    /// Issues found (empty if valid).
    pub issues: Vec<ChainIssue>,
}

/// An issue found during chain verification.
#[derive(Debug, Clone)]
pub enum ChainIssue {
    /// First entry is not sequence 0 with a zero previous hash.
    InvalidGenesis {
        /// The entry with invalid genesis.
        entry_id: AuditEntryId,
    },
    /// Chain link is broken.
    BrokenLink {
        /// The entry with broken link.
        entry_id: AuditEntryId,
        /// Expected previous hash.
        expected_previous: ContentHash,
        /// Actual previous hash in entry.
        actual_previous: ContentHash,
    },
    /// Entries are missing between two neighbours.
    SequenceGap {
        /// The entry after the gap.
        entry_id: AuditEntryId,
        /// Sequence the entry should have had.
        expected_sequence: u64,
        /// Sequence the entry has.
        actual_sequence: u64,
    },
}

impl std::fmt::Display for ChainIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidGenesis { entry_id } => {
                write!(f, "Invalid genesis at {entry_id}")
            },
            Self::BrokenLink {
                entry_id,
                expected_previous,
                actual_previous,
            } => write!(
                f,
                "Broken link at {entry_id}: expected {expected_previous:?}, got {actual_previous:?}"
            ),
            Self::SequenceGap {
                entry_id,
                expected_sequence,
                actual_sequence,
            } => write!(
                f,
                "Sequence gap at {entry_id}: expected {expected_sequence}, got {actual_sequence}"
            ),
        }
    }
}
