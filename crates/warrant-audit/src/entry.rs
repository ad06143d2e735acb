//! Audit entry types.
//!
//! Every login, delegation, permission check and revocation becomes one
//! [`AuditEntry`]. Entries are sealed by the [`AuditLog`](crate::AuditLog):
//! it assigns the sequence number and links each entry to the hash of the
//! entry before it.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;
use warrant_core::{ActionDecision, Timestamp};
use warrant_crypto::ContentHash;

use crate::error::{AuditError, AuditResult};

/// Unique identifier for an audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuditEntryId(pub Uuid);

impl AuditEntryId {
    /// Create a new audit entry ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AuditEntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AuditEntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "audit:{}", &self.0.simple().to_string()[..8])
    }
}

/// Kind of principal that performed an audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorType {
    /// A human user.
    Human,
    /// An AI agent acting under delegation.
    Agent,
    /// The auth kernel itself.
    System,
}

impl fmt::Display for ActorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Human => "human",
            Self::Agent => "agent",
            Self::System => "system",
        })
    }
}

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditEventType {
    /// A human logged in.
    #[serde(rename = "human.login")]
    HumanLogin,
    /// A human logged out.
    #[serde(rename = "human.logout")]
    HumanLogout,
    /// A login attempt failed.
    #[serde(rename = "human.login_failed")]
    HumanLoginFailed,
    /// A human delegated to an agent.
    #[serde(rename = "agent.delegated")]
    AgentDelegated,
    /// An agent delegated to a sub-agent.
    #[serde(rename = "agent.subdelegated")]
    AgentSubdelegated,
    /// A delegation attempt was refused.
    #[serde(rename = "agent.delegation_denied")]
    AgentDelegationDenied,
    /// A permission check that did not deny.
    #[serde(rename = "permission.check")]
    PermissionCheck,
    /// A permission check that denied.
    #[serde(rename = "permission.denied")]
    PermissionDenied,
    /// A single agent token was revoked.
    #[serde(rename = "token.revoked")]
    TokenRevoked,
    /// Every token of a task was revoked.
    #[serde(rename = "task.revoked")]
    TaskRevoked,
    /// A human session was found expired and evicted.
    #[serde(rename = "session.expired")]
    SessionExpired,
}

impl AuditEventType {
    /// Wire name of the event type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HumanLogin => "human.login",
            Self::HumanLogout => "human.logout",
            Self::HumanLoginFailed => "human.login_failed",
            Self::AgentDelegated => "agent.delegated",
            Self::AgentSubdelegated => "agent.subdelegated",
            Self::AgentDelegationDenied => "agent.delegation_denied",
            Self::PermissionCheck => "permission.check",
            Self::PermissionDenied => "permission.denied",
            Self::TokenRevoked => "token.revoked",
            Self::TaskRevoked => "task.revoked",
            Self::SessionExpired => "session.expired",
        }
    }
}

impl fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event waiting to be sealed into the log.
///
/// Built by the `log_*` helpers on [`AuditLog`](crate::AuditLog) or directly
/// by callers that need a custom record.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEvent {
    /// What happened.
    pub event_type: AuditEventType,
    /// Who did it.
    pub actor_id: String,
    /// What kind of principal did it.
    pub actor_type: ActorType,
    /// Resource involved, empty if none.
    pub resource: String,
    /// Action involved, empty if none.
    pub action: String,
    /// Decision, for permission checks.
    pub result: Option<ActionDecision>,
    /// Provenance from the root human to the acting agent.
    pub delegation_chain: Vec<String>,
    /// Task the actor was working on.
    pub task_id: Option<String>,
    /// Free-form event details.
    pub details: Map<String, Value>,
}

impl AuditEvent {
    /// Start an event with no resource, result, chain or details.
    #[must_use]
    pub fn new(event_type: AuditEventType, actor_id: impl Into<String>, actor_type: ActorType) -> Self {
        Self {
            event_type,
            actor_id: actor_id.into(),
            actor_type,
            resource: String::new(),
            action: String::new(),
            result: None,
            delegation_chain: Vec::new(),
            task_id: None,
            details: Map::new(),
        }
    }

    /// Set the resource and action.
    #[must_use]
    pub fn target(mut self, resource: impl Into<String>, action: impl Into<String>) -> Self {
        self.resource = resource.into();
        self.action = action.into();
        self
    }

    /// Set the decision.
    #[must_use]
    pub fn result(mut self, result: ActionDecision) -> Self {
        self.result = Some(result);
        self
    }

    /// Set the delegation chain.
    #[must_use]
    pub fn chain(mut self, chain: &[String]) -> Self {
        self.delegation_chain = chain.to_vec();
        self
    }

    /// Set the task.
    #[must_use]
    pub fn task(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    /// Add a detail field.
    #[must_use]
    pub fn detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

/// A sealed, immutable audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unique entry identifier.
    pub id: AuditEntryId,
    /// Position in the log, starting at 0.
    pub sequence: u64,
    /// When the entry was sealed.
    pub timestamp: Timestamp,
    /// What happened.
    pub event_type: AuditEventType,
    /// Who did it.
    pub actor_id: String,
    /// What kind of principal did it.
    pub actor_type: ActorType,
    /// Resource involved, empty if none.
    #[serde(default)]
    pub resource: String,
    /// Action involved, empty if none.
    #[serde(default)]
    pub action: String,
    /// Decision; serialized as `""` when absent.
    #[serde(
        default,
        serialize_with = "serialize_result",
        deserialize_with = "deserialize_result"
    )]
    pub result: Option<ActionDecision>,
    /// Provenance from the root human to the acting agent.
    #[serde(default)]
    pub delegation_chain: Vec<String>,
    /// Task the actor was working on.
    #[serde(default)]
    pub task_id: Option<String>,
    /// Free-form event details.
    #[serde(default)]
    pub details: Map<String, Value>,
    /// Link hash of the previous entry (zero for the first entry).
    pub previous_hash: ContentHash,
}

impl AuditEntry {
    /// Seal an event at `sequence`, linked to `previous_hash`.
    #[must_use]
    pub fn seal(event: AuditEvent, sequence: u64, previous_hash: ContentHash) -> Self {
        Self {
            id: AuditEntryId::new(),
            sequence,
            timestamp: Timestamp::now(),
            event_type: event.event_type,
            actor_id: event.actor_id,
            actor_type: event.actor_type,
            resource: event.resource,
            action: event.action,
            result: event.result,
            delegation_chain: event.delegation_chain,
            task_id: event.task_id,
            details: event.details,
            previous_hash,
        }
    }

    /// Canonical bytes hashed into the chain.
    ///
    /// JSON of the whole entry; `details` is a sorted map so the encoding
    /// is stable.
    #[must_use]
    pub fn canonical_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }

    /// Link hash of this entry; the next entry stores it as `previous_hash`.
    #[must_use]
    pub fn content_hash(&self) -> ContentHash {
        ContentHash::link(&self.previous_hash, &self.canonical_bytes())
    }

    /// Check whether this entry directly follows `previous` in the chain.
    #[must_use]
    pub fn follows(&self, previous: &Self) -> bool {
        self.previous_hash == previous.content_hash()
            && previous.sequence.checked_add(1) == Some(self.sequence)
    }

    /// Whether `principal_id` is the actor or appears anywhere in the chain.
    #[must_use]
    pub fn involves(&self, principal_id: &str) -> bool {
        self.actor_id == principal_id || self.delegation_chain.iter().any(|p| p == principal_id)
    }

    /// Serialize the entry as a JSON line for log shipping.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::SerializationError`] if a detail value cannot
    /// be encoded.
    pub fn to_json(&self) -> AuditResult<String> {
        serde_json::to_string(self).map_err(|e| AuditError::SerializationError(e.to_string()))
    }
}

fn serialize_result<S: Serializer>(
    result: &Option<ActionDecision>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(result.map_or("", ActionDecision::as_str))
}

fn deserialize_result<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<ActionDecision>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    match raw.as_str() {
        "" => Ok(None),
        "allowed" => Ok(Some(ActionDecision::Allowed)),
        "supervised" => Ok(Some(ActionDecision::Supervised)),
        "denied" => Ok(Some(ActionDecision::Denied)),
        other => Err(serde::de::Error::custom(format!(
            "unknown decision '{other}'"
        ))),
    }
}
