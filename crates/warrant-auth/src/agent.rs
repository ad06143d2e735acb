//! Agent delegation tokens.
//!
//! An agent receives its permissions from a human session or from a parent
//! agent. Each hop can only narrow what the delegator holds, appends the new
//! agent to the delegation chain, and never outlives its parent.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use warrant_core::{AccessTier, PermissionSet, ResourceAction, Timestamp};
use warrant_crypto::{SecretToken, TokenKind};

use crate::error::{DelegationError, DelegationResult};
use crate::human::{HumanIdentity, to_chrono};
use crate::registry::{IdentityRegistry, MemoryRegistry};

/// Default delegation token lifetime (five minutes).
pub const DEFAULT_AGENT_TOKEN_TTL: Duration = Duration::from_secs(300);

/// An agent acting under delegation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentIdentity {
    /// Agent identifier chosen by the delegator.
    pub agent_id: String,
    /// Free-form agent kind (e.g. `"researcher"`).
    pub agent_type: String,
    /// What the agent may do.
    pub permissions: PermissionSet,
    /// Principals from the root human down to this agent.
    pub delegation_chain: Vec<String>,
    /// Bearer token for this delegation.
    pub delegation_token: SecretToken,
    /// When the token stops being valid.
    pub token_expires_at: Timestamp,
    /// Task the agent was created for.
    pub task_id: String,
}

impl AgentIdentity {
    /// Whether the token deadline has not been reached yet.
    #[must_use]
    pub fn is_token_valid(&self) -> bool {
        !self.token_expires_at.has_elapsed()
    }

    /// The human at the root of the delegation chain.
    #[must_use]
    pub fn principal(&self) -> &str {
        self.delegation_chain.first().map_or("", String::as_str)
    }

    /// Number of delegation hops from the root human.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.delegation_chain.len().saturating_sub(1)
    }
}

/// What the delegator asks for when creating an agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegationRequest {
    /// Identifier of the new agent.
    pub agent_id: String,
    /// Free-form agent kind.
    pub agent_type: String,
    /// Task the agent is created for.
    pub task_id: String,
    /// Resources to keep. `None` keeps everything the delegator holds; an
    /// empty list keeps nothing, so `scoped_to([])` yields an agent with no
    /// grants rather than the delegator's full set.
    pub scoped_resources: Option<Vec<String>>,
}

impl DelegationRequest {
    /// Request an unscoped delegation.
    #[must_use]
    pub fn new(
        agent_id: impl Into<String>,
        agent_type: impl Into<String>,
        task_id: impl Into<String>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            agent_type: agent_type.into(),
            task_id: task_id.into(),
            scoped_resources: None,
        }
    }

    /// Narrow the delegation to `resources`.
    #[must_use]
    pub fn scoped_to<I, S>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scoped_resources = Some(resources.into_iter().map(Into::into).collect());
        self
    }

    fn narrow(&self, permissions: &PermissionSet) -> PermissionSet {
        match &self.scoped_resources {
            Some(resources) => permissions.attenuate(resources),
            None => permissions.clone(),
        }
    }
}

/// Issues, validates and revokes agent delegation tokens.
pub struct AgentAuth {
    tokens: Arc<dyn IdentityRegistry<AgentIdentity>>,
    token_ttl: chrono::Duration,
}

impl AgentAuth {
    /// Create with in-memory tokens and the default token lifetime.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tokens: Arc::new(MemoryRegistry::new()),
            token_ttl: to_chrono(DEFAULT_AGENT_TOKEN_TTL),
        }
    }

    /// Keep tokens in `tokens` instead of process memory.
    #[must_use]
    pub fn with_token_store(mut self, tokens: Arc<dyn IdentityRegistry<AgentIdentity>>) -> Self {
        self.tokens = tokens;
        self
    }

    /// Set the lifetime of new tokens.
    #[must_use]
    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = to_chrono(ttl);
        self
    }

    /// Delegate from a human session to a new agent.
    ///
    /// Without a scope the agent receives everything the human holds.
    ///
    /// # Errors
    ///
    /// Returns [`DelegationError::ExpiredSession`] if the human's session
    /// has expired and [`DelegationError::Store`] if the token store fails.
    pub async fn delegate_from_human(
        &self,
        human: &HumanIdentity,
        request: DelegationRequest,
    ) -> DelegationResult<AgentIdentity> {
        if !human.is_session_valid() {
            return Err(DelegationError::ExpiredSession {
                user_id: human.user_id.clone(),
            });
        }

        let permissions = request.narrow(&human.permissions);
        let chain = vec![human.user_id.clone(), request.agent_id.clone()];
        let expires_at = Timestamp::in_future(self.token_ttl);

        let agent = mint(request, permissions, chain, expires_at);
        self.tokens
            .put(&agent.delegation_token, agent.clone())
            .await?;
        announce(&agent);
        Ok(agent)
    }

    /// Delegate from a parent agent to a sub-agent.
    ///
    /// Scope is applied first, then `read_only`. A read-only sub-agent keeps
    /// only `read` grants and each of them becomes [`AccessTier::Free`],
    /// even where the parent's was supervised.
    ///
    /// The parent's permissions and deadline are taken from the token
    /// store, not from the caller's copy. The child is registered only if
    /// the parent is still registered at that moment, so a `revoke_task`
    /// racing this call either fails the delegation or removes both.
    ///
    /// # Errors
    ///
    /// Returns [`DelegationError::InvalidParent`] if the parent's token is
    /// expired or no longer registered, and [`DelegationError::Store`] if the
    /// token store fails.
    pub async fn delegate_from_agent(
        &self,
        parent: &AgentIdentity,
        request: DelegationRequest,
        read_only: bool,
    ) -> DelegationResult<AgentIdentity> {
        let invalid_parent = |reason: &str| DelegationError::InvalidParent {
            agent_id: parent.agent_id.clone(),
            reason: reason.to_string(),
        };

        if !parent.is_token_valid() {
            return Err(invalid_parent("token expired"));
        }
        let parent = match self.validate_token(&parent.delegation_token).await {
            Ok(registered) => registered,
            Err(DelegationError::TokenExpired { .. }) => {
                return Err(invalid_parent("token expired"));
            },
            Err(DelegationError::UnknownToken) => return Err(invalid_parent("token revoked")),
            Err(e) => return Err(e),
        };

        let mut permissions = request.narrow(&parent.permissions);
        if read_only {
            let elevated = permissions.read_only_elevations();
            if !elevated.is_empty() {
                warn!(
                    parent = %parent.agent_id,
                    agent_id = %request.agent_id,
                    resources = ?elevated,
                    "Read-only delegation grants free read where the parent's was not free"
                );
            }
            permissions = permissions.attenuate_to_read_only();
        }

        let mut chain = parent.delegation_chain.clone();
        chain.push(request.agent_id.clone());
        let expires_at = Timestamp::in_future(self.token_ttl).min(parent.token_expires_at);

        let agent = mint(request, permissions, chain, expires_at);
        let registered = self
            .tokens
            .put_if_live(
                &parent.delegation_token,
                &|current: &AgentIdentity| current.is_token_valid(),
                &agent.delegation_token,
                agent.clone(),
            )
            .await?;
        if !registered {
            let reason = if parent.is_token_valid() {
                "token revoked"
            } else {
                "token expired"
            };
            return Err(invalid_parent(reason));
        }
        announce(&agent);
        Ok(agent)
    }

    /// Resolve a delegation token, evicting it if it has expired.
    ///
    /// # Errors
    ///
    /// Returns [`DelegationError::UnknownToken`] for a token that was never
    /// issued or has been revoked, and [`DelegationError::TokenExpired`] for
    /// an expired one.
    pub async fn validate_token(&self, token: &SecretToken) -> DelegationResult<AgentIdentity> {
        let Some(agent) = self.tokens.get(token).await? else {
            return Err(DelegationError::UnknownToken);
        };

        if agent.is_token_valid() {
            return Ok(agent);
        }

        self.tokens.remove(token).await?;
        debug!(agent_id = %agent.agent_id, token = ?token, "Evicted expired agent token");
        Err(DelegationError::TokenExpired {
            agent_id: agent.agent_id,
        })
    }

    /// The tier `agent` holds for `(resource, action)`, if any.
    #[must_use]
    pub fn check_permission(
        &self,
        agent: &AgentIdentity,
        resource: &str,
        action: ResourceAction,
    ) -> Option<AccessTier> {
        agent.permissions.get_tier(resource, action)
    }

    /// Revoke one token. Revoking an unknown token is not an error.
    ///
    /// Returns the identity that was removed, if any.
    ///
    /// # Errors
    ///
    /// Returns [`DelegationError::Store`] if the token store fails.
    pub async fn revoke_token(&self, token: &SecretToken) -> DelegationResult<Option<AgentIdentity>> {
        let removed = self.tokens.remove(token).await?;
        if let Some(agent) = &removed {
            info!(agent_id = %agent.agent_id, "Agent token revoked");
        }
        Ok(removed)
    }

    /// Revoke every token issued for `task_id` in one sweep.
    ///
    /// Once this returns, none of those tokens validates. Returns how many
    /// were removed.
    ///
    /// # Errors
    ///
    /// Returns [`DelegationError::Store`] if the token store fails.
    pub async fn revoke_task(&self, task_id: &str) -> DelegationResult<usize> {
        let removed = self
            .tokens
            .remove_where(&|agent: &AgentIdentity| agent.task_id == task_id)
            .await?;
        info!(task_id, count = removed.len(), "Task tokens revoked");
        Ok(removed.len())
    }

    /// Remove every expired token. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`DelegationError::Store`] if the token store fails.
    pub async fn purge_expired(&self) -> DelegationResult<usize> {
        let removed = self
            .tokens
            .remove_where(&|agent: &AgentIdentity| !agent.is_token_valid())
            .await?;
        if !removed.is_empty() {
            debug!(count = removed.len(), "Purged expired agent tokens");
        }
        Ok(removed.len())
    }

    /// Number of registered tokens, including expired ones not yet evicted.
    ///
    /// # Errors
    ///
    /// Returns [`DelegationError::Store`] if the token store fails.
    pub async fn active_tokens(&self) -> DelegationResult<usize> {
        Ok(self.tokens.len().await?)
    }
}

fn mint(
    request: DelegationRequest,
    permissions: PermissionSet,
    delegation_chain: Vec<String>,
    token_expires_at: Timestamp,
) -> AgentIdentity {
    AgentIdentity {
        agent_id: request.agent_id,
        agent_type: request.agent_type,
        permissions,
        delegation_chain,
        delegation_token: SecretToken::generate(TokenKind::Agent),
        token_expires_at,
        task_id: request.task_id,
    }
}

fn announce(agent: &AgentIdentity) {
    info!(
        agent_id = %agent.agent_id,
        task_id = %agent.task_id,
        depth = agent.depth(),
        grants = agent.permissions.len(),
        token = ?agent.delegation_token,
        "Agent delegated"
    );
}

impl Default for AgentAuth {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AgentAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentAuth")
            .field("token_ttl", &self.token_ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warrant_core::{ActionDecision, Role};
    use warrant_storage::StorageResult;

    use crate::registry::Predicate;

    fn human(ttl: chrono::Duration) -> HumanIdentity {
        HumanIdentity {
            user_id: "usr-alice-001".into(),
            email: "alice@example.com".into(),
            role: Role::Admin,
            permissions: Role::Admin.preset(),
            session_token: SecretToken::generate(TokenKind::Session),
            session_expires_at: Timestamp::in_future(ttl),
        }
    }

    fn alice() -> HumanIdentity {
        human(chrono::Duration::hours(1))
    }

    #[tokio::test]
    async fn test_delegate_from_human_scoped() {
        let auth = AgentAuth::new();
        let agent = auth
            .delegate_from_human(
                &alice(),
                DelegationRequest::new("agent-x", "researcher", "task-1").scoped_to(["documents"]),
            )
            .await
            .unwrap();

        assert_eq!(agent.delegation_chain, vec!["usr-alice-001", "agent-x"]);
        assert_eq!(agent.principal(), "usr-alice-001");
        assert_eq!(agent.depth(), 1);
        assert_eq!(agent.permissions.resources(), vec!["documents"]);
        assert_eq!(agent.delegation_token.kind(), Some(TokenKind::Agent));
        assert!(agent.permissions.is_attenuation_of(&alice().permissions));
    }

    #[tokio::test]
    async fn test_unscoped_delegation_grants_everything() {
        let auth = AgentAuth::new();
        let human = alice();
        let agent = auth
            .delegate_from_human(&human, DelegationRequest::new("agent-x", "general", "task-1"))
            .await
            .unwrap();
        assert_eq!(agent.permissions, human.permissions);
    }

    #[tokio::test]
    async fn test_expired_human_cannot_delegate() {
        let auth = AgentAuth::new();
        let err = auth
            .delegate_from_human(
                &human(chrono::Duration::seconds(-1)),
                DelegationRequest::new("agent-x", "researcher", "task-1"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DelegationError::ExpiredSession { .. }));
        assert_eq!(auth.active_tokens().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_subdelegation_read_only() {
        let auth = AgentAuth::new();
        let x = auth
            .delegate_from_human(
                &alice(),
                DelegationRequest::new("agent-x", "researcher", "task-1").scoped_to(["documents"]),
            )
            .await
            .unwrap();
        let y = auth
            .delegate_from_agent(&x, DelegationRequest::new("agent-y", "reader", "task-1"), true)
            .await
            .unwrap();

        assert_eq!(y.delegation_chain, vec!["usr-alice-001", "agent-x", "agent-y"]);
        assert!(y.token_expires_at <= x.token_expires_at);
        assert_eq!(
            ActionDecision::from_tier(auth.check_permission(&y, "documents", ResourceAction::Read)),
            ActionDecision::Allowed
        );
        assert_eq!(
            auth.check_permission(&y, "documents", ResourceAction::Update),
            None
        );
    }

    #[tokio::test]
    async fn test_read_only_applies_after_scope() {
        let auth = AgentAuth::new();
        let x = auth
            .delegate_from_human(&alice(), DelegationRequest::new("agent-x", "general", "task-1"))
            .await
            .unwrap();
        let y = auth
            .delegate_from_agent(
                &x,
                DelegationRequest::new("agent-y", "reader", "task-1").scoped_to(["billing"]),
                true,
            )
            .await
            .unwrap();

        assert_eq!(y.permissions.len(), 1);
        assert!(y.permissions.is_allowed("billing", ResourceAction::Read));
    }

    #[tokio::test]
    async fn test_child_never_outlives_parent() {
        let short = AgentAuth::new().with_token_ttl(Duration::from_secs(10));
        let x = short
            .delegate_from_human(&alice(), DelegationRequest::new("agent-x", "general", "task-1"))
            .await
            .unwrap();

        // Same registry, longer default lifetime for children.
        let long = AgentAuth {
            tokens: Arc::clone(&short.tokens),
            token_ttl: chrono::Duration::hours(1),
        };
        let y = long
            .delegate_from_agent(&x, DelegationRequest::new("agent-y", "general", "task-1"), false)
            .await
            .unwrap();
        assert_eq!(y.token_expires_at, x.token_expires_at);
    }

    #[tokio::test]
    async fn test_revoked_parent_cannot_delegate() {
        let auth = AgentAuth::new();
        let x = auth
            .delegate_from_human(&alice(), DelegationRequest::new("agent-x", "general", "task-1"))
            .await
            .unwrap();
        auth.revoke_token(&x.delegation_token).await.unwrap();

        let err = auth
            .delegate_from_agent(&x, DelegationRequest::new("agent-y", "general", "task-1"), false)
            .await
            .unwrap_err();
        assert!(matches!(err, DelegationError::InvalidParent { ref reason, .. } if reason == "token revoked"));
    }

    /// Revokes a task right after the next token lookup, landing between a
    /// sub-delegation's parent check and the child's registration.
    #[derive(Default)]
    struct RevokeAfterLookup {
        inner: MemoryRegistry<AgentIdentity>,
        armed: std::sync::Mutex<Option<String>>,
    }

    impl RevokeAfterLookup {
        fn arm(&self, task_id: &str) {
            *self.armed.lock().unwrap() = Some(task_id.to_string());
        }
    }

    #[async_trait::async_trait]
    impl IdentityRegistry<AgentIdentity> for RevokeAfterLookup {
        async fn get(&self, token: &SecretToken) -> StorageResult<Option<AgentIdentity>> {
            let found = self.inner.get(token).await?;
            let task = self.armed.lock().unwrap().take();
            if let Some(task) = task {
                self.inner
                    .remove_where(&|agent: &AgentIdentity| agent.task_id == task)
                    .await?;
            }
            Ok(found)
        }

        async fn put(&self, token: &SecretToken, identity: AgentIdentity) -> StorageResult<()> {
            self.inner.put(token, identity).await
        }

        async fn put_if_live(
            &self,
            anchor: &SecretToken,
            live: Predicate<'_, AgentIdentity>,
            token: &SecretToken,
            identity: AgentIdentity,
        ) -> StorageResult<bool> {
            self.inner.put_if_live(anchor, live, token, identity).await
        }

        async fn remove(&self, token: &SecretToken) -> StorageResult<Option<AgentIdentity>> {
            self.inner.remove(token).await
        }

        async fn remove_where(
            &self,
            predicate: Predicate<'_, AgentIdentity>,
        ) -> StorageResult<Vec<AgentIdentity>> {
            self.inner.remove_where(predicate).await
        }

        async fn len(&self) -> StorageResult<usize> {
            self.inner.len().await
        }
    }

    #[tokio::test]
    async fn test_task_revoked_mid_delegation_leaves_no_child() {
        let registry = Arc::new(RevokeAfterLookup::default());
        let auth = AgentAuth::new().with_token_store(Arc::clone(&registry) as _);
        let x = auth
            .delegate_from_human(&alice(), DelegationRequest::new("agent-x", "general", "task-1"))
            .await
            .unwrap();

        registry.arm("task-1");
        let err = auth
            .delegate_from_agent(&x, DelegationRequest::new("agent-y", "general", "task-1"), false)
            .await
            .unwrap_err();

        assert!(matches!(err, DelegationError::InvalidParent { ref reason, .. } if reason == "token revoked"));
        assert!(auth.validate_token(&x.delegation_token).await.is_err());
        assert_eq!(auth.active_tokens().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_empty_scope_grants_nothing() {
        let auth = AgentAuth::new();
        let agent = auth
            .delegate_from_human(
                &alice(),
                DelegationRequest::new("agent-x", "general", "task-1").scoped_to(Vec::<String>::new()),
            )
            .await
            .unwrap();
        assert!(agent.permissions.is_empty());
    }

    #[tokio::test]
    async fn test_forged_parent_permissions_are_ignored() {
        let auth = AgentAuth::new();
        let x = auth
            .delegate_from_human(
                &alice(),
                DelegationRequest::new("agent-x", "researcher", "task-1").scoped_to(["documents"]),
            )
            .await
            .unwrap();

        let mut forged = x.clone();
        forged.permissions = x
            .permissions
            .clone()
            .grant("billing", ResourceAction::Update, AccessTier::Free);

        let y = auth
            .delegate_from_agent(&forged, DelegationRequest::new("agent-y", "general", "task-1"), false)
            .await
            .unwrap();
        assert!(!y.permissions.has("billing", ResourceAction::Update));
        assert!(y.permissions.is_attenuation_of(&x.permissions));
    }

    #[tokio::test]
    async fn test_validate_and_expire_token() {
        let auth = AgentAuth::new().with_token_ttl(Duration::ZERO);
        let x = auth
            .delegate_from_human(&alice(), DelegationRequest::new("agent-x", "general", "task-1"))
            .await
            .unwrap();

        let err = auth.validate_token(&x.delegation_token).await.unwrap_err();
        assert_eq!(
            err,
            DelegationError::TokenExpired {
                agent_id: "agent-x".into()
            }
        );
        let err = auth.validate_token(&x.delegation_token).await.unwrap_err();
        assert_eq!(err, DelegationError::UnknownToken);
    }

    #[tokio::test]
    async fn test_revoke_task_only_touches_that_task() {
        let auth = AgentAuth::new();
        let human = alice();
        let a = auth
            .delegate_from_human(&human, DelegationRequest::new("agent-a", "general", "task-1"))
            .await
            .unwrap();
        let b = auth
            .delegate_from_agent(&a, DelegationRequest::new("agent-b", "general", "task-1"), false)
            .await
            .unwrap();
        let c = auth
            .delegate_from_human(&human, DelegationRequest::new("agent-c", "general", "task-2"))
            .await
            .unwrap();

        assert_eq!(auth.revoke_task("task-1").await.unwrap(), 2);
        assert!(auth.validate_token(&a.delegation_token).await.is_err());
        assert!(auth.validate_token(&b.delegation_token).await.is_err());
        assert!(auth.validate_token(&c.delegation_token).await.is_ok());

        // Prefix of another task id does not match.
        assert_eq!(auth.revoke_task("task").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_revoke_token_is_idempotent() {
        let auth = AgentAuth::new();
        let x = auth
            .delegate_from_human(&alice(), DelegationRequest::new("agent-x", "general", "task-1"))
            .await
            .unwrap();

        assert!(auth.revoke_token(&x.delegation_token).await.unwrap().is_some());
        assert!(auth.revoke_token(&x.delegation_token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let expiring = AgentAuth::new().with_token_ttl(Duration::ZERO);
        expiring
            .delegate_from_human(&alice(), DelegationRequest::new("agent-x", "general", "task-1"))
            .await
            .unwrap();
        let lasting = AgentAuth {
            tokens: Arc::clone(&expiring.tokens),
            token_ttl: chrono::Duration::hours(1),
        };
        lasting
            .delegate_from_human(&alice(), DelegationRequest::new("agent-y", "general", "task-1"))
            .await
            .unwrap();

        assert_eq!(lasting.purge_expired().await.unwrap(), 1);
        assert_eq!(lasting.active_tokens().await.unwrap(), 1);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use warrant_core::Role;

    fn arb_role() -> impl Strategy<Value = Role> {
        prop::sample::select(Role::ALL.to_vec())
    }

    fn arb_scope() -> impl Strategy<Value = Option<Vec<&'static str>>> {
        prop::option::of(prop::sample::subsequence(
            vec!["users", "documents", "analytics", "billing", "unknown"],
            0..=5,
        ))
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
    }

    proptest! {
        #[test]
        fn delegation_never_escalates(
            role in arb_role(),
            first in arb_scope(),
            second in arb_scope(),
            read_only in any::<bool>(),
        ) {
            let human = HumanIdentity {
                user_id: "usr-1".into(),
                email: "u@example.com".into(),
                role,
                permissions: role.preset(),
                session_token: SecretToken::generate(TokenKind::Session),
                session_expires_at: Timestamp::in_future(chrono::Duration::hours(1)),
            };
            let auth = AgentAuth::new();

            let (parent, child) = runtime().block_on(async {
                let mut request = DelegationRequest::new("agent-a", "general", "task");
                if let Some(scope) = &first {
                    request = request.scoped_to(scope.iter().copied());
                }
                let parent = auth.delegate_from_human(&human, request).await.unwrap();

                let mut request = DelegationRequest::new("agent-b", "general", "task");
                if let Some(scope) = &second {
                    request = request.scoped_to(scope.iter().copied());
                }
                let child = auth.delegate_from_agent(&parent, request, read_only).await.unwrap();
                (parent, child)
            });

            prop_assert!(parent.permissions.is_attenuation_of(&human.permissions));
            if !read_only {
                prop_assert!(child.permissions.is_attenuation_of(&parent.permissions));
            }
            // Read-only may loosen a read tier, but never adds a grant.
            for (resource, action, _) in child.permissions.iter() {
                prop_assert!(parent.permissions.has(resource, action));
            }
            prop_assert_eq!(child.delegation_chain.len(), 3);
            prop_assert!(child.token_expires_at <= parent.token_expires_at);
        }
    }
}
