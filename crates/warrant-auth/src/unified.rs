//! The unified auth facade.
//!
//! [`UnifiedAuth`] is the single call surface for hosts. Every call writes
//! exactly one audit entry, and only after the state change it describes
//! has succeeded.

use std::sync::Arc;

use tracing::{debug, info, warn};
use warrant_audit::{
    ActorType, AuditEvent, AuditEventType, AuditLog, AuditStorage, DelegationRecord,
};
use warrant_config::Config;
use warrant_core::{ActionDecision, ResourceAction};
use warrant_crypto::SecretToken;
use warrant_storage::KvStore;

use crate::agent::{AgentAuth, AgentIdentity, DelegationRequest};
use crate::bridge::AuthPolicy;
use crate::error::{AuthResult, AuthenticationError, DelegationError, DelegationResult, SetupError};
use crate::human::{CredentialStore, HumanAuth, HumanIdentity, StaticCredentialStore};
use crate::registry::KvRegistry;

/// Namespace for human sessions in a shared store.
const NS_SESSIONS: &str = "auth:sessions";

/// Namespace for agent tokens in a shared store.
const NS_AGENTS: &str = "auth:agents";

/// Login, delegation, permission checks and revocation behind one audited
/// surface.
#[derive(Debug)]
pub struct UnifiedAuth {
    humans: HumanAuth,
    agents: AgentAuth,
    audit: Arc<AuditLog>,
}

impl UnifiedAuth {
    /// Compose the facade from its parts.
    #[must_use]
    pub fn new(humans: HumanAuth, agents: AgentAuth, audit: Arc<AuditLog>) -> Self {
        Self {
            humans,
            agents,
            audit,
        }
    }

    /// In-memory sessions, tokens and audit log with default lifetimes and
    /// the preset role table.
    #[must_use]
    pub fn in_memory(credentials: Arc<dyn CredentialStore>) -> Self {
        Self::new(
            HumanAuth::new(credentials),
            AgentAuth::new(),
            Arc::new(AuditLog::in_memory()),
        )
    }

    /// Build from loaded configuration, keeping all state in memory.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError`] if a role grant or principal digest does not
    /// parse.
    pub fn from_config(config: &Config) -> Result<Self, SetupError> {
        let policy = AuthPolicy::from_config(config)?;
        let credentials = StaticCredentialStore::from_config(config)?;
        let audit = AuditLog::in_memory().with_pending_capacity(policy.audit_pending_capacity);

        Ok(Self::new(
            policy.human_auth(Arc::new(credentials)),
            policy.agent_auth(),
            Arc::new(audit),
        ))
    }

    /// Build from loaded configuration, keeping sessions and tokens in
    /// `state` and audit entries in `audit_storage`.
    ///
    /// Several instances may share `state`, so a revocation on one is seen
    /// by all. An audit chain has a single writer: give each instance its
    /// own `audit_storage`. The audit log resumes whatever chain
    /// `audit_storage` already holds.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError`] if the configuration does not convert or the
    /// existing audit chain cannot be read.
    pub async fn from_config_with_stores(
        config: &Config,
        state: Arc<dyn KvStore>,
        audit_storage: Arc<dyn AuditStorage>,
    ) -> Result<Self, SetupError> {
        let policy = AuthPolicy::from_config(config)?;
        let credentials = StaticCredentialStore::from_config(config)?;

        let sessions = KvRegistry::new(Arc::clone(&state), NS_SESSIONS)
            .map_err(|e| SetupError::Store(e.to_string()))?;
        let tokens =
            KvRegistry::new(state, NS_AGENTS).map_err(|e| SetupError::Store(e.to_string()))?;
        let audit = AuditLog::resume(audit_storage)
            .await
            .map_err(|e| SetupError::Store(e.to_string()))?
            .with_pending_capacity(policy.audit_pending_capacity);

        Ok(Self::new(
            policy
                .human_auth(Arc::new(credentials))
                .with_session_store(Arc::new(sessions)),
            policy.agent_auth().with_token_store(Arc::new(tokens)),
            Arc::new(audit),
        ))
    }

    /// The human authenticator.
    #[must_use]
    pub fn humans(&self) -> &HumanAuth {
        &self.humans
    }

    /// The agent authenticator.
    #[must_use]
    pub fn agents(&self) -> &AgentAuth {
        &self.agents
    }

    /// The audit log every call writes to.
    #[must_use]
    pub fn audit_log(&self) -> &AuditLog {
        &self.audit
    }

    /// A shared handle to the audit log.
    #[must_use]
    pub fn audit_handle(&self) -> Arc<AuditLog> {
        Arc::clone(&self.audit)
    }

    /// Log a human in. Failures are audited as `human.login_failed`.
    ///
    /// # Errors
    ///
    /// See [`HumanAuth::login`].
    pub async fn login(&self, email: &str, password: &str) -> AuthResult<HumanIdentity> {
        match self.humans.login(email, password).await {
            Ok(human) => {
                self.audit.log_human_login(&human.user_id, &human.email).await;
                Ok(human)
            },
            Err(e) => {
                warn!(error = %e, "Login failed");
                self.audit
                    .log_human_login_failed(email, login_failure_reason(&e))
                    .await;
                Err(e)
            },
        }
    }

    /// Resolve a session token. Evicting an expired session is audited as
    /// `session.expired`.
    ///
    /// # Errors
    ///
    /// See [`HumanAuth::validate_session`].
    pub async fn validate_session(&self, token: &SecretToken) -> AuthResult<HumanIdentity> {
        let result = self.humans.validate_session(token).await;
        if let Err(AuthenticationError::SessionExpired { user_id }) = &result {
            self.audit.log_session_expired(user_id).await;
        }
        result
    }

    /// End a human's session.
    ///
    /// # Errors
    ///
    /// Returns [`AuthenticationError::Store`] if the session store fails.
    pub async fn logout(&self, human: &HumanIdentity) -> AuthResult<()> {
        self.humans.logout(&human.session_token).await?;
        self.audit.log_human_logout(&human.user_id).await;
        Ok(())
    }

    /// Delegate from a human to a new agent.
    ///
    /// Besides the deadline on `human`, the session must still be in the
    /// session store, so a logged-out human cannot delegate. The session is
    /// checked again once the token is registered; if a logout landed in
    /// between, the token is withdrawn and the call fails. Refusals are
    /// audited as `agent.delegation_denied`, including one caused by an
    /// expired session this call evicts: no separate `session.expired`
    /// entry is written for it.
    ///
    /// # Errors
    ///
    /// Returns [`DelegationError::ExpiredSession`] or
    /// [`DelegationError::SessionNotActive`] for a dead session, and
    /// [`DelegationError::Store`] if a store fails.
    pub async fn delegate_to_agent(
        &self,
        human: &HumanIdentity,
        request: DelegationRequest,
    ) -> DelegationResult<AgentIdentity> {
        let agent_id = request.agent_id.clone();
        let task_id = request.task_id.clone();
        let scope = request.scoped_resources.clone();

        let result = match self.live_session(human).await {
            Ok(live) => self.delegate_while_live(&live, request).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(agent) => {
                self.audit
                    .log_delegation(&DelegationRecord {
                        agent_id: &agent.agent_id,
                        agent_type: &agent.agent_type,
                        delegation_chain: &agent.delegation_chain,
                        task_id: &agent.task_id,
                        scoped_resources: scope.as_deref(),
                        read_only: false,
                    })
                    .await;
                Ok(agent)
            },
            Err(e) => {
                warn!(user_id = %human.user_id, %agent_id, error = %e, "Delegation refused");
                self.audit
                    .log_delegation_denied(
                        &human.user_id,
                        ActorType::Human,
                        &agent_id,
                        &task_id,
                        &e.to_string(),
                    )
                    .await;
                Err(e)
            },
        }
    }

    /// Register a delegation from `live`, then confirm the session outlived
    /// the registration.
    async fn delegate_while_live(
        &self,
        live: &HumanIdentity,
        request: DelegationRequest,
    ) -> DelegationResult<AgentIdentity> {
        let agent = self.agents.delegate_from_human(live, request).await?;
        if let Err(e) = self.live_session(live).await {
            self.agents.revoke_token(&agent.delegation_token).await?;
            debug!(user_id = %live.user_id, agent_id = %agent.agent_id, "Withdrew delegation from ended session");
            return Err(e);
        }
        Ok(agent)
    }

    /// The stored session behind `human`, if it is still alive.
    ///
    /// A stored session found expired is evicted without a `session.expired`
    /// entry; the caller records the refusal instead.
    async fn live_session(&self, human: &HumanIdentity) -> DelegationResult<HumanIdentity> {
        let expired = || DelegationError::ExpiredSession {
            user_id: human.user_id.clone(),
        };
        let not_active = || DelegationError::SessionNotActive {
            user_id: human.user_id.clone(),
        };

        if !human.is_session_valid() {
            return Err(expired());
        }
        match self.humans.validate_session(&human.session_token).await {
            Ok(live) if live.user_id == human.user_id => Ok(live),
            Ok(_) | Err(AuthenticationError::InvalidSession) => Err(not_active()),
            Err(AuthenticationError::SessionExpired { .. }) => Err(expired()),
            Err(e) => Err(DelegationError::Store(e.to_string())),
        }
    }

    /// Delegate from an agent to a sub-agent. Refusals are audited as
    /// `agent.delegation_denied`.
    ///
    /// # Errors
    ///
    /// See [`AgentAuth::delegate_from_agent`].
    pub async fn delegate_to_sub_agent(
        &self,
        parent: &AgentIdentity,
        request: DelegationRequest,
        read_only: bool,
    ) -> DelegationResult<AgentIdentity> {
        let agent_id = request.agent_id.clone();
        let task_id = request.task_id.clone();
        let scope = request.scoped_resources.clone();

        match self.agents.delegate_from_agent(parent, request, read_only).await {
            Ok(agent) => {
                self.audit
                    .log_delegation(&DelegationRecord {
                        agent_id: &agent.agent_id,
                        agent_type: &agent.agent_type,
                        delegation_chain: &agent.delegation_chain,
                        task_id: &agent.task_id,
                        scoped_resources: scope.as_deref(),
                        read_only,
                    })
                    .await;
                Ok(agent)
            },
            Err(e) => {
                warn!(parent = %parent.agent_id, %agent_id, error = %e, "Sub-delegation refused");
                self.audit
                    .log_delegation_denied(
                        &parent.agent_id,
                        ActorType::Agent,
                        &agent_id,
                        &task_id,
                        &e.to_string(),
                    )
                    .await;
                Err(e)
            },
        }
    }

    /// Decide whether `agent` may perform `action` on `resource`.
    ///
    /// Works on the identity as given; use [`Self::authorize`] to resolve a
    /// presented token first. Every decision is audited, denials as
    /// `permission.denied`.
    pub async fn check_agent_action(
        &self,
        agent: &AgentIdentity,
        resource: &str,
        action: ResourceAction,
    ) -> ActionDecision {
        let tier = self.agents.check_permission(agent, resource, action);
        let decision = ActionDecision::from_tier(tier);

        if decision == ActionDecision::Denied {
            warn!(agent_id = %agent.agent_id, resource, %action, "Agent action denied");
        } else {
            debug!(agent_id = %agent.agent_id, resource, %action, %decision, "Agent action checked");
        }

        self.audit
            .log_permission_check(
                &agent.agent_id,
                resource,
                action,
                decision,
                &agent.delegation_chain,
                Some(&agent.task_id),
            )
            .await;
        decision
    }

    /// Resolve a presented delegation token and check the action against
    /// the registered identity.
    ///
    /// An unknown, revoked or expired token is denied and audited as
    /// `permission.denied` with the reason in the entry's details.
    pub async fn authorize(
        &self,
        token: &SecretToken,
        resource: &str,
        action: ResourceAction,
    ) -> ActionDecision {
        match self.agents.validate_token(token).await {
            Ok(agent) => self.check_agent_action(&agent, resource, action).await,
            Err(e) => {
                let actor_id = match &e {
                    DelegationError::TokenExpired { agent_id } => agent_id.as_str(),
                    _ => "unknown",
                };
                warn!(token = ?token, error = %e, resource, %action, "Unauthorized token presented");
                self.audit
                    .record(
                        AuditEvent::new(AuditEventType::PermissionDenied, actor_id, ActorType::Agent)
                            .target(resource, action.as_str())
                            .result(ActionDecision::Denied)
                            .detail("reason", e.to_string())
                            .detail("token", token.fingerprint()),
                    )
                    .await;
                ActionDecision::Denied
            },
        }
    }

    /// Revoke one agent's token.
    ///
    /// # Errors
    ///
    /// Returns [`DelegationError::Store`] if the token store fails.
    pub async fn revoke_agent(
        &self,
        agent: &AgentIdentity,
        reason: Option<&str>,
    ) -> DelegationResult<()> {
        self.agents.revoke_token(&agent.delegation_token).await?;
        self.audit
            .log_token_revoked(&agent.agent_id, reason.unwrap_or("revoked"))
            .await;
        Ok(())
    }

    /// Revoke every token issued for `task_id`. Returns how many were
    /// removed.
    ///
    /// # Errors
    ///
    /// Returns [`DelegationError::Store`] if the token store fails.
    pub async fn revoke_task(&self, task_id: &str) -> DelegationResult<usize> {
        let count = self.agents.revoke_task(task_id).await?;
        self.audit.log_task_revoked(task_id, count).await;
        info!(task_id, count, "Task revoked");
        Ok(count)
    }
}

fn login_failure_reason(error: &AuthenticationError) -> &'static str {
    match error {
        AuthenticationError::InvalidCredentials => "invalid_credentials",
        AuthenticationError::AccountDeactivated { .. } => "account_deactivated",
        AuthenticationError::InvalidSession | AuthenticationError::SessionExpired { .. } => {
            "invalid_session"
        },
        AuthenticationError::Store(_) => "store_unavailable",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warrant_audit::AuditQuery;
    use warrant_core::Role;

    use std::sync::atomic::{AtomicBool, Ordering};
    use warrant_core::Timestamp;
    use warrant_storage::StorageResult;

    use crate::human::Principal;
    use crate::registry::{IdentityRegistry, MemoryRegistry, Predicate};

    const PASSWORD: &str = "correct horse";

    fn auth() -> UnifiedAuth {
        let store = StaticCredentialStore::new()
            .with_principal(Principal::new(
                "usr-alice-001",
                "alice@example.com",
                PASSWORD,
                Role::Admin,
            ))
            .with_principal(
                Principal::new("usr-dave-004", "dave@example.com", PASSWORD, Role::Viewer)
                    .deactivated(),
            );
        UnifiedAuth::in_memory(Arc::new(store))
    }

    async fn count(auth: &UnifiedAuth) -> usize {
        auth.audit_log().total_entries().await.unwrap()
    }

    #[tokio::test]
    async fn test_login_is_audited() {
        let auth = auth();
        let human = auth.login("alice@example.com", PASSWORD).await.unwrap();

        let entries = auth.audit_log().entries().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].event_type, AuditEventType::HumanLogin);
        assert_eq!(entries[0].actor_id, human.user_id);
    }

    #[tokio::test]
    async fn test_failed_logins_are_audited() {
        let auth = auth();
        assert!(auth.login("alice@example.com", "nope").await.is_err());
        assert!(auth.login("dave@example.com", PASSWORD).await.is_err());

        let failed = auth
            .audit_log()
            .query(&AuditQuery::new().event_type(AuditEventType::HumanLoginFailed))
            .await
            .unwrap();
        assert_eq!(failed.len(), 2);
        assert_eq!(failed[0].details["reason"], "invalid_credentials");
        assert_eq!(failed[1].details["reason"], "account_deactivated");
    }

    #[tokio::test]
    async fn test_delegation_and_check_are_audited() {
        let auth = auth();
        let human = auth.login("alice@example.com", PASSWORD).await.unwrap();
        let agent = auth
            .delegate_to_agent(
                &human,
                DelegationRequest::new("agent-x", "researcher", "task-1").scoped_to(["documents"]),
            )
            .await
            .unwrap();

        let decision = auth
            .check_agent_action(&agent, "users", ResourceAction::Read)
            .await;
        assert_eq!(decision, ActionDecision::Denied);

        let entries = auth.audit_log().entries().await.unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[1].event_type, AuditEventType::AgentDelegated);
        assert_eq!(entries[2].event_type, AuditEventType::PermissionDenied);
        assert_eq!(entries[2].resource, "users");
        assert_eq!(entries[2].action, "read");
        assert_eq!(entries[2].result, Some(ActionDecision::Denied));
        assert_eq!(entries[2].delegation_chain, agent.delegation_chain);
    }

    #[tokio::test]
    async fn test_logged_out_human_cannot_delegate() {
        let auth = auth();
        let human = auth.login("alice@example.com", PASSWORD).await.unwrap();
        auth.logout(&human).await.unwrap();

        let before = count(&auth).await;
        let err = auth
            .delegate_to_agent(&human, DelegationRequest::new("agent-x", "general", "task-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, DelegationError::SessionNotActive { .. }));

        let entries = auth.audit_log().entries().await.unwrap();
        assert_eq!(entries.len(), before.saturating_add(1));
        let last = entries.last().unwrap();
        assert_eq!(last.event_type, AuditEventType::AgentDelegationDenied);
        assert_eq!(last.details["agent_id"], "agent-x");
        assert_eq!(auth.agents().active_tokens().await.unwrap(), 0);
    }

    /// Ends the session right after the next lookup, landing between a
    /// delegation's session check and the token's registration.
    #[derive(Default)]
    struct LogoutAfterLookup {
        inner: MemoryRegistry<HumanIdentity>,
        armed: AtomicBool,
    }

    #[async_trait::async_trait]
    impl IdentityRegistry<HumanIdentity> for LogoutAfterLookup {
        async fn get(&self, token: &SecretToken) -> StorageResult<Option<HumanIdentity>> {
            let found = self.inner.get(token).await?;
            if self.armed.swap(false, Ordering::SeqCst) {
                self.inner.remove(token).await?;
            }
            Ok(found)
        }

        async fn put(&self, token: &SecretToken, identity: HumanIdentity) -> StorageResult<()> {
            self.inner.put(token, identity).await
        }

        async fn put_if_live(
            &self,
            anchor: &SecretToken,
            live: Predicate<'_, HumanIdentity>,
            token: &SecretToken,
            identity: HumanIdentity,
        ) -> StorageResult<bool> {
            self.inner.put_if_live(anchor, live, token, identity).await
        }

        async fn remove(&self, token: &SecretToken) -> StorageResult<Option<HumanIdentity>> {
            self.inner.remove(token).await
        }

        async fn remove_where(
            &self,
            predicate: Predicate<'_, HumanIdentity>,
        ) -> StorageResult<Vec<HumanIdentity>> {
            self.inner.remove_where(predicate).await
        }

        async fn len(&self) -> StorageResult<usize> {
            self.inner.len().await
        }
    }

    fn alice_store() -> Arc<StaticCredentialStore> {
        Arc::new(StaticCredentialStore::new().with_principal(Principal::new(
            "usr-alice-001",
            "alice@example.com",
            PASSWORD,
            Role::Admin,
        )))
    }

    #[tokio::test]
    async fn test_logout_mid_delegation_withdraws_token() {
        let sessions = Arc::new(LogoutAfterLookup::default());
        let auth = UnifiedAuth::new(
            HumanAuth::new(alice_store()).with_session_store(Arc::clone(&sessions) as _),
            AgentAuth::new(),
            Arc::new(AuditLog::in_memory()),
        );
        let human = auth.login("alice@example.com", PASSWORD).await.unwrap();

        sessions.armed.store(true, Ordering::SeqCst);
        let err = auth
            .delegate_to_agent(&human, DelegationRequest::new("agent-x", "general", "task-1"))
            .await
            .unwrap_err();

        assert!(matches!(err, DelegationError::SessionNotActive { .. }));
        assert_eq!(auth.agents().active_tokens().await.unwrap(), 0);
        let entries = auth.audit_log().entries().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].event_type, AuditEventType::AgentDelegationDenied);
    }

    #[tokio::test]
    async fn test_delegation_eviction_is_audited_as_denial_only() {
        let auth = UnifiedAuth::new(
            HumanAuth::new(alice_store()).with_session_ttl(std::time::Duration::ZERO),
            AgentAuth::new(),
            Arc::new(AuditLog::in_memory()),
        );
        let stored = auth.login("alice@example.com", PASSWORD).await.unwrap();
        let mut snapshot = stored.clone();
        snapshot.session_expires_at = Timestamp::in_future(chrono::Duration::hours(1));

        let err = auth
            .delegate_to_agent(&snapshot, DelegationRequest::new("agent-x", "general", "task-1"))
            .await
            .unwrap_err();

        assert!(matches!(err, DelegationError::ExpiredSession { .. }));
        assert_eq!(auth.humans().active_sessions().await.unwrap(), 0);
        let entries = auth.audit_log().entries().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].event_type, AuditEventType::AgentDelegationDenied);
    }

    #[tokio::test]
    async fn test_authorize_resolves_token() {
        let auth = auth();
        let human = auth.login("alice@example.com", PASSWORD).await.unwrap();
        let agent = auth
            .delegate_to_agent(&human, DelegationRequest::new("agent-x", "general", "task-1"))
            .await
            .unwrap();

        assert_eq!(
            auth.authorize(&agent.delegation_token, "documents", ResourceAction::Delete)
                .await,
            ActionDecision::Supervised
        );

        auth.revoke_agent(&agent, Some("done")).await.unwrap();
        assert_eq!(
            auth.authorize(&agent.delegation_token, "documents", ResourceAction::Read)
                .await,
            ActionDecision::Denied
        );

        let last = auth.audit_log().entries().await.unwrap().pop().unwrap();
        assert_eq!(last.event_type, AuditEventType::PermissionDenied);
        assert_eq!(last.actor_id, "unknown");
        assert_eq!(last.details["reason"], "unknown delegation token");
    }

    #[tokio::test]
    async fn test_session_expiry_is_audited_once() {
        let store = StaticCredentialStore::new().with_principal(Principal::new(
            "usr-alice-001",
            "alice@example.com",
            PASSWORD,
            Role::Admin,
        ));
        let auth = UnifiedAuth::new(
            HumanAuth::new(Arc::new(store)).with_session_ttl(std::time::Duration::ZERO),
            AgentAuth::new(),
            Arc::new(AuditLog::in_memory()),
        );
        let human = auth.login("alice@example.com", PASSWORD).await.unwrap();

        assert!(auth.validate_session(&human.session_token).await.is_err());
        assert!(auth.validate_session(&human.session_token).await.is_err());

        let expired = auth
            .audit_log()
            .query(&AuditQuery::new().event_type(AuditEventType::SessionExpired))
            .await
            .unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].actor_id, "usr-alice-001");
    }

    #[tokio::test]
    async fn test_revoke_task_is_audited() {
        let auth = auth();
        let human = auth.login("alice@example.com", PASSWORD).await.unwrap();
        let x = auth
            .delegate_to_agent(&human, DelegationRequest::new("agent-x", "general", "task-1"))
            .await
            .unwrap();
        auth.delegate_to_sub_agent(&x, DelegationRequest::new("agent-y", "general", "task-1"), true)
            .await
            .unwrap();

        assert_eq!(auth.revoke_task("task-1").await.unwrap(), 2);

        let last = auth.audit_log().entries().await.unwrap().pop().unwrap();
        assert_eq!(last.event_type, AuditEventType::TaskRevoked);
        assert_eq!(last.details["tokens_revoked"], 2);
    }
}
