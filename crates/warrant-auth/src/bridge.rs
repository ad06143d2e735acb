//! Conversion from loaded configuration into auth-kernel types.
//!
//! `warrant-config` deals in strings; this is the boundary where they
//! become closed enums.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;
use warrant_config::Config;
use warrant_core::{AccessTier, PermissionSet, ResourceAction, Role, RolePolicy};
use warrant_crypto::PasswordHash;

use crate::agent::{AgentAuth, DEFAULT_AGENT_TOKEN_TTL};
use crate::error::SetupError;
use crate::human::{CredentialStore, DEFAULT_SESSION_TTL, HumanAuth, Principal, StaticCredentialStore};

/// Lifetimes, role table and audit buffering for one auth kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthPolicy {
    /// Lifetime of human sessions.
    pub session_ttl: Duration,
    /// Lifetime of agent delegation tokens.
    pub agent_token_ttl: Duration,
    /// Role → permission table.
    pub roles: RolePolicy,
    /// Audit entries buffered while the audit store is unavailable.
    pub audit_pending_capacity: usize,
}

impl Default for AuthPolicy {
    fn default() -> Self {
        Self {
            session_ttl: DEFAULT_SESSION_TTL,
            agent_token_ttl: DEFAULT_AGENT_TOKEN_TTL,
            roles: RolePolicy::presets(),
            audit_pending_capacity: warrant_audit::DEFAULT_PENDING_CAPACITY,
        }
    }
}

impl AuthPolicy {
    /// Build the policy from `[auth]`, `[audit]` and `[roles.*]`.
    ///
    /// A `[roles.<name>]` table replaces that role's preset entirely; roles
    /// without a table keep their preset.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::Policy`] if a role, action or tier name is
    /// unknown.
    pub fn from_config(config: &Config) -> Result<Self, SetupError> {
        let mut roles = RolePolicy::presets();
        for (name, section) in &config.roles {
            let role: Role = name.parse()?;
            let mut permissions = PermissionSet::new();
            for grant in &section.grants {
                let action: ResourceAction = grant.action.parse()?;
                let tier: AccessTier = grant.tier.parse()?;
                permissions = permissions.grant(grant.resource.trim(), action, tier);
            }
            debug!(%role, grants = permissions.len(), "Role table overridden by config");
            roles = roles.with_role(role, permissions);
        }

        Ok(Self {
            session_ttl: Duration::from_secs(config.auth.session_ttl_secs),
            agent_token_ttl: Duration::from_secs(config.auth.agent_token_ttl_secs),
            roles,
            audit_pending_capacity: config.audit.pending_capacity,
        })
    }

    /// A human authenticator using this policy.
    #[must_use]
    pub fn human_auth(&self, credentials: Arc<dyn CredentialStore>) -> HumanAuth {
        HumanAuth::new(credentials)
            .with_role_policy(self.roles.clone())
            .with_session_ttl(self.session_ttl)
    }

    /// An agent authenticator using this policy.
    #[must_use]
    pub fn agent_auth(&self) -> AgentAuth {
        AgentAuth::new().with_token_ttl(self.agent_token_ttl)
    }
}

impl StaticCredentialStore {
    /// Build the credential store from `[[principals]]`.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::Policy`] for an unknown role and
    /// [`SetupError::Credential`] for a malformed password digest.
    pub fn from_config(config: &Config) -> Result<Self, SetupError> {
        let mut store = Self::new();
        for section in &config.principals {
            let role: Role = section.role.parse()?;
            let password =
                PasswordHash::from_hex(&section.password_sha256).map_err(|source| {
                    SetupError::Credential {
                        user_id: section.user_id.clone(),
                        source,
                    }
                })?;
            let mut principal =
                Principal::with_digest(section.user_id.trim(), section.email.trim(), password, role);
            principal.active = section.active;
            store.insert(principal);
        }
        Ok(store)
    }
}
