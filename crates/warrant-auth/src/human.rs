//! Human principals, credential lookup and login sessions.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use warrant_core::{PermissionSet, Role, RolePolicy, Timestamp};
use warrant_crypto::{PasswordHash, SecretToken, TokenKind};
use warrant_storage::StorageResult;

use crate::error::{AuthResult, AuthenticationError};
use crate::registry::{IdentityRegistry, MemoryRegistry};

/// Default session lifetime (one hour).
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(3_600);

/// A human account as held by the credential store.
#[derive(Debug, Clone)]
pub struct Principal {
    /// Stable user identifier.
    pub user_id: String,
    /// Login email.
    pub email: String,
    /// Stored password digest.
    pub password: PasswordHash,
    /// Role resolved to permissions at login.
    pub role: Role,
    /// Inactive accounts cannot log in.
    pub active: bool,
}

impl Principal {
    /// Create an active principal, digesting `password`.
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        email: impl Into<String>,
        password: &str,
        role: Role,
    ) -> Self {
        Self::with_digest(user_id, email, PasswordHash::digest(password), role)
    }

    /// Create an active principal from an already-digested password.
    #[must_use]
    pub fn with_digest(
        user_id: impl Into<String>,
        email: impl Into<String>,
        password: PasswordHash,
        role: Role,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
            password,
            role,
            active: true,
        }
    }

    /// Mark the principal as deactivated.
    #[must_use]
    pub fn deactivated(mut self) -> Self {
        self.active = false;
        self
    }
}

/// Lookup of principals by login email.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Find the principal for `email`. Matching is case-insensitive.
    async fn find_by_email(&self, email: &str) -> StorageResult<Option<Principal>>;
}

/// A fixed set of principals held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialStore {
    by_email: HashMap<String, Principal>,
}

impl StaticCredentialStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.insert(principal);
        self
    }

    /// Add or replace a principal, keyed by lowercased email.
    pub fn insert(&mut self, principal: Principal) {
        self.by_email
            .insert(principal.email.to_lowercase(), principal);
    }

    /// Number of principals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_email.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_email.is_empty()
    }
}

impl FromIterator<Principal> for StaticCredentialStore {
    fn from_iter<I: IntoIterator<Item = Principal>>(iter: I) -> Self {
        let mut store = Self::new();
        for principal in iter {
            store.insert(principal);
        }
        store
    }
}

#[async_trait]
impl CredentialStore for StaticCredentialStore {
    async fn find_by_email(&self, email: &str) -> StorageResult<Option<Principal>> {
        Ok(self.by_email.get(&email.trim().to_lowercase()).cloned())
    }
}

/// A logged-in human. An immutable snapshot taken at login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HumanIdentity {
    /// Stable user identifier.
    pub user_id: String,
    /// Login email.
    pub email: String,
    /// Role at login time.
    pub role: Role,
    /// Permissions resolved from the role.
    pub permissions: PermissionSet,
    /// Bearer token for this session.
    pub session_token: SecretToken,
    /// When the session stops being valid.
    pub session_expires_at: Timestamp,
}

impl HumanIdentity {
    /// Whether the session deadline has not been reached yet.
    #[must_use]
    pub fn is_session_valid(&self) -> bool {
        !self.session_expires_at.has_elapsed()
    }
}

/// Authenticates humans and tracks their sessions.
pub struct HumanAuth {
    credentials: Arc<dyn CredentialStore>,
    sessions: Arc<dyn IdentityRegistry<HumanIdentity>>,
    roles: RolePolicy,
    session_ttl: chrono::Duration,
}

impl HumanAuth {
    /// Create with in-memory sessions, the preset role table and the
    /// default session lifetime.
    #[must_use]
    pub fn new(credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            credentials,
            sessions: Arc::new(MemoryRegistry::new()),
            roles: RolePolicy::presets(),
            session_ttl: to_chrono(DEFAULT_SESSION_TTL),
        }
    }

    /// Keep sessions in `sessions` instead of process memory.
    #[must_use]
    pub fn with_session_store(mut self, sessions: Arc<dyn IdentityRegistry<HumanIdentity>>) -> Self {
        self.sessions = sessions;
        self
    }

    /// Resolve roles through `roles` instead of the presets.
    #[must_use]
    pub fn with_role_policy(mut self, roles: RolePolicy) -> Self {
        self.roles = roles;
        self
    }

    /// Set the lifetime of new sessions.
    #[must_use]
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = to_chrono(ttl);
        self
    }

    /// Check credentials and open a session.
    ///
    /// # Errors
    ///
    /// Returns [`AuthenticationError::InvalidCredentials`] for an unknown
    /// email or wrong password, [`AuthenticationError::AccountDeactivated`]
    /// for a correct password on an inactive account, and
    /// [`AuthenticationError::Store`] if a store fails.
    pub async fn login(&self, email: &str, password: &str) -> AuthResult<HumanIdentity> {
        let Some(principal) = self.credentials.find_by_email(email).await? else {
            // Same comparison cost as a wrong password on a real account.
            let _ = PasswordHash::decoy().verify(password);
            return Err(AuthenticationError::InvalidCredentials);
        };

        if !principal.password.verify(password) {
            return Err(AuthenticationError::InvalidCredentials);
        }
        if !principal.active {
            return Err(AuthenticationError::AccountDeactivated {
                user_id: principal.user_id,
            });
        }

        let identity = HumanIdentity {
            permissions: self.roles.permissions_for(principal.role),
            user_id: principal.user_id,
            email: principal.email,
            role: principal.role,
            session_token: SecretToken::generate(TokenKind::Session),
            session_expires_at: Timestamp::in_future(self.session_ttl),
        };
        self.sessions
            .put(&identity.session_token, identity.clone())
            .await?;

        info!(
            user_id = %identity.user_id,
            role = %identity.role,
            session = ?identity.session_token,
            "Human logged in"
        );
        Ok(identity)
    }

    /// Resolve a session token, evicting it if it has expired.
    ///
    /// # Errors
    ///
    /// Returns [`AuthenticationError::InvalidSession`] for an unknown token
    /// and [`AuthenticationError::SessionExpired`] for an expired one.
    pub async fn validate_session(&self, token: &SecretToken) -> AuthResult<HumanIdentity> {
        let Some(identity) = self.sessions.get(token).await? else {
            return Err(AuthenticationError::InvalidSession);
        };

        if identity.is_session_valid() {
            return Ok(identity);
        }

        self.sessions.remove(token).await?;
        debug!(user_id = %identity.user_id, session = ?token, "Evicted expired session");
        Err(AuthenticationError::SessionExpired {
            user_id: identity.user_id,
        })
    }

    /// End a session. Ending an unknown session is not an error.
    ///
    /// Returns the identity that was removed, if any.
    ///
    /// # Errors
    ///
    /// Returns [`AuthenticationError::Store`] if the session store fails.
    pub async fn logout(&self, token: &SecretToken) -> AuthResult<Option<HumanIdentity>> {
        let removed = self.sessions.remove(token).await?;
        if let Some(identity) = &removed {
            info!(user_id = %identity.user_id, "Human logged out");
        }
        Ok(removed)
    }

    /// Number of sessions in the store, including expired ones not yet
    /// evicted.
    ///
    /// # Errors
    ///
    /// Returns [`AuthenticationError::Store`] if the session store fails.
    pub async fn active_sessions(&self) -> AuthResult<usize> {
        Ok(self.sessions.len().await?)
    }
}

impl std::fmt::Debug for HumanAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HumanAuth")
            .field("session_ttl", &self.session_ttl)
            .finish_non_exhaustive()
    }
}

/// Convert a lifetime to chrono, saturating at the largest representable
/// duration.
pub(crate) fn to_chrono(ttl: Duration) -> chrono::Duration {
    chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX)
}
