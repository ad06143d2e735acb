//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warrant_auth::prelude::*;` to import all essential types.

// Errors
pub use crate::{AuthResult, AuthenticationError, DelegationError, DelegationResult, SetupError};

// Humans
pub use crate::{CredentialStore, HumanAuth, HumanIdentity, Principal, StaticCredentialStore};

// Agents
pub use crate::{AgentAuth, AgentIdentity, DelegationRequest};

// Facade and policy
pub use crate::{AuthPolicy, UnifiedAuth};

// Permission model
pub use warrant_core::{AccessTier, ActionDecision, PermissionSet, ResourceAction, Role};
