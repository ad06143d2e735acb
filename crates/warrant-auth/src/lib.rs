//! Warrant Auth - Human login and agent delegation under one permission model.
//!
//! This crate provides:
//! - [`HumanAuth`]: credential checks and role-derived sessions
//! - [`AgentAuth`]: short-lived delegation tokens with monotonic attenuation
//! - [`UnifiedAuth`]: the audited facade hosts call
//! - [`IdentityRegistry`]: the token store seam (in memory or over a
//!   [`warrant_storage::KvStore`])
//!
//! # Security Model
//!
//! - A delegated agent never holds a grant its delegator lacks, and never
//!   at a looser tier (read-only sub-delegation is the one documented
//!   exception: surviving `read` grants become free).
//! - A sub-agent's token never outlives its parent's.
//! - Revoking a task removes every token issued for it in one sweep.
//! - Every facade call writes exactly one audit entry after the state
//!   change succeeds.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use warrant_auth::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let credentials = StaticCredentialStore::new().with_principal(Principal::new(
//!     "usr-alice-001",
//!     "alice@example.com",
//!     "correct horse",
//!     Role::Admin,
//! ));
//! let auth = UnifiedAuth::in_memory(Arc::new(credentials));
//!
//! let alice = auth.login("alice@example.com", "correct horse").await?;
//! let agent = auth
//!     .delegate_to_agent(
//!         &alice,
//!         DelegationRequest::new("agent-x", "researcher", "task-1").scoped_to(["documents"]),
//!     )
//!     .await?;
//!
//! let decision = auth
//!     .check_agent_action(&agent, "documents", ResourceAction::Delete)
//!     .await;
//! assert_eq!(decision, ActionDecision::Supervised);
//!
//! assert_eq!(auth.revoke_task("task-1").await?, 1);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod agent;
mod bridge;
mod error;
mod human;
mod registry;
mod unified;

pub use agent::{AgentAuth, AgentIdentity, DEFAULT_AGENT_TOKEN_TTL, DelegationRequest};
pub use bridge::AuthPolicy;
pub use error::{AuthResult, AuthenticationError, DelegationError, DelegationResult, SetupError};
pub use human::{
    CredentialStore, DEFAULT_SESSION_TTL, HumanAuth, HumanIdentity, Principal,
    StaticCredentialStore,
};
pub use registry::{IdentityRegistry, KvRegistry, MemoryRegistry, Predicate};
pub use unified::UnifiedAuth;
