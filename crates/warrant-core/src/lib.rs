//! Warrant Core - Permission model for the Warrant delegated-auth kernel.
//!
//! This crate provides:
//! - Access tiers (`free`, `supervised`, `forbidden`) and resource actions
//! - [`PermissionSet`], an immutable set of grants keyed by resource and action
//! - Attenuation operations used when authority is delegated to agents
//! - Role presets (`viewer`, `editor`, `admin`) and the [`RolePolicy`] table
//! - [`ActionDecision`], the outcome of an agent permission check
//! - A shared [`Timestamp`] type
//!
//! # Example
//!
//! ```
//! use warrant_core::{AccessTier, PermissionSet, ResourceAction, Role, RolePolicy};
//!
//! let policy = RolePolicy::presets();
//! let admin = policy.permissions_for(Role::Admin);
//!
//! // Narrow to a single resource before handing it to an agent.
//! let scoped = admin.attenuate(&["documents"]);
//! assert_eq!(
//!     scoped.get_tier("documents", ResourceAction::Delete),
//!     Some(AccessTier::Supervised)
//! );
//! assert!(!scoped.has("users", ResourceAction::Read));
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod decision;
mod error;
mod permission;
mod role;
mod types;

pub use decision::ActionDecision;
pub use error::{CoreError, CoreResult};
pub use permission::{AccessTier, Permission, PermissionSet, ResourceAction};
pub use role::{Role, RolePolicy};
pub use types::Timestamp;
