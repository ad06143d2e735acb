//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warrant_core::prelude::*;` to import all essential types.
//!
//! # Example
//!
//! ```rust
//! use warrant_core::prelude::*;
//!
//! let set = PermissionSet::new()
//!     .grant("documents", ResourceAction::Read, AccessTier::Free)
//!     .grant("documents", ResourceAction::Delete, AccessTier::Supervised);
//!
//! assert_eq!(
//!     ActionDecision::from_tier(set.get_tier("documents", ResourceAction::Delete)),
//!     ActionDecision::Supervised
//! );
//! ```

// Errors
pub use crate::{CoreError, CoreResult};

// Permission model
pub use crate::{AccessTier, Permission, PermissionSet, ResourceAction};

// Roles
pub use crate::{Role, RolePolicy};

// Decisions
pub use crate::ActionDecision;

// Time
pub use crate::Timestamp;
