//! Roles and the role → permission table.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::permission::{AccessTier, PermissionSet, ResourceAction};

/// A human principal's role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Read-only access to everyday resources.
    Viewer,
    /// Edits documents; deleting them needs approval.
    Editor,
    /// Broad access with supervised user and analytics administration.
    Admin,
}

impl Role {
    /// All roles.
    pub const ALL: [Self; 3] = [Self::Viewer, Self::Editor, Self::Admin];

    /// Wire name of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::Editor => "editor",
            Self::Admin => "admin",
        }
    }

    /// The built-in permission table for this role.
    #[must_use]
    pub fn preset(self) -> PermissionSet {
        use AccessTier::{Forbidden, Free, Supervised};
        use ResourceAction::{Admin, Create, Delete, Read, Update};

        match self {
            Self::Viewer => PermissionSet::new()
                .grant("users", Read, Free)
                .grant("documents", Read, Free)
                .grant("analytics", Read, Free),
            Self::Editor => PermissionSet::new()
                .grant("users", Read, Free)
                .grant("documents", Read, Free)
                .grant("documents", Create, Free)
                .grant("documents", Update, Free)
                .grant("documents", Delete, Supervised)
                .grant("analytics", Read, Free),
            Self::Admin => PermissionSet::new()
                .grant("users", Read, Free)
                .grant("users", Create, Supervised)
                .grant("users", Update, Supervised)
                .grant("users", Delete, Forbidden)
                .grant("documents", Read, Free)
                .grant("documents", Create, Free)
                .grant("documents", Update, Free)
                .grant("documents", Delete, Supervised)
                .grant("analytics", Read, Free)
                .grant("analytics", Admin, Supervised)
                .grant("billing", Read, Free)
                .grant("billing", Update, Forbidden),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "viewer" => Ok(Self::Viewer),
            "editor" => Ok(Self::Editor),
            "admin" => Ok(Self::Admin),
            _ => Err(CoreError::UnknownRole(s.to_string())),
        }
    }
}

/// Role → permission table passed to the auth kernel at construction.
///
/// Several policies can coexist in one process (e.g. one per tenant).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolePolicy {
    roles: HashMap<Role, PermissionSet>,
}

impl RolePolicy {
    /// The built-in presets for every role.
    #[must_use]
    pub fn presets() -> Self {
        Self {
            roles: Role::ALL.iter().map(|r| (*r, r.preset())).collect(),
        }
    }

    /// A policy with no grants for any role.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            roles: HashMap::new(),
        }
    }

    /// Replace the permission table for one role.
    #[must_use]
    pub fn with_role(mut self, role: Role, permissions: PermissionSet) -> Self {
        self.roles.insert(role, permissions);
        self
    }

    /// Permissions granted to `role`; empty if the policy has no entry.
    #[must_use]
    pub fn permissions_for(&self, role: Role) -> PermissionSet {
        self.roles.get(&role).cloned().unwrap_or_default()
    }
}

impl Default for RolePolicy {
    fn default() -> Self {
        Self::presets()
    }
}
