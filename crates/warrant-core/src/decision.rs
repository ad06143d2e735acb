//! Outcome of an agent permission check.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::permission::AccessTier;

/// What an agent may do with a requested action.
///
/// Denial is an ordinary value, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionDecision {
    /// Execute autonomously.
    Allowed,
    /// Execute only after human approval.
    Supervised,
    /// Do not execute.
    Denied,
}

impl ActionDecision {
    /// Map a granted tier to a decision.
    ///
    /// `free` allows, `supervised` supervises, and both `forbidden` and a
    /// missing grant deny.
    #[must_use]
    pub fn from_tier(tier: Option<AccessTier>) -> Self {
        match tier {
            Some(AccessTier::Free) => Self::Allowed,
            Some(AccessTier::Supervised) => Self::Supervised,
            Some(AccessTier::Forbidden) | None => Self::Denied,
        }
    }

    /// Wire name of the decision.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Allowed => "allowed",
            Self::Supervised => "supervised",
            Self::Denied => "denied",
        }
    }

    /// Whether the action may proceed (possibly after approval).
    #[must_use]
    pub fn is_permitted(self) -> bool {
        !matches!(self, Self::Denied)
    }
}

impl fmt::Display for ActionDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
