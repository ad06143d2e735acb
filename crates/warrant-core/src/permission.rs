//! Permissions, access tiers, and permission sets.
//!
//! A [`PermissionSet`] maps each `(resource, action)` pair to at most one
//! [`AccessTier`]. Sets are immutable once built: attenuation always returns
//! a new set and never widens the source.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// How much autonomy a grant gives an agent.
///
/// Variants are ordered from most permissive to most restrictive, so
/// `a > b` means `a` is strictly stricter than `b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessTier {
    /// The action may run autonomously.
    Free,
    /// The action requires human approval before it runs.
    Supervised,
    /// The action is never automatable.
    Forbidden,
}

impl AccessTier {
    /// Wire name of the tier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Supervised => "supervised",
            Self::Forbidden => "forbidden",
        }
    }

    /// Whether `self` grants at most as much autonomy as `other`.
    #[must_use]
    pub fn is_no_better_than(self, other: Self) -> bool {
        self >= other
    }
}

impl fmt::Display for AccessTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessTier {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "free" => Ok(Self::Free),
            "supervised" => Ok(Self::Supervised),
            "forbidden" => Ok(Self::Forbidden),
            _ => Err(CoreError::UnknownTier(s.to_string())),
        }
    }
}

/// An action that can be performed on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceAction {
    /// Read a resource.
    Read,
    /// Create a resource.
    Create,
    /// Update a resource.
    Update,
    /// Delete a resource.
    Delete,
    /// Administer a resource.
    Admin,
}

impl ResourceAction {
    /// All actions, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Read,
        Self::Create,
        Self::Update,
        Self::Delete,
        Self::Admin,
    ];

    /// Wire name of the action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for ResourceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceAction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "read" => Ok(Self::Read),
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            "admin" => Ok(Self::Admin),
            _ => Err(CoreError::UnknownAction(s.to_string())),
        }
    }
}

/// A single grant: `action` on `resource` at `tier`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    /// Resource name (e.g. `"documents"`).
    pub resource: String,
    /// Action on the resource.
    pub action: ResourceAction,
    /// Access tier for the action.
    pub tier: AccessTier,
}

impl Permission {
    /// Create a new permission.
    #[must_use]
    pub fn new(resource: impl Into<String>, action: ResourceAction, tier: AccessTier) -> Self {
        Self {
            resource: resource.into(),
            action,
            tier,
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}={}", self.resource, self.action, self.tier)
    }
}

/// A set of permissions keyed by `(resource, action)`.
///
/// Inserting a second grant for the same pair replaces the first; no pair
/// ever carries two tiers. Serializes as a list of [`Permission`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Permission>", into = "Vec<Permission>")]
pub struct PermissionSet {
    grants: BTreeMap<(String, ResourceAction), AccessTier>,
}

impl PermissionSet {
    /// Create an empty permission set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style grant.
    #[must_use]
    pub fn grant(
        mut self,
        resource: impl Into<String>,
        action: ResourceAction,
        tier: AccessTier,
    ) -> Self {
        self.grants.insert((resource.into(), action), tier);
        self
    }

    /// Number of grants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.grants.len()
    }

    /// Whether the set holds no grants.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    /// Iterate over the grants in `(resource, action)` order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, ResourceAction, AccessTier)> + '_ {
        self.grants
            .iter()
            .map(|((resource, action), tier)| (resource.as_str(), *action, *tier))
    }

    /// Distinct resource names covered by the set.
    #[must_use]
    pub fn resources(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.grants.keys().map(|(r, _)| r.as_str()).collect();
        out.dedup();
        out
    }

    /// Whether a grant exists for `(resource, action)`, at any tier.
    #[must_use]
    pub fn has(&self, resource: &str, action: ResourceAction) -> bool {
        self.get_tier(resource, action).is_some()
    }

    /// The tier granted for `(resource, action)`.
    ///
    /// `None` means no grant exists, which is not the same as
    /// [`AccessTier::Forbidden`]: callers treat both as denial, but only the
    /// latter is an explicit policy record.
    #[must_use]
    pub fn get_tier(&self, resource: &str, action: ResourceAction) -> Option<AccessTier> {
        self.grants.get(&(resource.to_string(), action)).copied()
    }

    /// Whether the action is granted at [`AccessTier::Free`].
    #[must_use]
    pub fn is_allowed(&self, resource: &str, action: ResourceAction) -> bool {
        self.get_tier(resource, action) == Some(AccessTier::Free)
    }

    /// Whether the action is granted at [`AccessTier::Supervised`].
    #[must_use]
    pub fn requires_approval(&self, resource: &str, action: ResourceAction) -> bool {
        self.get_tier(resource, action) == Some(AccessTier::Supervised)
    }

    /// Whether the action is explicitly [`AccessTier::Forbidden`].
    #[must_use]
    pub fn is_forbidden(&self, resource: &str, action: ResourceAction) -> bool {
        self.get_tier(resource, action) == Some(AccessTier::Forbidden)
    }

    /// Keep only the grants whose resource is in `allowed_resources`.
    ///
    /// Tiers are preserved; this narrows scope, not tier.
    #[must_use]
    pub fn attenuate<S: AsRef<str>>(&self, allowed_resources: &[S]) -> Self {
        let allowed: HashSet<&str> = allowed_resources.iter().map(AsRef::as_ref).collect();
        let grants = self
            .grants
            .iter()
            .filter(|((resource, _), _)| allowed.contains(resource.as_str()))
            .map(|(key, tier)| (key.clone(), *tier))
            .collect();
        Self { grants }
    }

    /// Keep only the `read` grants, each forced to [`AccessTier::Free`].
    ///
    /// A `read` grant that was `supervised` or `forbidden` in the source
    /// comes out `free`. Read-only sub-agents rely on being unconditionally
    /// executable. Use [`Self::read_only_elevations`] to find the grants
    /// this would loosen.
    #[must_use]
    pub fn attenuate_to_read_only(&self) -> Self {
        let grants = self
            .grants
            .keys()
            .filter(|(_, action)| *action == ResourceAction::Read)
            .map(|key| (key.clone(), AccessTier::Free))
            .collect();
        Self { grants }
    }

    /// Resources whose `read` grant [`Self::attenuate_to_read_only`] would
    /// loosen to `free`.
    #[must_use]
    pub fn read_only_elevations(&self) -> Vec<&str> {
        self.grants
            .iter()
            .filter(|((_, action), tier)| {
                *action == ResourceAction::Read && **tier != AccessTier::Free
            })
            .map(|((resource, _), _)| resource.as_str())
            .collect()
    }

    /// Whether every grant in `self` also exists in `parent` at a tier no
    /// more permissive than the parent's.
    #[must_use]
    pub fn is_attenuation_of(&self, parent: &Self) -> bool {
        self.iter().all(|(resource, action, tier)| {
            parent
                .get_tier(resource, action)
                .is_some_and(|parent_tier| tier.is_no_better_than(parent_tier))
        })
    }

    /// All grants as owned [`Permission`] values.
    #[must_use]
    pub fn to_permissions(&self) -> Vec<Permission> {
        self.iter()
            .map(|(resource, action, tier)| Permission::new(resource, action, tier))
            .collect()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        let grants = iter
            .into_iter()
            .map(|p| ((p.resource, p.action), p.tier))
            .collect();
        Self { grants }
    }
}

impl From<Vec<Permission>> for PermissionSet {
    fn from(permissions: Vec<Permission>) -> Self {
        permissions.into_iter().collect()
    }
}

impl From<PermissionSet> for Vec<Permission> {
    fn from(set: PermissionSet) -> Self {
        set.to_permissions()
    }
}


#[cfg(test)]
mod proptest_attenuation {
    use super::*;
    use proptest::prelude::*;

    const RESOURCES: [&str; 4] = ["users", "documents", "analytics", "billing"];

    fn arb_tier() -> impl Strategy<Value = AccessTier> {
        prop_oneof![
            Just(AccessTier::Free),
            Just(AccessTier::Supervised),
            Just(AccessTier::Forbidden),
        ]
    }

    fn arb_action() -> impl Strategy<Value = ResourceAction> {
        (0usize..ResourceAction::ALL.len()).prop_map(|i| ResourceAction::ALL[i])
    }

    fn arb_set() -> impl Strategy<Value = PermissionSet> {
        prop::collection::vec(
            (0usize..RESOURCES.len(), arb_action(), arb_tier())
                .prop_map(|(r, action, tier)| Permission::new(RESOURCES[r], action, tier)),
            0..16,
        )
        .prop_map(PermissionSet::from)
    }

    fn arb_scope() -> impl Strategy<Value = Vec<&'static str>> {
        prop::sample::subsequence(RESOURCES.to_vec(), 0..=RESOURCES.len())
    }

    proptest! {
        /// Every attenuated grant exists in the source at the same tier and
        /// names an allowed resource.
        #[test]
        fn attenuate_is_monotonic(set in arb_set(), scope in arb_scope()) {
            let narrowed = set.attenuate(&scope);
            for (resource, action, tier) in narrowed.iter() {
                prop_assert_eq!(set.get_tier(resource, action), Some(tier));
                prop_assert!(scope.contains(&resource));
            }
            prop_assert!(narrowed.is_attenuation_of(&set));
        }

        /// Attenuating twice by the same scope changes nothing.
        #[test]
        fn attenuate_is_idempotent(set in arb_set(), scope in arb_scope()) {
            let once = set.attenuate(&scope);
            let twice = once.attenuate(&scope);
            prop_assert_eq!(once, twice);
        }

        /// Read-only narrowing only ever keeps `read` grants, all `free`.
        #[test]
        fn read_only_keeps_only_free_reads(set in arb_set()) {
            let read_only = set.attenuate_to_read_only();
            for (resource, action, tier) in read_only.iter() {
                prop_assert_eq!(action, ResourceAction::Read);
                prop_assert_eq!(tier, AccessTier::Free);
                prop_assert!(set.has(resource, ResourceAction::Read));
            }
        }
    }
}
