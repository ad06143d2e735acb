//! Configuration types for the Warrant auth kernel.
//!
//! All types in this module are self-contained with no dependencies on other
//! internal warrant crates. Roles, actions and tiers are plain strings here
//! and are converted to domain types at the boundary. Every struct
//! implements [`Default`] so a bare `[section]` header in TOML produces a
//! working configuration.

use std::collections::BTreeMap;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration for the Warrant auth kernel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Session and delegation token lifetimes.
    pub auth: AuthSection,
    /// Audit log buffering.
    pub audit: AuditSection,
    /// Logging level, format, and per-crate directives.
    pub logging: LoggingSection,
    /// Role tables replacing the built-in presets, keyed by role name.
    pub roles: BTreeMap<String, RoleSection>,
    /// Human principals allowed to log in.
    pub principals: Vec<PrincipalSection>,
}

// ---------------------------------------------------------------------------
// AuthSection
// ---------------------------------------------------------------------------

/// Token lifetimes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSection {
    /// Lifetime of a human login session, in seconds.
    pub session_ttl_secs: u64,
    /// Lifetime of an agent delegation token, in seconds.
    pub agent_token_ttl_secs: u64,
}

impl Default for AuthSection {
    fn default() -> Self {
        Self {
            session_ttl_secs: 3600,
            agent_token_ttl_secs: 300,
        }
    }
}

// ---------------------------------------------------------------------------
// AuditSection
// ---------------------------------------------------------------------------

/// Audit log settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditSection {
    /// Entries held in memory while the audit store rejects writes. Beyond
    /// this the oldest buffered entry is dropped with an alarm.
    pub pending_capacity: usize,
}

impl Default for AuditSection {
    fn default() -> Self {
        Self {
            pending_capacity: 10_000,
        }
    }
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging and tracing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"` (human-friendly), `"compact"` (one-line),
    /// `"json"` (structured), or `"full"` (verbose).
    pub format: String,
    /// Per-crate tracing directives (e.g. `["warrant_auth=debug"]`).
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// Grants for one role. Replaces the built-in preset for that role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleSection {
    /// Every grant the role carries.
    pub grants: Vec<GrantSection>,
}

/// One `(resource, action, tier)` grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantSection {
    /// Resource name, e.g. `"documents"`.
    pub resource: String,
    /// One of `read`, `create`, `update`, `delete`, `admin`.
    pub action: String,
    /// One of `free`, `supervised`, `forbidden`.
    pub tier: String,
}

// ---------------------------------------------------------------------------
// Principals
// ---------------------------------------------------------------------------

/// A human principal in the credential directory.
#[derive(Clone, Deserialize)]
pub struct PrincipalSection {
    /// Stable user identifier recorded in delegation chains.
    pub user_id: String,
    /// Login email.
    pub email: String,
    /// Hex SHA-256 digest of the password.
    pub password_sha256: String,
    /// Role name (`viewer`, `editor`, `admin`).
    pub role: String,
    /// Inactive principals cannot log in.
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

impl std::fmt::Debug for PrincipalSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrincipalSection")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("password_sha256", &"***")
            .field("role", &self.role)
            .field("active", &self.active)
            .finish()
    }
}

impl Serialize for PrincipalSection {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("PrincipalSection", 4)?;
        state.serialize_field("user_id", &self.user_id)?;
        state.serialize_field("email", &self.email)?;
        // password_sha256 is intentionally omitted.
        state.serialize_field("role", &self.role)?;
        state.serialize_field("active", &self.active)?;
        state.end()
    }
}
