//! Configuration validation rules.
//!
//! Validation returns the first error found.

use std::collections::HashSet;

use crate::error::{ConfigError, ConfigResult};
use crate::types::{AuthSection, Config, GrantSection, PrincipalSection};

/// Upper bound for `auth.session_ttl_secs` (one day).
pub const MAX_SESSION_TTL_SECS: u64 = 86_400;

/// Upper bound for `auth.agent_token_ttl_secs` (one hour).
pub const MAX_AGENT_TOKEN_TTL_SECS: u64 = 3_600;

/// Role names the auth kernel understands.
pub const KNOWN_ROLES: &[&str] = &["viewer", "editor", "admin"];

/// Action names the auth kernel understands.
pub const KNOWN_ACTIONS: &[&str] = &["read", "create", "update", "delete", "admin"];

/// Tier names the auth kernel understands.
pub const KNOWN_TIERS: &[&str] = &["free", "supervised", "forbidden"];

const KNOWN_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const KNOWN_LOG_FORMATS: &[&str] = &["pretty", "compact", "json", "full"];

/// Validate a fully merged configuration.
///
/// # Errors
///
/// Returns [`ConfigError::ValidationError`] naming the first offending field.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_auth(&config.auth)?;

    if config.audit.pending_capacity == 0 {
        return Err(invalid(
            "audit.pending_capacity",
            "must be at least 1 so audit entries survive a store outage",
        ));
    }

    let level = config.logging.level.to_ascii_lowercase();
    if !KNOWN_LOG_LEVELS.contains(&level.as_str()) {
        return Err(invalid(
            "logging.level",
            format!("unknown level '{}'", config.logging.level),
        ));
    }
    let format = config.logging.format.to_ascii_lowercase();
    if !KNOWN_LOG_FORMATS.contains(&format.as_str()) {
        return Err(invalid(
            "logging.format",
            format!("unknown format '{}'", config.logging.format),
        ));
    }

    for (name, role) in &config.roles {
        if !is_known(KNOWN_ROLES, name) {
            return Err(invalid(
                format!("roles.{name}"),
                format!("unknown role, expected one of {KNOWN_ROLES:?}"),
            ));
        }
        for (i, grant) in role.grants.iter().enumerate() {
            validate_grant(&format!("roles.{name}.grants[{i}]"), grant)?;
        }
    }

    let mut emails = HashSet::new();
    for (i, principal) in config.principals.iter().enumerate() {
        validate_principal(&format!("principals[{i}]"), principal)?;
        if !emails.insert(principal.email.to_ascii_lowercase()) {
            return Err(invalid(
                format!("principals[{i}].email"),
                format!("duplicate email '{}'", principal.email),
            ));
        }
    }

    Ok(())
}

fn validate_auth(auth: &AuthSection) -> ConfigResult<()> {
    if !(1..=MAX_SESSION_TTL_SECS).contains(&auth.session_ttl_secs) {
        return Err(invalid(
            "auth.session_ttl_secs",
            format!("must be between 1 and {MAX_SESSION_TTL_SECS}"),
        ));
    }
    if !(1..=MAX_AGENT_TOKEN_TTL_SECS).contains(&auth.agent_token_ttl_secs) {
        return Err(invalid(
            "auth.agent_token_ttl_secs",
            format!("must be between 1 and {MAX_AGENT_TOKEN_TTL_SECS}"),
        ));
    }
    if auth.agent_token_ttl_secs > auth.session_ttl_secs {
        return Err(invalid(
            "auth.agent_token_ttl_secs",
            "must not exceed auth.session_ttl_secs",
        ));
    }
    Ok(())
}

fn validate_grant(field: &str, grant: &GrantSection) -> ConfigResult<()> {
    if grant.resource.trim().is_empty() {
        return Err(invalid(format!("{field}.resource"), "must not be empty"));
    }
    if !is_known(KNOWN_ACTIONS, &grant.action) {
        return Err(invalid(
            format!("{field}.action"),
            format!("unknown action '{}'", grant.action),
        ));
    }
    if !is_known(KNOWN_TIERS, &grant.tier) {
        return Err(invalid(
            format!("{field}.tier"),
            format!("unknown tier '{}'", grant.tier),
        ));
    }
    Ok(())
}

fn validate_principal(field: &str, principal: &PrincipalSection) -> ConfigResult<()> {
    if principal.user_id.trim().is_empty() {
        return Err(invalid(format!("{field}.user_id"), "must not be empty"));
    }
    if !principal.email.contains('@') {
        return Err(invalid(
            format!("{field}.email"),
            format!("'{}' is not an email address", principal.email),
        ));
    }
    if !is_known(KNOWN_ROLES, &principal.role) {
        return Err(invalid(
            format!("{field}.role"),
            format!("unknown role '{}'", principal.role),
        ));
    }
    let digest = principal.password_sha256.trim();
    if digest.len() != 64 || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
        // Never echo the digest itself.
        return Err(invalid(
            format!("{field}.password_sha256"),
            "must be 64 hex characters",
        ));
    }
    Ok(())
}

fn is_known(known: &[&str], value: &str) -> bool {
    known.iter().any(|k| k.eq_ignore_ascii_case(value.trim()))
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}
