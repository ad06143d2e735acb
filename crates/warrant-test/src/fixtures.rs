//! Demo principals and identity builders.

use std::sync::Arc;

use warrant_auth::{HumanIdentity, Principal, StaticCredentialStore, UnifiedAuth};
use warrant_config::{Config, PrincipalSection};
use warrant_core::{Role, Timestamp};
use warrant_crypto::{SecretToken, TokenKind};

/// Password shared by every demo principal.
pub const DEMO_PASSWORD: &str = "demo-password";

/// SHA-256 of [`DEMO_PASSWORD`], as written in config files.
pub const DEMO_PASSWORD_SHA256: &str =
    "41bd876b085d6031cb0e04de35b88d77f83a4ba39f879fee40805ac19e356023";

/// `(user_id, email, role, active)` for the demo principals.
const DEMO_PRINCIPALS: [(&str, &str, Role, bool); 4] = [
    ("usr-alice-001", "alice@example.com", Role::Admin, true),
    ("usr-bob-002", "bob@example.com", Role::Editor, true),
    ("usr-carol-003", "carol@example.com", Role::Viewer, true),
    ("usr-dave-004", "dave@example.com", Role::Editor, false),
];

/// Alice, an admin.
#[must_use]
pub fn alice() -> Principal {
    demo_principal(0)
}

/// Bob, an editor.
#[must_use]
pub fn bob() -> Principal {
    demo_principal(1)
}

/// Carol, a viewer.
#[must_use]
pub fn carol() -> Principal {
    demo_principal(2)
}

/// Dave, a deactivated editor.
#[must_use]
pub fn dave() -> Principal {
    demo_principal(3)
}

fn demo_principal(index: usize) -> Principal {
    let (user_id, email, role, active) = DEMO_PRINCIPALS[index];
    let principal = Principal::new(user_id, email, DEMO_PASSWORD, role);
    if active {
        principal
    } else {
        principal.deactivated()
    }
}

/// A credential store holding alice, bob, carol and dave.
#[must_use]
pub fn demo_credentials() -> StaticCredentialStore {
    [alice(), bob(), carol(), dave()].into_iter().collect()
}

/// A fully in-memory facade over the demo principals.
#[must_use]
pub fn in_memory_auth() -> UnifiedAuth {
    UnifiedAuth::in_memory(Arc::new(demo_credentials()))
}

/// A configuration declaring the demo principals.
#[must_use]
pub fn demo_config() -> Config {
    let mut config = Config::default();
    config.principals = DEMO_PRINCIPALS
        .iter()
        .map(|(user_id, email, role, active)| PrincipalSection {
            user_id: (*user_id).to_string(),
            email: (*email).to_string(),
            password_sha256: DEMO_PASSWORD_SHA256.to_string(),
            role: role.as_str().to_string(),
            active: *active,
        })
        .collect();
    config
}

/// A human identity with the role's preset permissions and a session one
/// hour from expiry. The session is not registered anywhere.
#[must_use]
pub fn test_human(user_id: &str, role: Role) -> HumanIdentity {
    human_expiring_at(user_id, role, Timestamp::in_future(chrono::Duration::hours(1)))
}

/// A human identity whose session expired a minute ago.
#[must_use]
pub fn expired_human(user_id: &str, role: Role) -> HumanIdentity {
    human_expiring_at(user_id, role, Timestamp::in_future(chrono::Duration::minutes(-1)))
}

fn human_expiring_at(user_id: &str, role: Role, session_expires_at: Timestamp) -> HumanIdentity {
    HumanIdentity {
        user_id: user_id.to_string(),
        email: format!("{user_id}@example.com"),
        role,
        permissions: role.preset(),
        session_token: SecretToken::generate(TokenKind::Session),
        session_expires_at,
    }
}
