//! End-to-end delegation scenarios.
//!
//! A human logs in, delegates to an agent, the agent sub-delegates, and
//! every hop is checked for attenuation, chain shape and expiry.

use warrant_auth::{DelegationError, DelegationRequest};
use warrant_core::{AccessTier, ActionDecision, ResourceAction, Role};
use warrant_test::{DEMO_PASSWORD, expired_human, in_memory_auth, init_test_tracing};

#[tokio::test]
async fn alice_delegates_and_sub_delegates_read_only() {
    init_test_tracing();
    let auth = in_memory_auth();

    let alice = auth.login("alice@example.com", DEMO_PASSWORD).await.unwrap();
    assert_eq!(alice.role, Role::Admin);
    assert_eq!(
        alice.permissions.get_tier("documents", ResourceAction::Delete),
        Some(AccessTier::Supervised)
    );

    let x = auth
        .delegate_to_agent(
            &alice,
            DelegationRequest::new("agent-x", "researcher", "task-42").scoped_to(["documents"]),
        )
        .await
        .unwrap();

    assert_eq!(
        auth.check_agent_action(&x, "documents", ResourceAction::Read).await,
        ActionDecision::Allowed
    );
    assert_eq!(
        auth.check_agent_action(&x, "documents", ResourceAction::Delete).await,
        ActionDecision::Supervised
    );
    assert_eq!(
        auth.check_agent_action(&x, "users", ResourceAction::Read).await,
        ActionDecision::Denied
    );

    let y = auth
        .delegate_to_sub_agent(&x, DelegationRequest::new("agent-y", "summarizer", "task-42"), true)
        .await
        .unwrap();

    assert_eq!(
        auth.check_agent_action(&y, "documents", ResourceAction::Read).await,
        ActionDecision::Allowed
    );
    assert_eq!(
        auth.check_agent_action(&y, "documents", ResourceAction::Update).await,
        ActionDecision::Denied
    );

    assert_eq!(auth.revoke_task("task-42").await.unwrap(), 2);
    assert_eq!(
        auth.agents().validate_token(&x.delegation_token).await.unwrap_err(),
        DelegationError::UnknownToken
    );
    assert_eq!(
        auth.agents().validate_token(&y.delegation_token).await.unwrap_err(),
        DelegationError::UnknownToken
    );
}

#[tokio::test]
async fn expired_human_cannot_delegate() {
    let auth = in_memory_auth();
    let stale = expired_human("usr-alice-001", Role::Admin);

    let err = auth
        .delegate_to_agent(&stale, DelegationRequest::new("agent-x", "researcher", "task-1"))
        .await
        .unwrap_err();

    assert!(matches!(err, DelegationError::ExpiredSession { ref user_id } if user_id == "usr-alice-001"));
    assert_eq!(auth.agents().active_tokens().await.unwrap(), 0);
}

#[tokio::test]
async fn unregistered_session_cannot_delegate() {
    let auth = in_memory_auth();
    // Valid deadline, but never issued by this kernel.
    let forged = warrant_test::test_human("usr-alice-001", Role::Admin);

    let err = auth
        .delegate_to_agent(&forged, DelegationRequest::new("agent-x", "researcher", "task-1"))
        .await
        .unwrap_err();
    assert!(matches!(err, DelegationError::SessionNotActive { .. }));
}

#[tokio::test]
async fn chain_grows_by_one_per_hop() {
    let auth = in_memory_auth();
    let bob = auth.login("bob@example.com", DEMO_PASSWORD).await.unwrap();

    let mut agent = auth
        .delegate_to_agent(&bob, DelegationRequest::new("agent-0", "worker", "task-deep"))
        .await
        .unwrap();
    let mut expected = vec![bob.user_id.clone(), "agent-0".to_string()];
    assert_eq!(agent.delegation_chain, expected);

    for id in ["agent-1", "agent-2", "agent-3"] {
        let child = auth
            .delegate_to_sub_agent(&agent, DelegationRequest::new(id, "worker", "task-deep"), false)
            .await
            .unwrap();

        expected.push(id.to_string());
        assert_eq!(child.delegation_chain, expected);
        assert_eq!(child.principal(), bob.user_id);
        assert_eq!(child.depth(), expected.len().saturating_sub(1));
        assert!(child.token_expires_at <= agent.token_expires_at);
        assert!(child.permissions.is_attenuation_of(&agent.permissions));
        agent = child;
    }
}

#[tokio::test]
async fn scoping_never_widens_a_viewer() {
    let auth = in_memory_auth();
    let carol = auth.login("carol@example.com", DEMO_PASSWORD).await.unwrap();

    let agent = auth
        .delegate_to_agent(
            &carol,
            DelegationRequest::new("agent-c", "reader", "task-c")
                .scoped_to(["documents", "billing", "secrets"]),
        )
        .await
        .unwrap();

    assert!(agent.permissions.is_attenuation_of(&carol.permissions));
    assert_eq!(agent.permissions.resources(), vec!["documents"]);
    for action in ResourceAction::ALL {
        if action != ResourceAction::Read {
            assert_eq!(
                auth.check_agent_action(&agent, "documents", action).await,
                ActionDecision::Denied
            );
        }
    }
}

#[tokio::test]
async fn read_only_sub_agent_is_free_to_read_supervised_resources() {
    let auth = in_memory_auth();
    let alice = auth.login("alice@example.com", DEMO_PASSWORD).await.unwrap();

    // Admin's users:create is supervised; read-only keeps only users:read.
    let x = auth
        .delegate_to_agent(
            &alice,
            DelegationRequest::new("agent-x", "admin-helper", "task-u").scoped_to(["users"]),
        )
        .await
        .unwrap();
    let y = auth
        .delegate_to_sub_agent(&x, DelegationRequest::new("agent-y", "auditor", "task-u"), true)
        .await
        .unwrap();

    assert_eq!(y.permissions.len(), 1);
    assert!(y.permissions.is_allowed("users", ResourceAction::Read));
    assert_eq!(
        auth.check_agent_action(&y, "users", ResourceAction::Delete).await,
        ActionDecision::Denied
    );
}

#[tokio::test]
async fn revoked_parent_cannot_sub_delegate() {
    let auth = in_memory_auth();
    let alice = auth.login("alice@example.com", DEMO_PASSWORD).await.unwrap();
    let x = auth
        .delegate_to_agent(&alice, DelegationRequest::new("agent-x", "general", "task-r"))
        .await
        .unwrap();

    auth.revoke_agent(&x, Some("operator stop")).await.unwrap();

    let err = auth
        .delegate_to_sub_agent(&x, DelegationRequest::new("agent-y", "general", "task-r"), false)
        .await
        .unwrap_err();
    assert!(matches!(err, DelegationError::InvalidParent { .. }));
}

#[tokio::test]
async fn deactivated_account_cannot_log_in() {
    let auth = in_memory_auth();
    let err = auth.login("dave@example.com", DEMO_PASSWORD).await.unwrap_err();
    assert!(matches!(
        err,
        warrant_auth::AuthenticationError::AccountDeactivated { .. }
    ));
}
