//! Revocation under concurrency.
//!
//! Once `revoke_task` returns, no token of that task validates, even with
//! readers hammering the registry from other threads.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use warrant_audit::{AuditEventType, KvAuditStorage};
use warrant_auth::{DelegationError, DelegationRequest, UnifiedAuth};
use warrant_core::{ActionDecision, ResourceAction};
use warrant_crypto::{SecretToken, TokenKind};
use warrant_storage::{KvStore, MemoryKvStore};
use warrant_test::{DEMO_PASSWORD, demo_config, in_memory_auth};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn revoke_task_is_immediate_for_concurrent_readers() {
    let auth = Arc::new(in_memory_auth());
    let alice = auth.login("alice@example.com", DEMO_PASSWORD).await.unwrap();

    let mut batch = Vec::new();
    for i in 0..16 {
        let agent = auth
            .delegate_to_agent(
                &alice,
                DelegationRequest::new(format!("agent-{i}"), "worker", "task-batch"),
            )
            .await
            .unwrap();
        batch.push(agent.delegation_token);
    }
    let bystander = auth
        .delegate_to_agent(&alice, DelegationRequest::new("agent-other", "worker", "task-other"))
        .await
        .unwrap();

    let revoked = Arc::new(AtomicBool::new(false));
    let violations = Arc::new(AtomicUsize::new(0));

    let readers: Vec<_> = batch
        .iter()
        .cloned()
        .map(|token| {
            let auth = Arc::clone(&auth);
            let revoked = Arc::clone(&revoked);
            let violations = Arc::clone(&violations);
            tokio::spawn(async move {
                loop {
                    // Flag first: if revocation had already returned, the
                    // token must not validate.
                    let after = revoked.load(Ordering::SeqCst);
                    let valid = auth.agents().validate_token(&token).await.is_ok();
                    if after && valid {
                        violations.fetch_add(1, Ordering::SeqCst);
                    }
                    if after {
                        break;
                    }
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    tokio::task::yield_now().await;
    let count = auth.revoke_task("task-batch").await.unwrap();
    revoked.store(true, Ordering::SeqCst);

    for reader in readers {
        reader.await.unwrap();
    }

    assert_eq!(count, 16);
    assert_eq!(violations.load(Ordering::SeqCst), 0);
    for token in &batch {
        assert_eq!(
            auth.agents().validate_token(token).await.unwrap_err(),
            DelegationError::UnknownToken
        );
    }
    assert!(auth.agents().validate_token(&bystander.delegation_token).await.is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_delegations_get_distinct_tokens() {
    let auth = Arc::new(in_memory_auth());
    let alice = Arc::new(auth.login("alice@example.com", DEMO_PASSWORD).await.unwrap());

    let handles: Vec<_> = (0..32)
        .map(|i| {
            let auth = Arc::clone(&auth);
            let alice = Arc::clone(&alice);
            tokio::spawn(async move {
                auth.delegate_to_agent(
                    &alice,
                    DelegationRequest::new(format!("agent-{i}"), "worker", "task-par"),
                )
                .await
                .unwrap()
                .delegation_token
            })
        })
        .collect();

    let tokens: Vec<_> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();
    let distinct: std::collections::HashSet<_> = tokens.iter().collect();
    assert_eq!(distinct.len(), 32);
    assert_eq!(auth.agents().active_tokens().await.unwrap(), 32);
}

#[tokio::test]
async fn revocation_is_shared_through_a_common_store() {
    let store: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
    let config = demo_config();
    let east = UnifiedAuth::from_config_with_stores(
        &config,
        Arc::clone(&store),
        Arc::new(KvAuditStorage::in_memory()),
    )
    .await
    .unwrap();
    let west = UnifiedAuth::from_config_with_stores(
        &config,
        store,
        Arc::new(KvAuditStorage::in_memory()),
    )
    .await
    .unwrap();

    let alice = east.login("alice@example.com", DEMO_PASSWORD).await.unwrap();
    // West sees east's session and can delegate from it.
    let agent = west
        .delegate_to_agent(&alice, DelegationRequest::new("agent-x", "worker", "task-shared"))
        .await
        .unwrap();
    assert!(east.agents().validate_token(&agent.delegation_token).await.is_ok());

    assert_eq!(east.revoke_task("task-shared").await.unwrap(), 1);
    assert_eq!(
        west.agents().validate_token(&agent.delegation_token).await.unwrap_err(),
        DelegationError::UnknownToken
    );
}

#[tokio::test]
async fn purge_removes_only_expired_tokens() {
    let auth = in_memory_auth();
    let alice = auth.login("alice@example.com", DEMO_PASSWORD).await.unwrap();
    auth.delegate_to_agent(&alice, DelegationRequest::new("agent-x", "worker", "task-p"))
        .await
        .unwrap();

    assert_eq!(auth.agents().purge_expired().await.unwrap(), 0);
    assert_eq!(auth.agents().active_tokens().await.unwrap(), 1);
}

#[tokio::test]
async fn revoked_and_forged_tokens_are_denied_at_the_boundary() {
    let auth = in_memory_auth();
    let alice = auth.login("alice@example.com", DEMO_PASSWORD).await.unwrap();
    let agent = auth
        .delegate_to_agent(&alice, DelegationRequest::new("agent-x", "worker", "task-b"))
        .await
        .unwrap();
    assert_eq!(
        auth.authorize(&agent.delegation_token, "documents", ResourceAction::Read)
            .await,
        ActionDecision::Allowed
    );

    auth.revoke_agent(&agent, None).await.unwrap();
    let forged = SecretToken::generate(TokenKind::Agent);
    for token in [&agent.delegation_token, &forged] {
        assert_eq!(
            auth.authorize(token, "documents", ResourceAction::Read).await,
            ActionDecision::Denied
        );
    }

    let entries = auth.audit_log().entries().await.unwrap();
    let denials: Vec<_> = entries
        .iter()
        .filter(|e| e.event_type == AuditEventType::PermissionDenied)
        .collect();
    assert_eq!(denials.len(), 2);
    assert!(denials.iter().all(|e| e.actor_id == "unknown"));
    assert_eq!(denials[1].details["token"], forged.fingerprint());
}
