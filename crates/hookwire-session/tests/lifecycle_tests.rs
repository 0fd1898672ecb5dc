// SPDX-FileCopyrightText: 2026 Hookwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session registry and controller behaviour against the mock protocol client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use hookwire_auth::AuthCache;
use hookwire_core::{
    EventHandler, EventHandlerFactory, HookwireError, PairingEvent, ProtocolEvent,
    SessionContext, TenantId, TenantRecord, TenantStore,
};
use hookwire_session::qr::QR_DATA_URL_PREFIX;
use hookwire_session::{SessionRegistry, SessionSpec, SessionState, connect_on_startup};
use hookwire_test_utils::{InMemoryTenantStore, MOCK_LINKING_CODE, MockClientFactory};

const WAIT: Duration = Duration::from_secs(2);

struct NoopHandler;

#[async_trait]
impl EventHandler for NoopHandler {
    async fn handle(&self, _event: ProtocolEvent) {}
}

struct NoopHandlers;

impl EventHandlerFactory for NoopHandlers {
    fn handler_for(&self, _ctx: SessionContext) -> Arc<dyn EventHandler> {
        Arc::new(NoopHandler)
    }
}

struct Fixture {
    store: Arc<InMemoryTenantStore>,
    factory: Arc<MockClientFactory>,
    registry: SessionRegistry,
}

impl Fixture {
    fn new() -> Self {
        let store = Arc::new(InMemoryTenantStore::new());
        let factory = Arc::new(MockClientFactory::new());
        let registry = SessionRegistry::new(
            factory.clone(),
            Arc::new(NoopHandlers),
            store.clone() as Arc<dyn TenantStore>,
        );
        Self {
            store,
            factory,
            registry,
        }
    }

    fn unpaired(&self, token: &str) -> TenantRecord {
        self.store.insert("tenant", token)
    }

    async fn paired(&self, token: &str) -> TenantRecord {
        let record = self.store.insert("tenant", token);
        self.store
            .set_jid(record.id, Some("5511999@s.whatsapp.net"))
            .await
            .unwrap();
        self.store.snapshot(record.id).unwrap()
    }
}

/// Polls `check` until it holds or the wait runs out.
async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + WAIT;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_start_one_session() {
    let fx = Fixture::new();
    let record = fx.paired("tok").await;

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let registry = fx.registry.clone();
        let spec = SessionSpec::from(&record);
        tasks.push(tokio::spawn(async move {
            registry.create_if_absent(spec).unwrap().created
        }));
    }
    let mut created = 0;
    for task in tasks {
        if task.await.unwrap() {
            created += 1;
        }
    }

    assert_eq!(created, 1);
    assert_eq!(fx.factory.created_for(record.id), 1);
    assert_eq!(fx.registry.len(), 1);
}

#[tokio::test]
async fn paired_tenant_connects_and_persists_flag() {
    let fx = Fixture::new();
    let record = fx.paired("tok").await;

    let outcome = fx.registry.create_if_absent(SessionSpec::from(&record)).unwrap();
    assert!(outcome.created);
    let state = outcome
        .handle
        .wait_for_state(WAIT, |s| s == SessionState::Connected)
        .await;
    assert_eq!(state, SessionState::Connected);

    assert!(fx.store.snapshot(record.id).unwrap().connected);
    let status = fx.registry.status(record.id).unwrap();
    assert!(status.connected);
    assert!(status.logged_in);
    assert_eq!(fx.factory.client_for(record.id).unwrap().call_count("connect"), 1);
}

#[tokio::test]
async fn kill_tears_down_and_clears_flag() {
    let fx = Fixture::new();
    let record = fx.paired("tok").await;
    let handle = fx
        .registry
        .create_if_absent(SessionSpec::from(&record))
        .unwrap()
        .handle;
    handle
        .wait_for_state(WAIT, |s| s == SessionState::Connected)
        .await;

    assert!(fx.registry.terminate(record.id));
    assert!(eventually(|| fx.registry.is_empty()).await);
    assert_eq!(handle.state(), SessionState::Terminated);

    let stored = fx.store.snapshot(record.id).unwrap();
    assert!(!stored.connected);
    let client = fx.factory.client_for(record.id).unwrap();
    assert_eq!(client.call_count("disconnect"), 1);
    assert!(!fx.registry.terminate(record.id));
}

#[tokio::test]
async fn pairing_code_is_stored_and_cleared_on_timeout() {
    let fx = Fixture::new();
    let record = fx.unpaired("abc");
    let handle = fx
        .registry
        .create_if_absent(SessionSpec::from(&record))
        .unwrap()
        .handle;
    let state = handle
        .wait_for_state(WAIT, |s| s == SessionState::AwaitingPairing)
        .await;
    assert_eq!(state, SessionState::AwaitingPairing);

    let client = fx.factory.client_for(record.id).unwrap();
    assert!(client.send_pairing(PairingEvent::Code("2@abc,def".into())).await);
    assert!(
        eventually(|| fx
            .store
            .snapshot(record.id)
            .and_then(|r| r.qrcode)
            .is_some_and(|q| q.starts_with(QR_DATA_URL_PREFIX)))
        .await
    );
    let artifact = fx.registry.pairing_artifact(record.id).await.unwrap();
    assert!(artifact.starts_with(QR_DATA_URL_PREFIX));

    assert!(client.send_pairing(PairingEvent::Timeout).await);
    assert!(eventually(|| fx.registry.is_empty()).await);
    let stored = fx.store.snapshot(record.id).unwrap();
    assert_eq!(stored.qrcode, None);
    assert!(!stored.connected);
}

#[tokio::test]
async fn pairing_success_connects() {
    let fx = Fixture::new();
    let record = fx.unpaired("abc");
    let handle = fx
        .registry
        .create_if_absent(SessionSpec::from(&record))
        .unwrap()
        .handle;
    handle
        .wait_for_state(WAIT, |s| s == SessionState::AwaitingPairing)
        .await;

    let client = fx.factory.client_for(record.id).unwrap();
    client.send_pairing(PairingEvent::Code("2@abc".into())).await;
    client.set_logged_in(true);
    client.send_pairing(PairingEvent::Success).await;

    let state = handle
        .wait_for_state(WAIT, |s| s == SessionState::Connected)
        .await;
    assert_eq!(state, SessionState::Connected);
    assert!(eventually(|| fx.store.snapshot(record.id).unwrap().connected).await);
    assert_eq!(fx.store.snapshot(record.id).unwrap().qrcode, None);
    assert!(matches!(
        fx.registry.pairing_artifact(record.id).await,
        Err(HookwireError::AlreadyLoggedIn)
    ));
}

#[tokio::test]
async fn pair_phone_stores_linking_code() {
    let fx = Fixture::new();
    let record = fx.unpaired("abc");
    let handle = fx
        .registry
        .create_if_absent(SessionSpec::from(&record))
        .unwrap()
        .handle;
    handle
        .wait_for_state(WAIT, |s| s == SessionState::AwaitingPairing)
        .await;

    let code = fx.registry.pair_phone(record.id, "5511999").await.unwrap();
    assert_eq!(code, MOCK_LINKING_CODE);
    assert_eq!(
        fx.store.snapshot(record.id).unwrap().qrcode.as_deref(),
        Some(MOCK_LINKING_CODE)
    );
}

#[tokio::test]
async fn pair_phone_errors() {
    let fx = Fixture::new();
    assert!(matches!(
        fx.registry.pair_phone(TenantId(99), "1").await,
        Err(HookwireError::NoSession)
    ));

    let record = fx.paired("tok").await;
    let handle = fx
        .registry
        .create_if_absent(SessionSpec::from(&record))
        .unwrap()
        .handle;
    handle
        .wait_for_state(WAIT, |s| s == SessionState::Connected)
        .await;
    assert!(matches!(
        fx.registry.pair_phone(record.id, "1").await,
        Err(HookwireError::AlreadyPaired)
    ));
}

#[tokio::test]
async fn logout_unlinks_and_tears_down() {
    let fx = Fixture::new();
    let record = fx.paired("tok").await;
    let handle = fx
        .registry
        .create_if_absent(SessionSpec::from(&record))
        .unwrap()
        .handle;
    handle
        .wait_for_state(WAIT, |s| s == SessionState::Connected)
        .await;

    fx.registry.logout(record.id).await.unwrap();
    assert!(eventually(|| fx.registry.is_empty()).await);
    let client = fx.factory.client_for(record.id).unwrap();
    assert_eq!(client.call_count("logout"), 1);
    assert!(!fx.store.snapshot(record.id).unwrap().connected);
}

#[tokio::test]
async fn reconnect_after_logout_asks_for_pairing() {
    let fx = Fixture::new();
    let record = fx.paired("tok").await;
    let handle = fx
        .registry
        .create_if_absent(SessionSpec::from(&record))
        .unwrap()
        .handle;
    handle
        .wait_for_state(WAIT, |s| s == SessionState::Connected)
        .await;
    drop(handle);

    fx.registry.logout(record.id).await.unwrap();
    assert!(eventually(|| fx.registry.is_empty()).await);
    let stored = fx.store.snapshot(record.id).unwrap();
    assert_eq!(stored.jid, None);

    let handle = fx
        .registry
        .create_if_absent(SessionSpec::from(&stored))
        .unwrap()
        .handle;
    let state = handle
        .wait_for_state(WAIT, |s| s == SessionState::AwaitingPairing)
        .await;
    assert_eq!(state, SessionState::AwaitingPairing);
    let client = fx.factory.client_for(record.id).unwrap();
    assert_eq!(client.call_count("pairing_channel"), 1);
}

#[tokio::test]
async fn unlinked_identity_falls_back_to_pairing() {
    let fx = Fixture::new();
    let record = fx.paired("tok").await;
    fx.factory.forget_identities(true);

    let handle = fx
        .registry
        .create_if_absent(SessionSpec::from(&record))
        .unwrap()
        .handle;
    let state = handle
        .wait_for_state(WAIT, |s| s == SessionState::AwaitingPairing)
        .await;
    assert_eq!(state, SessionState::AwaitingPairing);

    assert_eq!(fx.store.snapshot(record.id).unwrap().jid, None);
    let client = fx.factory.client_for(record.id).unwrap();
    assert_eq!(client.call_count("pairing_channel"), 1);
    assert_eq!(client.call_count("connect"), 2);

    client.set_logged_in(true);
    client.send_pairing(PairingEvent::Success).await;
    let state = handle
        .wait_for_state(WAIT, |s| s == SessionState::Connected)
        .await;
    assert_eq!(state, SessionState::Connected);
}

#[tokio::test]
async fn pairing_channel_closed_while_logged_in_persists_flag() {
    let fx = Fixture::new();
    let record = fx.unpaired("abc");
    let handle = fx
        .registry
        .create_if_absent(SessionSpec::from(&record))
        .unwrap()
        .handle;
    handle
        .wait_for_state(WAIT, |s| s == SessionState::AwaitingPairing)
        .await;

    let client = fx.factory.client_for(record.id).unwrap();
    client.set_logged_in(true);
    client.close_pairing();

    let state = handle
        .wait_for_state(WAIT, |s| s == SessionState::Connected)
        .await;
    assert_eq!(state, SessionState::Connected);
    assert!(eventually(|| fx.store.snapshot(record.id).unwrap().connected).await);
}

#[tokio::test]
async fn unpaired_session_refuses_logout_and_disconnect() {
    let fx = Fixture::new();
    let record = fx.unpaired("abc");
    let handle = fx
        .registry
        .create_if_absent(SessionSpec::from(&record))
        .unwrap()
        .handle;
    handle
        .wait_for_state(WAIT, |s| s == SessionState::AwaitingPairing)
        .await;

    assert!(matches!(
        fx.registry.logout(record.id).await,
        Err(HookwireError::NotLoggedIn)
    ));
    assert!(matches!(
        fx.registry.disconnect(record.id),
        Err(HookwireError::NotLoggedIn)
    ));
    assert!(matches!(
        fx.registry.status(TenantId(42)),
        Err(HookwireError::NoSession)
    ));
    let status = fx.registry.status(record.id).unwrap();
    assert!(status.connected);
    assert!(!status.logged_in);
    assert_eq!(status.state, SessionState::AwaitingPairing);
}

#[tokio::test]
async fn failed_connect_removes_session() {
    let fx = Fixture::new();
    fx.factory.fail_connect(true);
    let record = fx.paired("tok").await;
    fx.store.set_connected(record.id, true).await.unwrap();

    fx.registry.create_if_absent(SessionSpec::from(&record)).unwrap();
    assert!(eventually(|| fx.registry.is_empty()).await);
    assert!(!fx.store.snapshot(record.id).unwrap().connected);
}

#[tokio::test]
async fn stale_controller_does_not_remove_new_session() {
    let fx = Fixture::new();
    let record = fx.paired("tok").await;

    let first = fx
        .registry
        .create_if_absent(SessionSpec::from(&record))
        .unwrap()
        .handle;
    first
        .wait_for_state(WAIT, |s| s == SessionState::Connected)
        .await;
    fx.registry.terminate(record.id);
    assert!(eventually(|| fx.registry.is_empty()).await);

    let second = fx
        .registry
        .create_if_absent(SessionSpec::from(&record))
        .unwrap();
    assert!(second.created);
    assert_ne!(second.handle.generation(), first.generation());
    second
        .handle
        .wait_for_state(WAIT, |s| s == SessionState::Connected)
        .await;
    assert_eq!(fx.registry.tenant_ids(), vec![record.id]);
}

#[tokio::test]
async fn terminate_all_keeps_connected_flags() {
    let fx = Fixture::new();
    let a = fx.paired("a").await;
    let b = fx.paired("b").await;
    for record in [&a, &b] {
        fx.registry
            .create_if_absent(SessionSpec::from(record))
            .unwrap()
            .handle
            .wait_for_state(WAIT, |s| s == SessionState::Connected)
            .await;
    }

    let remaining = fx.registry.terminate_all(WAIT).await;
    assert_eq!(remaining, 0);
    assert!(fx.store.snapshot(a.id).unwrap().connected);
    assert!(fx.store.snapshot(b.id).unwrap().connected);
}

#[tokio::test]
async fn startup_restores_connected_tenants() {
    let fx = Fixture::new();
    let restored = fx.paired("restored").await;
    fx.store.set_connected(restored.id, true).await.unwrap();
    let idle = fx.paired("idle").await;

    let auth = AuthCache::new(fx.store.clone() as Arc<dyn TenantStore>);
    let started = connect_on_startup(&fx.registry, &auth).await.unwrap();

    assert_eq!(started, 1);
    assert_eq!(fx.registry.tenant_ids(), vec![restored.id]);
    assert!(fx.registry.acquire(idle.id).is_none());
    assert_eq!(auth.get_cached("restored").unwrap().id, restored.id);
    assert_eq!(fx.store.token_lookups(), 0);
}
