// SPDX-FileCopyrightText: 2026 Hookwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end pipeline tests: protocol event in, recorded delivery out.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;

use hookwire_auth::AuthCache;
use hookwire_config::model::DeliveryConfig;
use hookwire_core::events::{
    MessageEvent, MessageInfo, PresenceEvent, ReceiptEvent, ReceiptKind,
};
use hookwire_core::{
    ControlSignal, DeliveryMode, EventHandler, EventHandlerFactory, EventType, MediaKind, MediaRef,
    ProtocolClient, ProtocolEvent, SessionContext, SessionControl, Subscriptions, TenantId,
    TenantRecord, TenantStore,
};
use hookwire_dispatch::payload::is_clean;
use hookwire_dispatch::{DeliveryQueue, EventPipeline};
use hookwire_test_utils::{InMemoryTenantStore, MockProtocolClient, RecordingSink};

struct Fixture {
    store: Arc<InMemoryTenantStore>,
    auth: Arc<AuthCache>,
    sink: Arc<RecordingSink>,
    client: Arc<MockProtocolClient>,
    /// Strong reference standing in for the registry's ownership of the client.
    _owner: Arc<dyn ProtocolClient>,
    handler: Arc<dyn EventHandler>,
    control_rx: mpsc::Receiver<ControlSignal>,
    tenant: TenantRecord,
    files: tempfile::TempDir,
    pipeline: EventPipeline,
}

async fn fixture(webhook: &str) -> Fixture {
    let store = Arc::new(InMemoryTenantStore::new());
    // Tenant ids start at 1; burn two so the tenant under test is 3.
    store.insert("one", "t1");
    store.insert("two", "t2");
    let tenant = store.insert("three", "abc");
    let auth = Arc::new(AuthCache::new(store.clone()));
    auth.resolve("abc").await.unwrap();
    auth.set_webhook(tenant.id, "abc", webhook).await.unwrap();

    let sink = Arc::new(RecordingSink::new());
    let (queue, _handle) = DeliveryQueue::start(sink.clone(), &DeliveryConfig::default());
    let files = tempfile::tempdir().unwrap();
    let pipeline = EventPipeline::new(auth.clone(), queue, files.path(), "http://gw.local:8080/");

    let client = Arc::new(MockProtocolClient::new(tenant.id, true));
    client.set_push_name(Some("Acme"));
    let as_dyn: Arc<dyn ProtocolClient> = client.clone();
    let (control_tx, control_rx) = mpsc::channel(1);
    let handler = pipeline.handler_for(SessionContext {
        tenant: tenant.id,
        token: "abc".into(),
        client: Arc::downgrade(&as_dyn),
        control: SessionControl::new(tenant.id, control_tx),
    });
    client.subscribe_events(handler.clone());

    Fixture {
        store,
        auth,
        sink,
        client,
        _owner: as_dyn,
        handler,
        control_rx,
        tenant,
        files,
        pipeline,
    }
}

fn message(id: &str, media: Option<MediaRef>) -> ProtocolEvent {
    ProtocolEvent::Message(MessageEvent {
        info: MessageInfo {
            id: id.into(),
            chat: "5511@s.whatsapp.net".into(),
            sender: "5511@s.whatsapp.net".into(),
            is_from_me: false,
            is_group: false,
            push_name: "Bob".into(),
            timestamp: Utc::now(),
        },
        message: serde_json::json!({
            "conversation": "hi",
            "jpegThumbnail": "data:image/jpeg;base64,/9j/4AAQ"
        }),
        media,
    })
}

fn parse(json_data: &str) -> serde_json::Value {
    serde_json::from_str(json_data).unwrap()
}

#[tokio::test]
async fn image_message_is_saved_and_referenced_by_url() {
    let fx = fixture("http://hooks.local/in").await;
    fx.client.set_media(b"\xff\xd8\xff\xe0jpeg");
    assert_eq!(fx.tenant.id, TenantId(3));

    fx.client
        .emit(message(
            "3EB0MSG",
            Some(MediaRef {
                kind: MediaKind::Image,
                mime_type: "image/jpeg".into(),
                file_name: None,
                handle: serde_json::json!({"directPath": "/v/t62"}),
            }),
        ))
        .await;

    let saved = fx.files.path().join("user_3").join("3EB0MSG.jpg");
    assert_eq!(std::fs::read(&saved).unwrap(), b"\xff\xd8\xff\xe0jpeg");

    let deliveries = fx.sink.wait_for(1, Duration::from_secs(2)).await;
    assert_eq!(deliveries.len(), 1);
    let delivery = &deliveries[0];
    assert_eq!(delivery.event_type, EventType::Message);
    assert_eq!(delivery.token, "abc");
    match &delivery.mode {
        DeliveryMode::FileReference { file_path, file_url } => {
            assert_eq!(file_path, &saved);
            assert_eq!(file_url, "http://gw.local:8080/files/user_3/3EB0MSG.jpg");
        }
        other => panic!("expected file reference, got {other:?}"),
    }

    let payload = parse(&delivery.json_data);
    assert_eq!(payload["type"], "Message");
    assert_eq!(payload["mimeType"], "image/jpeg");
    assert_eq!(payload["fileName"], "3EB0MSG.jpg");
    assert!(payload.get("base64").is_none());
    assert!(payload["event"]["message"].get("jpegThumbnail").is_none());
    assert!(is_clean(&payload));
}

#[tokio::test]
async fn text_message_uses_form_delivery() {
    let fx = fixture("http://hooks.local/in").await;
    fx.handler.handle(message("M2", None)).await;

    let deliveries = fx.sink.wait_for(1, Duration::from_secs(2)).await;
    assert_eq!(deliveries[0].mode, DeliveryMode::Form);
    assert!(is_clean(&parse(&deliveries[0].json_data)));
    assert_eq!(fx.client.call_count("download"), 0);
}

#[tokio::test]
async fn unsubscribed_types_are_not_delivered() {
    let fx = fixture("http://hooks.local/in").await;
    fx.auth
        .set_subscriptions(fx.tenant.id, "abc", Subscriptions::parse(["Message"]))
        .await
        .unwrap();

    fx.handler
        .handle(ProtocolEvent::Receipt(ReceiptEvent {
            kind: ReceiptKind::Read,
            chat: "c".into(),
            sender: "s".into(),
            message_ids: vec!["M1".into()],
            timestamp: Utc::now(),
        }))
        .await;
    fx.handler.handle(message("M3", None)).await;

    let deliveries = fx.sink.wait_for(1, Duration::from_secs(2)).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(fx.sink.count(), 1);
    assert_eq!(deliveries[0].event_type, EventType::Message);
}

#[tokio::test]
async fn wildcard_delivers_receipts_and_presence_with_state() {
    let fx = fixture("http://hooks.local/in").await;
    fx.handler
        .handle(ProtocolEvent::Receipt(ReceiptEvent {
            kind: ReceiptKind::Delivered,
            chat: "c".into(),
            sender: "s".into(),
            message_ids: vec!["M1".into()],
            timestamp: Utc::now(),
        }))
        .await;
    fx.handler
        .handle(ProtocolEvent::Presence(PresenceEvent {
            from: "5511@s.whatsapp.net".into(),
            unavailable: true,
            last_seen: None,
        }))
        .await;

    let deliveries = fx.sink.wait_for(2, Duration::from_secs(2)).await;
    let states: Vec<_> = deliveries
        .iter()
        .map(|d| parse(&d.json_data)["state"].as_str().unwrap().to_string())
        .collect();
    assert!(states.contains(&"Delivered".to_string()));
    assert!(states.contains(&"offline".to_string()));
}

#[tokio::test]
async fn no_webhook_means_no_delivery() {
    let fx = fixture("").await;
    fx.handler.handle(message("M4", None)).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(fx.sink.count(), 0);
}

#[tokio::test]
async fn connected_marks_available_and_persists_flag() {
    let fx = fixture("http://hooks.local/in").await;
    fx.handler.handle(ProtocolEvent::Connected).await;

    assert_eq!(fx.client.call_count("send_presence_available"), 1);
    assert!(fx.store.snapshot(fx.tenant.id).unwrap().connected);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(fx.sink.count(), 0);
}

#[tokio::test]
async fn pair_success_updates_store_and_cache() {
    let fx = fixture("http://hooks.local/in").await;
    fx.handler
        .handle(ProtocolEvent::PairSuccess {
            id: "5511999@s.whatsapp.net".into(),
            business_name: String::new(),
            platform: "android".into(),
        })
        .await;

    assert_eq!(
        fx.store.snapshot(fx.tenant.id).unwrap().jid.as_deref(),
        Some("5511999@s.whatsapp.net")
    );
    assert_eq!(
        fx.auth.get_cached("abc").unwrap().jid.as_deref(),
        Some("5511999@s.whatsapp.net")
    );
}

#[tokio::test]
async fn remote_logout_kills_session_and_clears_flag() {
    let mut fx = fixture("http://hooks.local/in").await;
    fx.store.set_connected(fx.tenant.id, true).await.unwrap();

    fx.handler
        .handle(ProtocolEvent::LoggedOut {
            on_connect: false,
            reason: Some("401".into()),
        })
        .await;

    assert_eq!(fx.control_rx.recv().await, Some(ControlSignal::Kill));
    assert!(!fx.store.snapshot(fx.tenant.id).unwrap().connected);
}

#[tokio::test]
async fn remote_logout_forgets_linked_identity() {
    let fx = fixture("http://hooks.local/in").await;
    fx.auth
        .set_identity(fx.tenant.id, "abc", Some("5511999@s.whatsapp.net"))
        .await
        .unwrap();

    fx.handler
        .handle(ProtocolEvent::LoggedOut {
            on_connect: true,
            reason: None,
        })
        .await;

    assert_eq!(fx.store.snapshot(fx.tenant.id).unwrap().jid, None);
    assert_eq!(fx.auth.get_cached("abc").unwrap().jid, None);
}

#[tokio::test]
async fn history_sync_is_dumped_and_delivered() {
    let fx = fixture("http://hooks.local/in").await;
    fx.handler
        .handle(ProtocolEvent::HistorySync {
            data: serde_json::json!({"conversations": [{"id": "c1"}]}),
        })
        .await;

    let dir = fx.files.path().join("user_3");
    let dumps: Vec<_> = std::fs::read_dir(&dir)
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().starts_with("history-"))
        .collect();
    assert_eq!(dumps.len(), 1);

    let deliveries = fx.sink.wait_for(1, Duration::from_secs(2)).await;
    assert_eq!(deliveries[0].event_type, EventType::HistorySync);
}

#[tokio::test]
async fn api_notify_respects_subscriptions() {
    let fx = fixture("http://hooks.local/in").await;
    let info = fx.auth.resolve("abc").await.unwrap();
    assert!(fx.pipeline.notify(&info, EventType::Disconnected));

    fx.auth
        .set_subscriptions(fx.tenant.id, "abc", Subscriptions::parse(["Message"]))
        .await
        .unwrap();
    let info = fx.auth.resolve("abc").await.unwrap();
    assert!(!fx.pipeline.notify(&info, EventType::LoggedOut));

    let deliveries = fx.sink.wait_for(1, Duration::from_secs(2)).await;
    let payload = parse(&deliveries[0].json_data);
    assert_eq!(payload["type"], "Disconnected");
    assert_eq!(payload["event"], serde_json::json!({}));
}

#[tokio::test]
async fn unknown_events_are_dropped() {
    let fx = fixture("http://hooks.local/in").await;
    fx.handler
        .handle(ProtocolEvent::Unknown {
            name: "Blocklist".into(),
        })
        .await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(fx.sink.count(), 0);
}
