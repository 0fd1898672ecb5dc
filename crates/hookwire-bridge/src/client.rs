// SPDX-FileCopyrightText: 2026 Hookwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`ProtocolClient`] for one device on the protocol sidecar.
//!
//! Commands are JSON `POST`s under `{bridge}/devices/{tenant}/`. Events come
//! back over a long-lived SSE stream read by a background task, which routes
//! pairing events to the pairing channel and awaits the subscribed handler
//! for each protocol event in order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use hookwire_core::{
    ClientParams, EventHandler, HookwireError, MediaRef, PairingEvent, ProtocolClient,
    ProtocolEvent, TenantId,
};

use crate::sse::{self, BridgeEvent};
use crate::types::{
    BridgeErrorBody, ConnectRequest, ConnectResponse, DownloadRequest, PairPhoneRequest,
    PairPhoneResponse, PresenceRequest,
};

/// Capacity of the pairing channel.
const PAIRING_BUFFER: usize = 8;

/// State shared between the client and its stream reader.
struct Shared {
    tenant: TenantId,
    connected: AtomicBool,
    logged_in: AtomicBool,
    identity: Mutex<Option<String>>,
    push_name: Mutex<Option<String>>,
    handler: Mutex<Option<Arc<dyn EventHandler>>>,
    pairing: Mutex<Option<mpsc::Sender<PairingEvent>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A device session on the protocol sidecar.
pub struct BridgeClient {
    shared: Arc<Shared>,
    device_url: String,
    proxy_url: Option<String>,
    os: String,
    http: reqwest::Client,
    stream_http: reqwest::Client,
    reader: Mutex<Option<CancellationToken>>,
}

impl BridgeClient {
    pub(crate) fn new(
        bridge_url: &str,
        os: &str,
        params: ClientParams,
        http: reqwest::Client,
        stream_http: reqwest::Client,
    ) -> Self {
        let logged_in = params.jid.is_some();
        Self {
            shared: Arc::new(Shared {
                tenant: params.tenant,
                connected: AtomicBool::new(false),
                logged_in: AtomicBool::new(logged_in),
                identity: Mutex::new(params.jid),
                push_name: Mutex::new(None),
                handler: Mutex::new(None),
                pairing: Mutex::new(None),
            }),
            device_url: format!(
                "{}/devices/{}",
                bridge_url.trim_end_matches('/'),
                params.tenant
            ),
            proxy_url: params.proxy_url,
            os: os.to_string(),
            http,
            stream_http,
            reader: Mutex::new(None),
        }
    }

    pub fn tenant(&self) -> TenantId {
        self.shared.tenant
    }

    /// Linked identity as last reported by the sidecar.
    pub fn identity(&self) -> Option<String> {
        lock(&self.shared.identity).clone()
    }

    fn url(&self, action: &str) -> String {
        format!("{}/{action}", self.device_url)
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        action: &str,
        body: &B,
    ) -> Result<reqwest::Response, HookwireError> {
        let url = self.url(action);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| HookwireError::Protocol {
                message: format!("bridge request `{action}` failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(tenant_id = %self.tenant(), action, status = %status, "bridge response");
        if status.is_success() {
            return Ok(response);
        }
        if status == reqwest::StatusCode::CONFLICT && action == "pair-phone" {
            return Err(HookwireError::AlreadyPaired);
        }
        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<BridgeErrorBody>(&body) {
            Ok(err) => format!("bridge `{action}` returned {status}: {}", err.error),
            Err(_) => format!("bridge `{action}` returned {status}: {body}"),
        };
        Err(HookwireError::protocol(message))
    }

    async fn post_json<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        action: &str,
        body: &B,
    ) -> Result<R, HookwireError> {
        let response = self.post(action, body).await?;
        response.json::<R>().await.map_err(|e| HookwireError::Protocol {
            message: format!("failed to parse bridge `{action}` response: {e}"),
            source: Some(Box::new(e)),
        })
    }

    /// Opens the event stream unless a reader is already running.
    async fn ensure_reader(&self) -> Result<(), HookwireError> {
        if lock(&self.reader).is_some() {
            return Ok(());
        }

        let url = self.url("events");
        let response = self
            .stream_http
            .get(&url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| HookwireError::Protocol {
                message: format!("failed to open event stream: {e}"),
                source: Some(Box::new(e)),
            })?;
        if !response.status().is_success() {
            return Err(HookwireError::protocol(format!(
                "event stream returned {}",
                response.status()
            )));
        }

        let cancel = CancellationToken::new();
        {
            let mut reader = lock(&self.reader);
            if reader.is_some() {
                // Lost a race with a concurrent caller; theirs wins.
                return Ok(());
            }
            *reader = Some(cancel.clone());
        }

        let shared = Arc::clone(&self.shared);
        tokio::spawn(read_events(shared, sse::parse_event_stream(response), cancel));
        Ok(())
    }

    fn stop_reader(&self) {
        if let Some(cancel) = lock(&self.reader).take() {
            cancel.cancel();
        }
        lock(&self.shared.pairing).take();
    }
}

async fn read_events(
    shared: Arc<Shared>,
    mut events: sse::BridgeEventStream,
    cancel: CancellationToken,
) {
    let tenant = shared.tenant;
    debug!(tenant_id = %tenant, "event stream opened");
    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => break,
            next = events.next() => next,
        };
        match next {
            Some(Ok(event)) => route(&shared, event).await,
            Some(Err(e)) => warn!(tenant_id = %tenant, error = %e, "bad event from bridge"),
            None => {
                warn!(tenant_id = %tenant, "event stream ended");
                break;
            }
        }
    }
    // Closing the pairing channel tells a waiting controller that pairing is over.
    lock(&shared.pairing).take();
    debug!(tenant_id = %tenant, "event stream closed");
}

async fn route(shared: &Shared, event: BridgeEvent) {
    match event {
        BridgeEvent::Pairing(pairing) => {
            if pairing == PairingEvent::Success {
                shared.logged_in.store(true, Ordering::SeqCst);
            }
            let terminal = matches!(pairing, PairingEvent::Success | PairingEvent::Timeout);
            let tx = lock(&shared.pairing).clone();
            match tx {
                Some(tx) => {
                    if tx.send(pairing).await.is_err() {
                        debug!(tenant_id = %shared.tenant, "pairing receiver gone");
                    }
                }
                None => debug!(tenant_id = %shared.tenant, "pairing event with no open channel"),
            }
            if terminal {
                lock(&shared.pairing).take();
            }
        }
        BridgeEvent::Protocol(event) => {
            match &event {
                ProtocolEvent::Connected => shared.connected.store(true, Ordering::SeqCst),
                ProtocolEvent::PairSuccess { id, .. } => {
                    *lock(&shared.identity) = Some(id.clone());
                    shared.logged_in.store(true, Ordering::SeqCst);
                }
                ProtocolEvent::LoggedOut { .. } => {
                    shared.logged_in.store(false, Ordering::SeqCst);
                    shared.connected.store(false, Ordering::SeqCst);
                }
                _ => {}
            }
            let handler = lock(&shared.handler).clone();
            match handler {
                Some(handler) => handler.handle(event).await,
                None => debug!(tenant_id = %shared.tenant, event = event.name(), "no handler subscribed"),
            }
        }
        BridgeEvent::Account {
            push_name,
            identity,
        } => {
            if push_name.is_some() {
                *lock(&shared.push_name) = push_name;
            }
            if let Some(identity) = identity {
                *lock(&shared.identity) = Some(identity);
                shared.logged_in.store(true, Ordering::SeqCst);
            }
        }
        BridgeEvent::Ping => {}
    }
}

#[async_trait]
impl ProtocolClient for BridgeClient {
    async fn connect(&self) -> Result<(), HookwireError> {
        self.ensure_reader().await?;
        let identity = self.identity();
        let resp: ConnectResponse = self
            .post_json(
                "connect",
                &ConnectRequest {
                    identity: identity.as_deref(),
                    proxy_url: self.proxy_url.as_deref(),
                    os: &self.os,
                },
            )
            .await?;

        self.shared.logged_in.store(resp.logged_in, Ordering::SeqCst);
        match resp.identity {
            Some(identity) => *lock(&self.shared.identity) = Some(identity),
            // A rejected identity must not be offered again.
            None if !resp.logged_in => {
                lock(&self.shared.identity).take();
            }
            None => {}
        }
        if resp.push_name.is_some() {
            *lock(&self.shared.push_name) = resp.push_name;
        }
        self.shared.connected.store(true, Ordering::SeqCst);
        info!(tenant_id = %self.tenant(), logged_in = resp.logged_in, "bridge device connected");
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), HookwireError> {
        self.stop_reader();
        let was_connected = self.shared.connected.swap(false, Ordering::SeqCst);
        if was_connected {
            self.post("disconnect", &serde_json::json!({})).await?;
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    fn is_logged_in(&self) -> bool {
        self.shared.logged_in.load(Ordering::SeqCst)
    }

    fn push_name(&self) -> Option<String> {
        lock(&self.shared.push_name).clone()
    }

    async fn pairing_channel(&self) -> Result<mpsc::Receiver<PairingEvent>, HookwireError> {
        if self.is_logged_in() {
            return Err(HookwireError::AlreadyPaired);
        }
        let (tx, rx) = mpsc::channel(PAIRING_BUFFER);
        *lock(&self.shared.pairing) = Some(tx);
        if let Err(e) = self.ensure_reader().await {
            lock(&self.shared.pairing).take();
            return Err(e);
        }
        Ok(rx)
    }

    async fn pair_phone(&self, phone: &str) -> Result<String, HookwireError> {
        if self.is_logged_in() {
            return Err(HookwireError::AlreadyPaired);
        }
        let resp: PairPhoneResponse = self
            .post_json("pair-phone", &PairPhoneRequest { phone })
            .await?;
        Ok(resp.code)
    }

    async fn download(&self, media: &MediaRef) -> Result<Vec<u8>, HookwireError> {
        let response = self.post("download", &DownloadRequest { media }).await?;
        let bytes = response.bytes().await.map_err(|e| HookwireError::Protocol {
            message: format!("failed to read media body: {e}"),
            source: Some(Box::new(e)),
        })?;
        Ok(bytes.to_vec())
    }

    async fn logout(&self) -> Result<(), HookwireError> {
        self.post("logout", &serde_json::json!({})).await?;
        self.shared.logged_in.store(false, Ordering::SeqCst);
        self.shared.connected.store(false, Ordering::SeqCst);
        lock(&self.shared.identity).take();
        Ok(())
    }

    async fn send_presence_available(&self) -> Result<(), HookwireError> {
        self.post("presence", &PresenceRequest { state: "available" })
            .await?;
        Ok(())
    }

    fn subscribe_events(&self, handler: Arc<dyn EventHandler>) {
        *lock(&self.shared.handler) = Some(handler);
    }
}

impl Drop for BridgeClient {
    fn drop(&mut self) {
        self.stop_reader();
    }
}
