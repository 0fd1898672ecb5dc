// SPDX-FileCopyrightText: 2026 Hookwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scriptable protocol client.
//!
//! A `MockProtocolClient` never talks to a network. Tests drive it by
//! emitting [`ProtocolEvent`]s into the registered handler and pushing
//! [`PairingEvent`]s down the pairing channel; every trait call is recorded
//! for later assertion.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use hookwire_core::{
    AdapterType, ClientParams, EventHandler, HealthStatus, HookwireError, MediaRef, PairingEvent,
    PluginAdapter, ProtocolClient, ProtocolClientFactory, ProtocolEvent, TenantId,
};

/// Linking code returned by [`MockProtocolClient::pair_phone`].
pub const MOCK_LINKING_CODE: &str = "ABCD-1234";

/// A protocol client whose behaviour is controlled by the test.
pub struct MockProtocolClient {
    tenant: TenantId,
    connected: AtomicBool,
    logged_in: AtomicBool,
    fail_connect: AtomicBool,
    push_name: Mutex<Option<String>>,
    media: Mutex<Vec<u8>>,
    handler: Mutex<Option<Arc<dyn EventHandler>>>,
    pairing: Mutex<Option<mpsc::Sender<PairingEvent>>>,
    calls: Mutex<Vec<String>>,
}

impl MockProtocolClient {
    /// A client for `tenant`; `logged_in` mirrors whether an identity is stored.
    pub fn new(tenant: TenantId, logged_in: bool) -> Self {
        Self {
            tenant,
            connected: AtomicBool::new(false),
            logged_in: AtomicBool::new(logged_in),
            fail_connect: AtomicBool::new(false),
            push_name: Mutex::new(None),
            media: Mutex::new(b"media-bytes".to_vec()),
            handler: Mutex::new(None),
            pairing: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn tenant(&self) -> TenantId {
        self.tenant
    }

    pub fn set_logged_in(&self, logged_in: bool) {
        self.logged_in.store(logged_in, Ordering::SeqCst);
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Makes the next `connect` calls fail.
    pub fn fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }

    pub fn set_push_name(&self, name: Option<&str>) {
        *lock(&self.push_name) = name.map(str::to_string);
    }

    /// Bytes returned by `download`.
    pub fn set_media(&self, bytes: &[u8]) {
        *lock(&self.media) = bytes.to_vec();
    }

    /// Delivers `event` to the registered handler and waits for it to finish.
    ///
    /// Returns `false` if no handler has been registered.
    pub async fn emit(&self, event: ProtocolEvent) -> bool {
        let handler = lock(&self.handler).clone();
        match handler {
            Some(handler) => {
                handler.handle(event).await;
                true
            }
            None => false,
        }
    }

    /// Pushes an event onto the open pairing channel.
    ///
    /// Returns `false` if no channel is open or the receiver is gone.
    pub async fn send_pairing(&self, event: PairingEvent) -> bool {
        let tx = lock(&self.pairing).clone();
        match tx {
            Some(tx) => tx.send(event).await.is_ok(),
            None => false,
        }
    }

    /// Closes the pairing channel from the client side.
    pub fn close_pairing(&self) {
        lock(&self.pairing).take();
    }

    pub fn has_handler(&self) -> bool {
        lock(&self.handler).is_some()
    }

    /// Every trait method invoked so far, in order.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    /// How many times `name` was invoked.
    pub fn call_count(&self, name: &str) -> usize {
        lock(&self.calls).iter().filter(|c| *c == name).count()
    }

    fn record(&self, name: &str) {
        lock(&self.calls).push(name.to_string());
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl ProtocolClient for MockProtocolClient {
    async fn connect(&self) -> Result<(), HookwireError> {
        self.record("connect");
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(HookwireError::protocol("mock connect failure"));
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), HookwireError> {
        self.record("disconnect");
        self.connected.store(false, Ordering::SeqCst);
        lock(&self.pairing).take();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn is_logged_in(&self) -> bool {
        self.logged_in.load(Ordering::SeqCst)
    }

    fn push_name(&self) -> Option<String> {
        lock(&self.push_name).clone()
    }

    async fn pairing_channel(&self) -> Result<mpsc::Receiver<PairingEvent>, HookwireError> {
        self.record("pairing_channel");
        if self.is_logged_in() {
            return Err(HookwireError::AlreadyPaired);
        }
        let (tx, rx) = mpsc::channel(8);
        *lock(&self.pairing) = Some(tx);
        Ok(rx)
    }

    async fn pair_phone(&self, _phone: &str) -> Result<String, HookwireError> {
        self.record("pair_phone");
        if self.is_logged_in() {
            return Err(HookwireError::AlreadyPaired);
        }
        Ok(MOCK_LINKING_CODE.to_string())
    }

    async fn download(&self, _media: &MediaRef) -> Result<Vec<u8>, HookwireError> {
        self.record("download");
        Ok(lock(&self.media).clone())
    }

    async fn logout(&self) -> Result<(), HookwireError> {
        self.record("logout");
        self.logged_in.store(false, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn send_presence_available(&self) -> Result<(), HookwireError> {
        self.record("send_presence_available");
        Ok(())
    }

    fn subscribe_events(&self, handler: Arc<dyn EventHandler>) {
        *lock(&self.handler) = Some(handler);
    }
}

/// Factory that hands out [`MockProtocolClient`]s and remembers them.
#[derive(Default)]
pub struct MockClientFactory {
    created: Mutex<Vec<Arc<MockProtocolClient>>>,
    fail_connect: AtomicBool,
    forget_identities: AtomicBool,
}

impl MockClientFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every client created from now on fails to connect.
    pub fn fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }

    /// Clients created from now on start logged out even when an identity
    /// is stored, as if the device was unlinked from the phone.
    pub fn forget_identities(&self, forget: bool) {
        self.forget_identities.store(forget, Ordering::SeqCst);
    }

    /// The most recently created client for `tenant`.
    pub fn client_for(&self, tenant: TenantId) -> Option<Arc<MockProtocolClient>> {
        lock(&self.created)
            .iter()
            .rev()
            .find(|c| c.tenant() == tenant)
            .cloned()
    }

    /// How many clients were created for `tenant`.
    pub fn created_for(&self, tenant: TenantId) -> usize {
        lock(&self.created)
            .iter()
            .filter(|c| c.tenant() == tenant)
            .count()
    }
}

#[async_trait]
impl PluginAdapter for MockClientFactory {
    fn name(&self) -> &str {
        "mock-protocol"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Protocol
    }

    async fn health_check(&self) -> Result<HealthStatus, HookwireError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), HookwireError> {
        Ok(())
    }
}

impl ProtocolClientFactory for MockClientFactory {
    fn create(&self, params: ClientParams) -> Result<Arc<dyn ProtocolClient>, HookwireError> {
        let logged_in = params.jid.is_some() && !self.forget_identities.load(Ordering::SeqCst);
        let client = Arc::new(MockProtocolClient::new(params.tenant, logged_in));
        client.fail_connect(self.fail_connect.load(Ordering::SeqCst));
        lock(&self.created).push(client.clone());
        Ok(client)
    }
}
