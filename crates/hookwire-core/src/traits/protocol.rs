// SPDX-FileCopyrightText: 2026 Hookwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Protocol client seam.
//!
//! The messaging protocol itself is a black box. A [`ProtocolClientFactory`]
//! builds one [`ProtocolClient`] per tenant session; the client pushes events
//! into the [`EventHandler`] it was given, one at a time, awaiting each.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::HookwireError;
use crate::events::{MediaRef, PairingEvent, ProtocolEvent};
use crate::traits::adapter::PluginAdapter;
use crate::types::TenantId;

/// A live protocol session for one tenant.
#[async_trait]
pub trait ProtocolClient: Send + Sync + 'static {
    /// Opens the protocol connection.
    async fn connect(&self) -> Result<(), HookwireError>;

    /// Closes the protocol connection. Does not unlink the device.
    async fn disconnect(&self) -> Result<(), HookwireError>;

    fn is_connected(&self) -> bool;

    fn is_logged_in(&self) -> bool;

    /// Display name of the linked account, if known.
    fn push_name(&self) -> Option<String>;

    /// Opens the scannable-code pairing channel. Must be called before
    /// [`connect`](Self::connect) on an unpaired client; fails with
    /// [`HookwireError::AlreadyPaired`] when an identity is already linked.
    async fn pairing_channel(&self) -> Result<mpsc::Receiver<PairingEvent>, HookwireError>;

    /// Requests a phone-linking code. Fails if already paired.
    async fn pair_phone(&self, phone: &str) -> Result<String, HookwireError>;

    /// Downloads and decrypts a media attachment.
    async fn download(&self, media: &MediaRef) -> Result<Vec<u8>, HookwireError>;

    /// Unlinks the device from the account.
    async fn logout(&self) -> Result<(), HookwireError>;

    /// Marks the account as available.
    async fn send_presence_available(&self) -> Result<(), HookwireError>;

    /// Registers the handler that receives this client's events.
    fn subscribe_events(&self, handler: Arc<dyn EventHandler>);
}

/// Receives protocol events for one session, sequentially.
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    async fn handle(&self, event: ProtocolEvent);
}

/// Inputs for building a protocol client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientParams {
    pub tenant: TenantId,
    /// Stored linked identity; `None` starts a fresh device.
    pub jid: Option<String>,
    pub proxy_url: Option<String>,
}

/// Builds protocol clients. Creation is synchronous and must not block:
/// the registry calls it while holding the tenant's map entry.
pub trait ProtocolClientFactory: PluginAdapter {
    fn create(&self, params: ClientParams) -> Result<Arc<dyn ProtocolClient>, HookwireError>;
}

/// Messages on a session's control channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    /// Tear the session down and persist it as disconnected.
    Kill,
    /// Tear the session down for process exit; the persisted connected flag
    /// is left alone so the session is restored on the next start.
    Shutdown,
}

/// Sending half of a session's control channel.
#[derive(Debug, Clone)]
pub struct SessionControl {
    tenant: TenantId,
    tx: mpsc::Sender<ControlSignal>,
}

impl SessionControl {
    pub fn new(tenant: TenantId, tx: mpsc::Sender<ControlSignal>) -> Self {
        Self { tenant, tx }
    }

    pub fn tenant(&self) -> TenantId {
        self.tenant
    }

    /// Requests termination without waiting.
    ///
    /// Returns `false` only when the controller has already exited. A full
    /// buffer means a kill is already pending, which counts as delivered.
    pub fn kill(&self) -> bool {
        self.signal(ControlSignal::Kill)
    }

    /// Requests a teardown for process exit. Same delivery rules as [`kill`](Self::kill).
    pub fn shutdown(&self) -> bool {
        self.signal(ControlSignal::Shutdown)
    }

    fn signal(&self, signal: ControlSignal) -> bool {
        match self.tx.try_send(signal) {
            Ok(()) | Err(mpsc::error::TrySendError::Full(_)) => true,
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Everything an event handler needs to act on behalf of one session.
///
/// The client is held weakly: the client owns its handler, so a strong
/// reference back would keep both alive after the registry lets go.
#[derive(Clone)]
pub struct SessionContext {
    pub tenant: TenantId,
    pub token: String,
    pub client: Weak<dyn ProtocolClient>,
    pub control: SessionControl,
}

impl SessionContext {
    /// Upgrades the client reference, if the session is still alive.
    pub fn client(&self) -> Option<Arc<dyn ProtocolClient>> {
        self.client.upgrade()
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("tenant", &self.tenant)
            .field("token", &"[redacted]")
            .field("client_alive", &(self.client.strong_count() > 0))
            .finish()
    }
}

/// Builds the per-session event handler.
pub trait EventHandlerFactory: Send + Sync + 'static {
    fn handler_for(&self, ctx: SessionContext) -> Arc<dyn EventHandler>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn kill_reports_closed_controller() {
        let (tx, rx) = mpsc::channel(1);
        let control = SessionControl::new(TenantId(1), tx);
        assert!(control.kill());
        // Buffer full: a kill is already pending.
        assert!(control.kill());
        drop(rx);
        assert!(control.is_closed());
        assert!(!control.kill());
    }
}
