// SPDX-FileCopyrightText: 2026 Hookwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-tenant connection lifecycle controller.
//!
//! Each session runs one controller task that owns the pairing channel and
//! the control channel:
//!
//! ```text
//! Unpaired --> AwaitingPairing --> Connected --> Terminated
//!     \              ^                 ^
//!      \--> Connecting ----------------/
//! ```
//!
//! `Connecting` falls back to `AwaitingPairing` when the stored identity
//! is no longer linked. Any state may move to `Terminated`. The controller runs inside a
//! supervisor task, so an error or a panic still ends in teardown and the
//! registry entry is removed.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use hookwire_core::{
    ControlSignal, HookwireError, PairingEvent, ProtocolClient, TenantId, TenantStore,
};

use crate::qr;
use crate::registry::{SessionHandle, SessionRegistry};
use crate::state::SessionState;

/// How a controller finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    /// Killed or failed: persist `connected = false`.
    Disconnected,
    /// Process exit: keep the persisted flag for reconnection.
    Shutdown,
}

struct Controller {
    handle: SessionHandle,
    store: Arc<dyn TenantStore>,
    state_tx: Arc<watch::Sender<SessionState>>,
    control_rx: mpsc::Receiver<ControlSignal>,
}

/// Spawns the controller and its supervisor.
pub(crate) fn spawn(
    registry: SessionRegistry,
    handle: SessionHandle,
    state_tx: watch::Sender<SessionState>,
    control_rx: mpsc::Receiver<ControlSignal>,
) {
    let store = registry.store().clone();
    let state_tx = Arc::new(state_tx);
    let controller = Controller {
        handle: handle.clone(),
        store: store.clone(),
        state_tx: Arc::clone(&state_tx),
        control_rx,
    };
    let inner = tokio::spawn(controller.run());

    tokio::spawn(async move {
        let exit = match inner.await {
            Ok(exit) => exit,
            Err(e) => {
                if e.is_panic() {
                    error!(tenant_id = %handle.tenant(), "session controller panicked");
                } else {
                    warn!(tenant_id = %handle.tenant(), "session controller cancelled");
                }
                Exit::Disconnected
            }
        };
        teardown(&registry, &handle, &store, &state_tx, exit).await;
    });
}

impl Controller {
    fn tenant(&self) -> TenantId {
        self.handle.tenant()
    }

    fn client(&self) -> &Arc<dyn ProtocolClient> {
        self.handle.client()
    }

    fn set_state(&self, next: SessionState) -> Result<(), HookwireError> {
        let current = *self.state_tx.borrow();
        let next = current.transition(next)?;
        self.state_tx.send_replace(next);
        debug!(tenant_id = %self.tenant(), from = %current, to = %next, "session state changed");
        Ok(())
    }

    async fn run(mut self) -> Exit {
        match self.drive().await {
            Ok(exit) => exit,
            Err(e) => {
                error!(tenant_id = %self.tenant(), error = %e, "session failed");
                Exit::Disconnected
            }
        }
    }

    async fn drive(&mut self) -> Result<Exit, HookwireError> {
        let initial = *self.state_tx.borrow();
        match initial {
            SessionState::Unpaired => {
                if let Some(exit) = self.pair().await? {
                    return Ok(exit);
                }
            }
            SessionState::Connecting => {
                self.client().connect().await?;
                if self.client().is_logged_in() {
                    self.set_state(SessionState::Connected)?;
                    self.persist_connected(true).await;
                    info!(tenant_id = %self.tenant(), "session connected");
                } else if let Some(exit) = self.relink().await? {
                    return Ok(exit);
                }
            }
            other => {
                return Err(HookwireError::InvalidState(format!(
                    "controller cannot start from {other}"
                )));
            }
        }
        Ok(self.wait_for_signal().await)
    }

    /// Runs the pairing flow. Returns `Some(exit)` if the session ended
    /// before pairing completed.
    async fn pair(&mut self) -> Result<Option<Exit>, HookwireError> {
        let pairing = match self.client().pairing_channel().await {
            Ok(rx) => rx,
            Err(HookwireError::AlreadyPaired) => {
                debug!(tenant_id = %self.tenant(), "client already paired, connecting directly");
                self.set_state(SessionState::Connecting)?;
                self.client().connect().await?;
                self.set_state(SessionState::Connected)?;
                self.persist_connected(true).await;
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        self.await_pairing(pairing).await
    }

    /// The stored identity was rejected on connect: forget it and pair the
    /// device again on a fresh connection.
    async fn relink(&mut self) -> Result<Option<Exit>, HookwireError> {
        warn!(tenant_id = %self.tenant(), "stored identity is no longer linked, pairing again");
        if let Err(e) = self.store.set_jid(self.tenant(), None).await {
            error!(tenant_id = %self.tenant(), error = %e, "failed to clear stored identity");
        }
        self.client().disconnect().await?;
        let pairing = self.client().pairing_channel().await?;
        self.await_pairing(pairing).await
    }

    async fn await_pairing(
        &mut self,
        mut pairing: mpsc::Receiver<PairingEvent>,
    ) -> Result<Option<Exit>, HookwireError> {
        // The pairing channel must be open before the connection is.
        self.client().connect().await?;
        self.set_state(SessionState::AwaitingPairing)?;
        info!(tenant_id = %self.tenant(), "awaiting pairing");

        loop {
            tokio::select! {
                signal = self.control_rx.recv() => {
                    return Ok(Some(exit_for(signal)));
                }
                event = pairing.recv() => match event {
                    Some(PairingEvent::Code(code)) => {
                        match qr::render_data_url(&code) {
                            Ok(artifact) => {
                                self.persist_artifact(Some(&artifact)).await;
                                info!(tenant_id = %self.tenant(), "pairing code refreshed");
                            }
                            Err(e) => warn!(tenant_id = %self.tenant(), error = %e, "failed to render pairing code"),
                        }
                    }
                    Some(PairingEvent::Timeout) => {
                        info!(tenant_id = %self.tenant(), "pairing timed out");
                        self.persist_artifact(None).await;
                        self.handle.control().kill();
                    }
                    Some(PairingEvent::Success) => {
                        info!(tenant_id = %self.tenant(), "pairing succeeded");
                        self.persist_artifact(None).await;
                        self.persist_connected(true).await;
                        self.set_state(SessionState::Connected)?;
                        return Ok(None);
                    }
                    Some(PairingEvent::Error(message)) => {
                        warn!(tenant_id = %self.tenant(), error = %message, "pairing error");
                    }
                    None => {
                        if self.client().is_logged_in() {
                            self.persist_artifact(None).await;
                            self.persist_connected(true).await;
                            self.set_state(SessionState::Connected)?;
                            return Ok(None);
                        }
                        warn!(tenant_id = %self.tenant(), "pairing channel closed before pairing completed");
                        return Ok(Some(Exit::Disconnected));
                    }
                }
            }
        }
    }

    async fn wait_for_signal(&mut self) -> Exit {
        exit_for(self.control_rx.recv().await)
    }

    async fn persist_connected(&self, connected: bool) {
        if let Err(e) = self.store.set_connected(self.tenant(), connected).await {
            error!(tenant_id = %self.tenant(), error = %e, "failed to persist connected flag");
        }
    }

    async fn persist_artifact(&self, artifact: Option<&str>) {
        if let Err(e) = self.store.set_pairing_artifact(self.tenant(), artifact).await {
            error!(tenant_id = %self.tenant(), error = %e, "failed to persist pairing artifact");
        }
    }
}

fn exit_for(signal: Option<ControlSignal>) -> Exit {
    match signal {
        Some(ControlSignal::Shutdown) => Exit::Shutdown,
        Some(ControlSignal::Kill) | None => Exit::Disconnected,
    }
}

async fn teardown(
    registry: &SessionRegistry,
    handle: &SessionHandle,
    store: &Arc<dyn TenantStore>,
    state_tx: &watch::Sender<SessionState>,
    exit: Exit,
) {
    let tenant = handle.tenant();

    if let Err(e) = handle.client().disconnect().await {
        warn!(tenant_id = %tenant, error = %e, "disconnect failed during teardown");
    }
    if let Err(e) = store.set_pairing_artifact(tenant, None).await {
        warn!(tenant_id = %tenant, error = %e, "failed to clear pairing artifact");
    }
    if exit == Exit::Disconnected
        && let Err(e) = store.set_connected(tenant, false).await
    {
        warn!(tenant_id = %tenant, error = %e, "failed to persist connected flag");
    }

    state_tx.send_replace(SessionState::Terminated);
    let removed = registry.remove_if_generation(tenant, handle.generation());
    info!(tenant_id = %tenant, ?exit, removed, "session terminated");
}
