// SPDX-FileCopyrightText: 2026 Hookwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-wide map from tenant to live session.
//!
//! The map itself is private. Callers get short-lived [`SessionHandle`]
//! clones through [`SessionRegistry::acquire`]; only a session's own
//! controller removes its entry, and only if the entry still carries the
//! controller's generation.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use hookwire_core::{
    ClientParams, EventHandlerFactory, HookwireError, ProtocolClient, ProtocolClientFactory,
    SessionContext, SessionControl, TenantId, TenantRecord, TenantStore,
};

use crate::lifecycle;
use crate::state::SessionState;

/// Buffer of each session's control channel.
const CONTROL_BUFFER: usize = 4;

/// What a session is started from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSpec {
    pub tenant: TenantId,
    pub token: String,
    pub jid: Option<String>,
    pub proxy_url: Option<String>,
}

impl From<&TenantRecord> for SessionSpec {
    fn from(record: &TenantRecord) -> Self {
        Self {
            tenant: record.id,
            token: record.token.clone(),
            jid: record.jid.clone(),
            proxy_url: record.proxy_url.clone(),
        }
    }
}

/// A cloneable reference to a live session.
#[derive(Clone)]
pub struct SessionHandle {
    tenant: TenantId,
    generation: u64,
    client: Arc<dyn ProtocolClient>,
    control: SessionControl,
    state: watch::Receiver<SessionState>,
}

impl SessionHandle {
    pub fn tenant(&self) -> TenantId {
        self.tenant
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn client(&self) -> &Arc<dyn ProtocolClient> {
        &self.client
    }

    pub fn control(&self) -> &SessionControl {
        &self.control
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.client.is_connected()
    }

    pub fn is_logged_in(&self) -> bool {
        self.client.is_logged_in()
    }

    /// Waits until the session state satisfies `pred`, or `timeout` passes.
    ///
    /// Returns the state observed last.
    pub async fn wait_for_state(
        &self,
        timeout: Duration,
        pred: impl Fn(SessionState) -> bool,
    ) -> SessionState {
        let mut rx = self.state.clone();
        let _ = tokio::time::timeout(timeout, rx.wait_for(|s| pred(*s))).await;
        *rx.borrow()
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("tenant", &self.tenant)
            .field("generation", &self.generation)
            .field("state", &self.state())
            .finish()
    }
}

/// Result of [`SessionRegistry::create_if_absent`].
#[derive(Debug, Clone)]
pub struct CreateOutcome {
    /// `false` when a live session already existed and was returned unchanged.
    pub created: bool,
    pub handle: SessionHandle,
}

/// Connection booleans and lifecycle state of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub connected: bool,
    pub logged_in: bool,
    pub state: SessionState,
}

struct RegistryInner {
    sessions: DashMap<TenantId, SessionHandle>,
    factory: Arc<dyn ProtocolClientFactory>,
    handlers: Arc<dyn EventHandlerFactory>,
    store: Arc<dyn TenantStore>,
    next_generation: AtomicU64,
}

/// Registry of live tenant sessions. Cheap to clone.
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<RegistryInner>,
}

impl SessionRegistry {
    pub fn new(
        factory: Arc<dyn ProtocolClientFactory>,
        handlers: Arc<dyn EventHandlerFactory>,
        store: Arc<dyn TenantStore>,
    ) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                sessions: DashMap::new(),
                factory,
                handlers,
                store,
                next_generation: AtomicU64::new(1),
            }),
        }
    }

    pub fn store(&self) -> &Arc<dyn TenantStore> {
        &self.inner.store
    }

    /// Non-blocking lookup.
    pub fn acquire(&self, tenant: TenantId) -> Option<SessionHandle> {
        self.inner.sessions.get(&tenant).map(|h| h.clone())
    }

    /// Starts a session unless one is already live for the tenant.
    ///
    /// The check and the insert happen under the tenant's map entry lock, so
    /// concurrent callers start exactly one controller.
    pub fn create_if_absent(&self, spec: SessionSpec) -> Result<CreateOutcome, HookwireError> {
        let (handle, state_tx, control_rx) = match self.inner.sessions.entry(spec.tenant) {
            Entry::Occupied(existing) => {
                debug!(tenant_id = %spec.tenant, "session already live");
                return Ok(CreateOutcome {
                    created: false,
                    handle: existing.get().clone(),
                });
            }
            Entry::Vacant(vacant) => {
                let client = self.inner.factory.create(ClientParams {
                    tenant: spec.tenant,
                    jid: spec.jid.clone(),
                    proxy_url: spec.proxy_url.clone(),
                })?;

                let (control_tx, control_rx) = mpsc::channel(CONTROL_BUFFER);
                let control = SessionControl::new(spec.tenant, control_tx);

                let initial = if spec.jid.is_some() || client.is_logged_in() {
                    SessionState::Connecting
                } else {
                    SessionState::Unpaired
                };
                let (state_tx, state_rx) = watch::channel(initial);

                let handler = self.inner.handlers.handler_for(SessionContext {
                    tenant: spec.tenant,
                    token: spec.token.clone(),
                    client: Arc::downgrade(&client),
                    control: control.clone(),
                });
                client.subscribe_events(handler);

                let handle = SessionHandle {
                    tenant: spec.tenant,
                    generation: self.inner.next_generation.fetch_add(1, Ordering::SeqCst),
                    client,
                    control,
                    state: state_rx,
                };
                vacant.insert(handle.clone());
                (handle, state_tx, control_rx)
            }
        };

        info!(
            tenant_id = %spec.tenant,
            generation = handle.generation,
            state = %handle.state(),
            "starting session"
        );
        lifecycle::spawn(self.clone(), handle.clone(), state_tx, control_rx);

        Ok(CreateOutcome {
            created: true,
            handle,
        })
    }

    /// Sends a kill signal. Returns `false` if there was no session.
    ///
    /// The entry is removed by the controller once teardown completes.
    pub fn terminate(&self, tenant: TenantId) -> bool {
        match self.acquire(tenant) {
            Some(handle) => handle.control.kill(),
            None => false,
        }
    }

    /// Disconnects a linked, connected session and tears it down.
    pub fn disconnect(&self, tenant: TenantId) -> Result<(), HookwireError> {
        let handle = self.acquire(tenant).ok_or(HookwireError::NoSession)?;
        if !(handle.is_connected() && handle.is_logged_in()) {
            return Err(HookwireError::NotLoggedIn);
        }
        handle.control.kill();
        Ok(())
    }

    /// Requests a phone-linking code for an unpaired session and stores it
    /// as the pairing artifact.
    pub async fn pair_phone(&self, tenant: TenantId, phone: &str) -> Result<String, HookwireError> {
        let handle = self.acquire(tenant).ok_or(HookwireError::NoSession)?;
        if handle.is_logged_in() {
            return Err(HookwireError::AlreadyPaired);
        }
        let state = handle.state();
        if !state.accepts_phone_pairing() {
            return Err(HookwireError::InvalidState(format!(
                "cannot pair a session that is {state}"
            )));
        }
        let code = handle.client.pair_phone(phone).await?;
        if let Err(e) = self
            .inner
            .store
            .set_pairing_artifact(tenant, Some(&code))
            .await
        {
            warn!(tenant_id = %tenant, error = %e, "failed to persist linking code");
        }
        info!(tenant_id = %tenant, "phone linking code issued");
        Ok(code)
    }

    /// Unlinks the device and tears the session down.
    pub async fn logout(&self, tenant: TenantId) -> Result<(), HookwireError> {
        let handle = self.acquire(tenant).ok_or(HookwireError::NoSession)?;
        if !(handle.is_connected() && handle.is_logged_in()) {
            return Err(HookwireError::NotLoggedIn);
        }
        handle.client.logout().await?;
        if let Err(e) = self.inner.store.set_jid(tenant, None).await {
            warn!(tenant_id = %tenant, error = %e, "failed to clear stored identity");
        }
        handle.control.kill();
        info!(tenant_id = %tenant, "logged out");
        Ok(())
    }

    pub fn status(&self, tenant: TenantId) -> Result<SessionStatus, HookwireError> {
        let handle = self.acquire(tenant).ok_or(HookwireError::NoSession)?;
        Ok(SessionStatus {
            connected: handle.is_connected(),
            logged_in: handle.is_logged_in(),
            state: handle.state(),
        })
    }

    /// The stored pairing artifact of a connected, not yet linked session.
    pub async fn pairing_artifact(&self, tenant: TenantId) -> Result<String, HookwireError> {
        let handle = self.acquire(tenant).ok_or(HookwireError::NoSession)?;
        if !handle.is_connected() {
            return Err(HookwireError::NotConnected);
        }
        if handle.is_logged_in() {
            return Err(HookwireError::AlreadyLoggedIn);
        }
        let record = self.inner.store.get(tenant).await?;
        Ok(record.and_then(|r| r.qrcode).unwrap_or_default())
    }

    pub fn len(&self) -> usize {
        self.inner.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.sessions.is_empty()
    }

    pub fn tenant_ids(&self) -> Vec<TenantId> {
        let mut ids: Vec<_> = self.inner.sessions.iter().map(|e| *e.key()).collect();
        ids.sort();
        ids
    }

    /// Asks every controller to tear down for process exit and waits up to
    /// `timeout` for the registry to empty. Persisted connected flags are kept.
    ///
    /// Returns the number of sessions still registered when the wait ended.
    pub async fn terminate_all(&self, timeout: Duration) -> usize {
        let handles: Vec<_> = self.inner.sessions.iter().map(|e| e.value().clone()).collect();
        if handles.is_empty() {
            return 0;
        }
        info!(count = handles.len(), "stopping sessions");
        for handle in &handles {
            handle.control.shutdown();
        }

        let _ = tokio::time::timeout(timeout, async {
            while !self.is_empty() {
                tokio::time::sleep(Duration::from_millis(25)).await;
            }
        })
        .await;

        let remaining = self.len();
        if remaining > 0 {
            warn!(remaining, "sessions still registered after shutdown timeout");
        }
        remaining
    }

    /// Removes the tenant's entry if it still belongs to `generation`.
    pub(crate) fn remove_if_generation(&self, tenant: TenantId, generation: u64) -> bool {
        self.inner
            .sessions
            .remove_if(&tenant, |_, handle| handle.generation == generation)
            .is_some()
    }
}
