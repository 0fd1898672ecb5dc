// SPDX-FileCopyrightText: 2026 Hookwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `HashMap`-backed tenant store.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use hookwire_core::{
    AdapterType, HealthStatus, HookwireError, NewTenant, PluginAdapter, TenantId, TenantRecord,
    TenantStore,
};

/// In-memory tenant store with the same single-attribute update semantics
/// as the SQLite store.
#[derive(Default)]
pub struct InMemoryTenantStore {
    tenants: Mutex<HashMap<TenantId, TenantRecord>>,
    next_id: Mutex<i64>,
    token_lookups: AtomicUsize,
    fail_writes: AtomicBool,
}

impl InMemoryTenantStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provisions a tenant synchronously and returns it.
    pub fn insert(&self, name: &str, token: &str) -> TenantRecord {
        let mut next = self.next_id.lock().unwrap_or_else(|p| p.into_inner());
        *next += 1;
        let record = TenantRecord {
            id: TenantId(*next),
            name: name.to_string(),
            token: token.to_string(),
            jid: None,
            webhook: String::new(),
            events: String::new(),
            proxy_url: None,
            connected: false,
            qrcode: None,
        };
        self.lock().insert(record.id, record.clone());
        record
    }

    /// Current stored row for `id`.
    pub fn snapshot(&self, id: TenantId) -> Option<TenantRecord> {
        self.lock().get(&id).cloned()
    }

    /// Number of `find_by_token` calls served.
    pub fn token_lookups(&self) -> usize {
        self.token_lookups.load(Ordering::SeqCst)
    }

    /// Makes every setter fail with a storage error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<TenantId, TenantRecord>> {
        self.tenants.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn update(
        &self,
        id: TenantId,
        apply: impl FnOnce(&mut TenantRecord),
    ) -> Result<(), HookwireError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(HookwireError::Storage {
                source: "write failure injected".into(),
            });
        }
        if let Some(record) = self.lock().get_mut(&id) {
            apply(record);
        }
        Ok(())
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

#[async_trait]
impl PluginAdapter for InMemoryTenantStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, HookwireError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), HookwireError> {
        Ok(())
    }
}

#[async_trait]
impl TenantStore for InMemoryTenantStore {
    async fn get(&self, id: TenantId) -> Result<Option<TenantRecord>, HookwireError> {
        Ok(self.snapshot(id))
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<TenantRecord>, HookwireError> {
        self.token_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.lock().values().find(|t| t.token == token).cloned())
    }

    async fn list_connected(&self) -> Result<Vec<TenantRecord>, HookwireError> {
        let mut connected: Vec<_> = self.lock().values().filter(|t| t.connected).cloned().collect();
        connected.sort_by_key(|t| t.id);
        Ok(connected)
    }

    async fn create_tenant(&self, tenant: NewTenant) -> Result<TenantRecord, HookwireError> {
        if self.lock().values().any(|t| t.token == tenant.token) {
            return Err(HookwireError::Validation("token already in use".into()));
        }
        let record = self.insert(&tenant.name, &tenant.token);
        self.update(record.id, |r| {
            r.webhook = tenant.webhook;
            r.events = tenant.events;
            r.proxy_url = tenant.proxy_url;
        })?;
        self.snapshot(record.id)
            .ok_or_else(|| HookwireError::Internal("tenant vanished after insert".into()))
    }

    async fn set_jid(&self, id: TenantId, jid: Option<&str>) -> Result<(), HookwireError> {
        let jid = non_empty(jid);
        self.update(id, |r| r.jid = jid)
    }

    async fn set_webhook(&self, id: TenantId, webhook: &str) -> Result<(), HookwireError> {
        self.update(id, |r| r.webhook = webhook.to_string())
    }

    async fn set_events(&self, id: TenantId, events: &str) -> Result<(), HookwireError> {
        self.update(id, |r| r.events = events.to_string())
    }

    async fn set_connected(&self, id: TenantId, connected: bool) -> Result<(), HookwireError> {
        self.update(id, |r| r.connected = connected)
    }

    async fn set_pairing_artifact(
        &self,
        id: TenantId,
        artifact: Option<&str>,
    ) -> Result<(), HookwireError> {
        let artifact = non_empty(artifact);
        self.update(id, |r| r.qrcode = artifact)
    }

    async fn set_proxy_url(
        &self,
        id: TenantId,
        proxy_url: Option<&str>,
    ) -> Result<(), HookwireError> {
        let proxy_url = non_empty(proxy_url);
        self.update(id, |r| r.proxy_url = proxy_url)
    }
}
