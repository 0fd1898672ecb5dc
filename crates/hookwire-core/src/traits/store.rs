// SPDX-FileCopyrightText: 2026 Hookwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tenant store trait.

use async_trait::async_trait;

use crate::error::HookwireError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{NewTenant, TenantId, TenantRecord};

/// Persistent per-tenant records.
///
/// Every setter touches exactly one column so concurrent writers for
/// different attributes of the same tenant never clobber each other.
#[async_trait]
pub trait TenantStore: PluginAdapter {
    /// Looks a tenant up by id.
    async fn get(&self, id: TenantId) -> Result<Option<TenantRecord>, HookwireError>;

    /// Looks a tenant up by bearer token.
    async fn find_by_token(&self, token: &str) -> Result<Option<TenantRecord>, HookwireError>;

    /// Tenants whose persisted connected flag is set.
    async fn list_connected(&self) -> Result<Vec<TenantRecord>, HookwireError>;

    /// Provisions a tenant.
    async fn create_tenant(&self, tenant: NewTenant) -> Result<TenantRecord, HookwireError>;

    async fn set_jid(&self, id: TenantId, jid: Option<&str>) -> Result<(), HookwireError>;

    async fn set_webhook(&self, id: TenantId, webhook: &str) -> Result<(), HookwireError>;

    async fn set_events(&self, id: TenantId, events: &str) -> Result<(), HookwireError>;

    async fn set_connected(&self, id: TenantId, connected: bool) -> Result<(), HookwireError>;

    /// Stores or clears the pairing artifact.
    async fn set_pairing_artifact(
        &self,
        id: TenantId,
        artifact: Option<&str>,
    ) -> Result<(), HookwireError>;

    async fn set_proxy_url(&self, id: TenantId, proxy_url: Option<&str>)
    -> Result<(), HookwireError>;
}
