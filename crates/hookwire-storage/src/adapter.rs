// SPDX-FileCopyrightText: 2026 Hookwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the [`TenantStore`] trait.

use async_trait::async_trait;
use rusqlite::types::Value;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use hookwire_config::model::StorageConfig;
use hookwire_core::{
    AdapterType, HealthStatus, HookwireError, NewTenant, PluginAdapter, TenantId, TenantRecord,
    TenantStore,
};

use crate::database::Database;
use crate::queries::tenants::{self, TenantColumn};

/// SQLite-backed tenant store.
///
/// The database is opened by [`SqliteTenantStore::initialize`]; every other
/// call fails with a storage error until then.
pub struct SqliteTenantStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteTenantStore {
    /// Create a store for the configured database path. Nothing is opened yet.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Opens the database and applies migrations.
    pub async fn initialize(&self) -> Result<(), HookwireError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| HookwireError::Storage {
            source: "tenant store already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "tenant store initialized");
        Ok(())
    }

    fn db(&self) -> Result<&Database, HookwireError> {
        self.db.get().ok_or_else(|| HookwireError::Storage {
            source: "tenant store not initialized -- call initialize() first".into(),
        })
    }

    async fn update(
        &self,
        id: TenantId,
        column: TenantColumn,
        value: Value,
    ) -> Result<(), HookwireError> {
        let touched = tenants::update_column(self.db()?, id, column, value).await?;
        if touched == 0 {
            warn!(tenant_id = %id, ?column, "update matched no tenant");
        }
        Ok(())
    }
}

fn text_or_null(value: Option<&str>) -> Value {
    match value {
        Some(v) if !v.is_empty() => Value::Text(v.to_string()),
        _ => Value::Null,
    }
}

#[async_trait]
impl PluginAdapter for SqliteTenantStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, HookwireError> {
        self.db()?
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), HookwireError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl TenantStore for SqliteTenantStore {
    async fn get(&self, id: TenantId) -> Result<Option<TenantRecord>, HookwireError> {
        tenants::get_tenant(self.db()?, id).await
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<TenantRecord>, HookwireError> {
        tenants::get_tenant_by_token(self.db()?, token).await
    }

    async fn list_connected(&self) -> Result<Vec<TenantRecord>, HookwireError> {
        tenants::list_connected_tenants(self.db()?).await
    }

    async fn create_tenant(&self, tenant: NewTenant) -> Result<TenantRecord, HookwireError> {
        if tenant.token.trim().is_empty() {
            return Err(HookwireError::Validation("token must not be empty".into()));
        }
        tenants::insert_tenant(self.db()?, tenant).await
    }

    async fn set_jid(&self, id: TenantId, jid: Option<&str>) -> Result<(), HookwireError> {
        self.update(id, TenantColumn::Jid, text_or_null(jid)).await
    }

    async fn set_webhook(&self, id: TenantId, webhook: &str) -> Result<(), HookwireError> {
        self.update(id, TenantColumn::Webhook, Value::Text(webhook.to_string()))
            .await
    }

    async fn set_events(&self, id: TenantId, events: &str) -> Result<(), HookwireError> {
        self.update(id, TenantColumn::Events, Value::Text(events.to_string()))
            .await
    }

    async fn set_connected(&self, id: TenantId, connected: bool) -> Result<(), HookwireError> {
        self.update(id, TenantColumn::Connected, Value::Integer(i64::from(connected)))
            .await
    }

    async fn set_pairing_artifact(
        &self,
        id: TenantId,
        artifact: Option<&str>,
    ) -> Result<(), HookwireError> {
        self.update(id, TenantColumn::QrCode, text_or_null(artifact))
            .await
    }

    async fn set_proxy_url(
        &self,
        id: TenantId,
        proxy_url: Option<&str>,
    ) -> Result<(), HookwireError> {
        self.update(id, TenantColumn::ProxyUrl, text_or_null(proxy_url))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn make_store() -> (SqliteTenantStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let config = StorageConfig {
            database_path: dir.path().join("store.db").to_str().unwrap().to_string(),
            wal_mode: true,
        };
        let store = SqliteTenantStore::new(config);
        store.initialize().await.unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn calls_before_initialize_fail() {
        let store = SqliteTenantStore::new(StorageConfig::default());
        let err = store.get(TenantId(1)).await.unwrap_err();
        assert!(err.to_string().contains("not initialized"));
    }

    #[tokio::test]
    async fn double_initialize_fails() {
        let (store, _dir) = make_store().await;
        assert!(store.initialize().await.is_err());
    }

    #[tokio::test]
    async fn health_check_reports_healthy() {
        let (store, _dir) = make_store().await;
        assert_eq!(store.health_check().await.unwrap(), HealthStatus::Healthy);
        store.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn setters_round_trip_through_the_database() {
        let (store, _dir) = make_store().await;
        let tenant = store
            .create_tenant(NewTenant {
                name: "acme".into(),
                token: "secret".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        store.set_jid(tenant.id, Some("5511@s.whatsapp.net")).await.unwrap();
        store.set_events(tenant.id, "Message,Presence").await.unwrap();
        store.set_pairing_artifact(tenant.id, Some("data:image/svg+xml;base64,AAA")).await.unwrap();
        store.set_proxy_url(tenant.id, Some("socks5://proxy:1080")).await.unwrap();
        store.set_connected(tenant.id, true).await.unwrap();

        let row = store.find_by_token("secret").await.unwrap().unwrap();
        assert_eq!(row.jid.as_deref(), Some("5511@s.whatsapp.net"));
        assert_eq!(row.events, "Message,Presence");
        assert!(row.qrcode.is_some());
        assert_eq!(row.proxy_url.as_deref(), Some("socks5://proxy:1080"));
        assert!(row.connected);

        store.set_pairing_artifact(tenant.id, None).await.unwrap();
        store.set_proxy_url(tenant.id, Some("")).await.unwrap();
        store.set_connected(tenant.id, false).await.unwrap();
        let row = store.get(tenant.id).await.unwrap().unwrap();
        assert!(row.qrcode.is_none());
        assert!(row.proxy_url.is_none());
        assert!(store.list_connected().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_token_is_rejected() {
        let (store, _dir) = make_store().await;
        let err = store.create_tenant(NewTenant::default()).await.unwrap_err();
        assert!(matches!(err, HookwireError::Validation(_)));
    }
}
