// SPDX-FileCopyrightText: 2026 Hookwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tenant CRUD operations.

use hookwire_core::{HookwireError, NewTenant, TenantId, TenantRecord};
use rusqlite::params;
use rusqlite::types::Value;

use crate::database::Database;

const TENANT_COLUMNS: &str =
    "id, name, token, jid, webhook, events, proxy_url, connected, qrcode";

/// Columns that may be updated individually.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantColumn {
    Jid,
    Webhook,
    Events,
    Connected,
    QrCode,
    ProxyUrl,
}

impl TenantColumn {
    fn as_sql(self) -> &'static str {
        match self {
            TenantColumn::Jid => "jid",
            TenantColumn::Webhook => "webhook",
            TenantColumn::Events => "events",
            TenantColumn::Connected => "connected",
            TenantColumn::QrCode => "qrcode",
            TenantColumn::ProxyUrl => "proxy_url",
        }
    }
}

fn tenant_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TenantRecord> {
    Ok(TenantRecord {
        id: TenantId(row.get(0)?),
        name: row.get(1)?,
        token: row.get(2)?,
        jid: row.get::<_, Option<String>>(3)?.filter(|j| !j.is_empty()),
        webhook: row.get(4)?,
        events: row.get(5)?,
        proxy_url: row.get::<_, Option<String>>(6)?.filter(|p| !p.is_empty()),
        connected: row.get::<_, i64>(7)? != 0,
        qrcode: row.get::<_, Option<String>>(8)?.filter(|q| !q.is_empty()),
    })
}

/// Insert a tenant and return the stored row.
pub async fn insert_tenant(
    db: &Database,
    tenant: NewTenant,
) -> Result<TenantRecord, HookwireError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO tenants (name, token, webhook, events, proxy_url)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    tenant.name,
                    tenant.token,
                    tenant.webhook,
                    tenant.events,
                    tenant.proxy_url,
                ],
            )?;
            let id = conn.last_insert_rowid();
            conn.query_row(
                &format!("SELECT {TENANT_COLUMNS} FROM tenants WHERE id = ?1"),
                params![id],
                tenant_from_row,
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a tenant by id.
pub async fn get_tenant(
    db: &Database,
    id: TenantId,
) -> Result<Option<TenantRecord>, HookwireError> {
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!("SELECT {TENANT_COLUMNS} FROM tenants WHERE id = ?1"),
                params![id.0],
                tenant_from_row,
            );
            match result {
                Ok(tenant) => Ok(Some(tenant)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a tenant by bearer token.
pub async fn get_tenant_by_token(
    db: &Database,
    token: &str,
) -> Result<Option<TenantRecord>, HookwireError> {
    let token = token.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!("SELECT {TENANT_COLUMNS} FROM tenants WHERE token = ?1"),
                params![token],
                tenant_from_row,
            );
            match result {
                Ok(tenant) => Ok(Some(tenant)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Tenants flagged as connected, oldest first.
pub async fn list_connected_tenants(db: &Database) -> Result<Vec<TenantRecord>, HookwireError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TENANT_COLUMNS} FROM tenants WHERE connected = 1 ORDER BY id"
            ))?;
            let tenants = stmt
                .query_map([], tenant_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(tenants)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Update a single column. Returns the number of rows touched (0 or 1).
pub async fn update_column(
    db: &Database,
    id: TenantId,
    column: TenantColumn,
    value: Value,
) -> Result<usize, HookwireError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                &format!(
                    "UPDATE tenants
                     SET {} = ?1, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?2",
                    column.as_sql()
                ),
                params![value, id.0],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}
