// SPDX-FileCopyrightText: 2026 Hookwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook settings: `GET`, `POST`, `PUT` and `DELETE /webhook`.
//!
//! Every write goes through the auth cache so the dispatch pipeline sees the
//! new URL and subscriptions on its next event.

use axum::extract::{Extension, State};
use axum::response::Response;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use hookwire_core::{HookwireError, Subscriptions, TenantInfo};

use crate::envelope::{ApiError, Payload, ok};
use crate::server::GatewayState;

#[derive(Debug, Deserialize)]
pub struct WebhookRequest {
    #[serde(default)]
    pub webhook: String,
    #[serde(default)]
    pub events: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateWebhookRequest {
    #[serde(default)]
    pub webhook: String,
    #[serde(default)]
    pub events: Vec<String>,
    #[serde(default)]
    pub active: bool,
}

fn storage_error(action: &str, e: HookwireError) -> ApiError {
    ApiError::internal(format!("Could not {action} webhook: {e}"))
}

/// `GET /webhook`
pub async fn get_webhook(
    State(state): State<GatewayState>,
    Extension(tenant): Extension<TenantInfo>,
) -> Result<Response, ApiError> {
    let record = state
        .auth
        .store()
        .get(tenant.id)
        .await
        .map_err(|e| storage_error("get", e))?
        .ok_or(HookwireError::Unauthorized)?;
    let subscribe = Subscriptions::from_stored(&record.events).names();
    Ok(ok(json!({
        "webhook": record.webhook,
        "subscribe": subscribe,
    })))
}

/// `POST /webhook`
pub async fn set_webhook(
    State(state): State<GatewayState>,
    Extension(tenant): Extension<TenantInfo>,
    Payload(req): Payload<WebhookRequest>,
) -> Result<Response, ApiError> {
    let webhook = req.webhook.trim();
    state
        .auth
        .set_webhook(tenant.id, &tenant.token, webhook)
        .await
        .map_err(|e| storage_error("set", e))?;
    state
        .auth
        .set_subscriptions(tenant.id, &tenant.token, Subscriptions::parse(&req.events))
        .await
        .map_err(|e| storage_error("set", e))?;
    info!(tenant_id = %tenant.id, "webhook set");
    Ok(ok(json!({
        "webhook": webhook,
        "events": req.events,
    })))
}

/// `PUT /webhook`
///
/// With `active: false` the webhook and subscriptions are cleared.
pub async fn update_webhook(
    State(state): State<GatewayState>,
    Extension(tenant): Extension<TenantInfo>,
    Payload(req): Payload<UpdateWebhookRequest>,
) -> Result<Response, ApiError> {
    let webhook = if req.active { req.webhook.trim() } else { "" };
    state
        .auth
        .set_webhook(tenant.id, &tenant.token, webhook)
        .await
        .map_err(|e| storage_error("update", e))?;
    let subscriptions = if req.active {
        state
            .auth
            .set_subscriptions(tenant.id, &tenant.token, Subscriptions::parse(&req.events))
            .await
    } else {
        state.auth.clear_subscriptions(tenant.id, &tenant.token).await
    };
    subscriptions.map_err(|e| storage_error("update", e))?;
    info!(tenant_id = %tenant.id, active = req.active, "webhook updated");
    Ok(ok(json!({
        "webhook": webhook,
        "events": req.events,
        "active": req.active,
    })))
}

/// `DELETE /webhook`
pub async fn delete_webhook(
    State(state): State<GatewayState>,
    Extension(tenant): Extension<TenantInfo>,
) -> Result<Response, ApiError> {
    state
        .auth
        .set_webhook(tenant.id, &tenant.token, "")
        .await
        .map_err(|e| storage_error("delete", e))?;
    state
        .auth
        .clear_subscriptions(tenant.id, &tenant.token)
        .await
        .map_err(|e| storage_error("delete", e))?;
    info!(tenant_id = %tenant.id, "webhook deleted");
    Ok(ok(json!({"Details": "Webhook and events deleted successfully"})))
}
