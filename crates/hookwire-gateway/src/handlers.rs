// SPDX-FileCopyrightText: 2026 Hookwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session control handlers: connect, disconnect, logout, status, pairing
//! and proxy settings.

use axum::extract::{Extension, State};
use axum::http::{StatusCode, Uri};
use axum::response::Response;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use hookwire_core::{EventType, HookwireError, Subscriptions, TenantInfo};
use hookwire_session::{SessionSpec, SessionState};

use crate::envelope::{ApiError, Payload, ok};
use crate::server::GatewayState;

/// `GET /health`
pub async fn health(State(state): State<GatewayState>) -> Response {
    ok(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": state.registry.len(),
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct ConnectRequest {
    #[serde(default, alias = "Subscribe")]
    pub subscribe: Vec<String>,
    #[serde(default, alias = "Immediate")]
    pub immediate: bool,
}

/// `POST /session/connect`
///
/// Stores the subscription list and starts the tenant's session. Without
/// `immediate`, waits up to the configured connect wait and fails if the
/// protocol connection is not open by then.
pub async fn connect(
    State(state): State<GatewayState>,
    Extension(tenant): Extension<TenantInfo>,
    Payload(req): Payload<ConnectRequest>,
) -> Result<Response, ApiError> {
    let jid = tenant.jid.clone().unwrap_or_default();
    let already_connected = || {
        ok(json!({
            "webhook": tenant.webhook,
            "jid": jid,
            "details": "Already Connected",
        }))
    };
    if state.registry.acquire(tenant.id).is_some() {
        return Ok(already_connected());
    }

    let subscriptions = Subscriptions::parse(&req.subscribe);
    let events = subscriptions.to_stored();
    if let Err(e) = state
        .auth
        .set_subscriptions(tenant.id, &tenant.token, subscriptions)
        .await
    {
        warn!(tenant_id = %tenant.id, error = %e, "could not store subscriptions");
    }
    info!(tenant_id = %tenant.id, events = %events, "connecting session");

    let outcome = state.registry.create_if_absent(SessionSpec {
        tenant: tenant.id,
        token: tenant.token.clone(),
        jid: tenant.jid.clone(),
        proxy_url: tenant.proxy_url.clone(),
    })?;
    if !outcome.created {
        return Ok(already_connected());
    }

    if !req.immediate {
        let reached = outcome
            .handle
            .wait_for_state(state.connect_wait, |s| {
                matches!(s, SessionState::AwaitingPairing | SessionState::Connected)
                    || s.is_terminal()
            })
            .await;
        if reached.is_terminal() || !outcome.handle.is_connected() {
            warn!(tenant_id = %tenant.id, state = %reached, "session did not connect in time");
            return Err(ApiError::internal("Failed to Connect"));
        }
    }

    Ok(ok(json!({
        "webhook": tenant.webhook,
        "jid": jid,
        "events": events,
        "details": "Connected!",
    })))
}

/// `POST /session/disconnect`
///
/// Closes the connection without unlinking the device and clears the
/// stored subscription list.
pub async fn disconnect(
    State(state): State<GatewayState>,
    Extension(tenant): Extension<TenantInfo>,
) -> Result<Response, ApiError> {
    match state.registry.disconnect(tenant.id) {
        Ok(()) => {}
        Err(HookwireError::NotLoggedIn) => {
            warn!(tenant_id = %tenant.id, "ignoring disconnect, not logged in");
            return Err(ApiError::bad_request(
                "Cannot disconnect because it is not logged in",
            ));
        }
        Err(e) => return Err(e.into()),
    }

    state.pipeline.notify(&tenant, EventType::Disconnected);
    if let Err(e) = state.auth.clear_subscriptions(tenant.id, &tenant.token).await {
        warn!(tenant_id = %tenant.id, error = %e, "could not clear subscriptions");
    }
    info!(tenant_id = %tenant.id, "disconnected");
    Ok(ok(json!({"Details": "Disconnected"})))
}

/// `POST /session/logout`
pub async fn logout(
    State(state): State<GatewayState>,
    Extension(tenant): Extension<TenantInfo>,
) -> Result<Response, ApiError> {
    match state.registry.logout(tenant.id).await {
        Ok(()) => {}
        Err(HookwireError::NotLoggedIn) => {
            let connected = state
                .registry
                .acquire(tenant.id)
                .is_some_and(|h| h.is_connected());
            let message = if connected {
                "Could not disconnect as it was not logged in"
            } else {
                "Could not disconnect as it was not connected"
            };
            return Err(ApiError::bad_request(message));
        }
        Err(HookwireError::NoSession) => return Err(HookwireError::NoSession.into()),
        Err(e) => {
            warn!(tenant_id = %tenant.id, error = %e, "logout failed");
            return Err(ApiError::internal("Could not perform logout"));
        }
    }

    if let Err(e) = state.auth.set_identity(tenant.id, &tenant.token, None).await {
        warn!(tenant_id = %tenant.id, error = %e, "could not clear linked identity");
    }
    state.pipeline.notify(&tenant, EventType::LoggedOut);
    Ok(ok(json!({"Details": "Logged out"})))
}

/// `GET /session/status`
pub async fn status(
    State(state): State<GatewayState>,
    Extension(tenant): Extension<TenantInfo>,
) -> Result<Response, ApiError> {
    let status = state.registry.status(tenant.id)?;
    Ok(ok(status))
}

/// `GET /session/qr`
pub async fn qr(
    State(state): State<GatewayState>,
    Extension(tenant): Extension<TenantInfo>,
) -> Result<Response, ApiError> {
    let code = state.registry.pairing_artifact(tenant.id).await?;
    Ok(ok(json!({"QRCode": code})))
}

#[derive(Debug, Deserialize)]
pub struct PairPhoneRequest {
    #[serde(default, alias = "Phone")]
    pub phone: String,
}

/// `POST /session/pairphone`
pub async fn pair_phone(
    State(state): State<GatewayState>,
    Extension(tenant): Extension<TenantInfo>,
    Payload(req): Payload<PairPhoneRequest>,
) -> Result<Response, ApiError> {
    if state.registry.acquire(tenant.id).is_none() {
        return Err(HookwireError::NoSession.into());
    }
    let phone = req.phone.trim();
    if phone.is_empty() {
        return Err(ApiError::bad_request("Missing Phone in Payload"));
    }
    let code = state
        .registry
        .pair_phone(tenant.id, phone)
        .await
        .map_err(|e| match e {
            HookwireError::NoSession => ApiError::from(e),
            other => ApiError::bad_request(other.to_string()),
        })?;
    Ok(ok(json!({"LinkingCode": code})))
}

#[derive(Debug, Deserialize)]
pub struct ProxyRequest {
    #[serde(default)]
    pub proxy_url: String,
    #[serde(default)]
    pub enable: bool,
}

/// Schemes a tenant proxy may use.
const PROXY_SCHEMES: &[&str] = &["http", "socks5"];

/// Checks a proxy URL's shape and scheme.
pub fn validate_proxy_url(raw: &str) -> Result<(), ApiError> {
    if raw.is_empty() {
        return Err(ApiError::bad_request("missing proxy_url in payload"));
    }
    let uri: Uri = raw
        .parse()
        .map_err(|_| ApiError::bad_request("invalid proxy URL format"))?;
    match uri.scheme_str() {
        Some(scheme) if PROXY_SCHEMES.contains(&scheme) => {}
        Some(_) => {
            return Err(ApiError::bad_request(
                "only HTTP and SOCKS5 proxies are supported",
            ));
        }
        None => return Err(ApiError::bad_request("invalid proxy URL format")),
    }
    if uri.host().is_none_or(str::is_empty) {
        return Err(ApiError::bad_request("invalid proxy URL format"));
    }
    Ok(())
}

/// `POST /session/proxy`
///
/// Sets or clears the tenant's proxy. Refused while the session is connected.
pub async fn set_proxy(
    State(state): State<GatewayState>,
    Extension(tenant): Extension<TenantInfo>,
    Payload(req): Payload<ProxyRequest>,
) -> Result<Response, ApiError> {
    if state
        .registry
        .acquire(tenant.id)
        .is_some_and(|h| h.is_connected())
    {
        return Err(ApiError::bad_request(
            "cannot set proxy while connected. Please disconnect first",
        ));
    }

    if !req.enable {
        state
            .auth
            .set_proxy_url(tenant.id, &tenant.token, None)
            .await
            .map_err(|e| {
                warn!(tenant_id = %tenant.id, error = %e, "failed to remove proxy");
                ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "failed to remove proxy configuration",
                )
            })?;
        return Ok(ok(json!({"Details": "Proxy disabled successfully"})));
    }

    let proxy_url = req.proxy_url.trim();
    validate_proxy_url(proxy_url)?;
    state
        .auth
        .set_proxy_url(tenant.id, &tenant.token, Some(proxy_url))
        .await
        .map_err(|e| {
            warn!(tenant_id = %tenant.id, error = %e, "failed to save proxy");
            ApiError::internal("failed to save proxy configuration")
        })?;
    info!(tenant_id = %tenant.id, "proxy configured");
    Ok(ok(json!({
        "Details": "Proxy configured successfully",
        "ProxyURL": proxy_url,
    })))
}
