// SPDX-FileCopyrightText: 2026 Hookwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Router assembly and the HTTP server loop.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::middleware as axum_middleware;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use hookwire_auth::AuthCache;
use hookwire_core::HookwireError;
use hookwire_dispatch::EventPipeline;
use hookwire_session::SessionRegistry;

use crate::auth::auth_middleware;
use crate::{handlers, webhook};

/// Shared state for request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub registry: SessionRegistry,
    pub auth: Arc<AuthCache>,
    pub pipeline: EventPipeline,
    /// How long a non-immediate connect waits for the connection.
    pub connect_wait: Duration,
}

/// Builds the full router.
///
/// `/health` and `/files` are public; everything else requires a tenant token.
pub fn build_router(state: GatewayState) -> Router {
    let files = ServeDir::new(state.pipeline.files_root());

    let public_routes = Router::new()
        .route("/health", get(handlers::health))
        .nest_service("/files", files)
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/session/connect", post(handlers::connect))
        .route("/session/disconnect", post(handlers::disconnect))
        .route("/session/logout", post(handlers::logout))
        .route("/session/status", get(handlers::status))
        .route("/session/qr", get(handlers::qr))
        .route("/session/pairphone", post(handlers::pair_phone))
        .route("/session/proxy", post(handlers::set_proxy))
        .route(
            "/webhook",
            get(webhook::get_webhook)
                .post(webhook::set_webhook)
                .put(webhook::update_webhook)
                .delete(webhook::delete_webhook),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
}

/// Binds the listening socket.
pub async fn bind(host: &str, port: u16) -> Result<TcpListener, HookwireError> {
    let addr = format!("{host}:{port}");
    TcpListener::bind(&addr)
        .await
        .map_err(|e| HookwireError::Internal(format!("failed to bind gateway to {addr}: {e}")))
}

/// Serves `router` until `shutdown` is cancelled, then finishes in-flight
/// requests and returns.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: CancellationToken,
) -> Result<(), HookwireError> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "gateway listening");
    }
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| HookwireError::Internal(format!("gateway server error: {e}")))
}
