// SPDX-FileCopyrightText: 2026 Hookwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `hookwire serve` command implementation.
//!
//! Opens the tenant store, starts the webhook delivery queue, builds the
//! session registry on top of the protocol bridge, restores sessions that
//! were connected at the last shutdown, and serves the HTTP gateway until
//! SIGINT/SIGTERM. On the way out every session is torn down with its
//! connected flag kept, pending webhooks are drained, and the store is
//! checkpointed.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use hookwire_auth::AuthCache;
use hookwire_bridge::BridgeClientFactory;
use hookwire_config::HookwireConfig;
use hookwire_config::model::LogConfig;
use hookwire_core::{HealthStatus, HookwireError, PluginAdapter, ProtocolClientFactory, TenantStore};
use hookwire_dispatch::{DeliveryQueue, EventPipeline, HttpWebhookSink};
use hookwire_gateway::{GatewayState, bind, build_router, serve};
use hookwire_session::{SessionRegistry, connect_on_startup, install_signal_handler};
use hookwire_storage::SqliteTenantStore;

/// The long-lived components shared by the gateway and the sessions.
pub(crate) struct Services {
    pub store: Arc<SqliteTenantStore>,
    pub auth: Arc<AuthCache>,
    pub pipeline: EventPipeline,
    pub registry: SessionRegistry,
    dispatcher: JoinHandle<()>,
}

/// Opens storage and wires the auth cache, dispatch pipeline and session
/// registry around `factory`.
pub(crate) async fn assemble(
    config: &HookwireConfig,
    factory: Arc<dyn ProtocolClientFactory>,
) -> Result<Services, HookwireError> {
    let store = Arc::new(SqliteTenantStore::new(config.storage.clone()));
    store.initialize().await?;
    info!(path = %config.storage.database_path, "tenant store ready");

    let auth = Arc::new(AuthCache::new(store.clone() as Arc<dyn TenantStore>));

    let sink = Arc::new(HttpWebhookSink::new(&config.delivery)?);
    let (queue, dispatcher) = DeliveryQueue::start(sink, &config.delivery);

    let pipeline = EventPipeline::new(
        auth.clone(),
        queue,
        &config.files.root,
        config.server.public_base_url(),
    );
    let registry = SessionRegistry::new(
        factory,
        Arc::new(pipeline.clone()),
        store.clone() as Arc<dyn TenantStore>,
    );

    Ok(Services {
        store,
        auth,
        pipeline,
        registry,
        dispatcher,
    })
}

impl Services {
    pub fn gateway_state(&self, config: &HookwireConfig) -> GatewayState {
        GatewayState {
            registry: self.registry.clone(),
            auth: self.auth.clone(),
            pipeline: self.pipeline.clone(),
            connect_wait: Duration::from_secs(config.session.connect_wait_secs),
        }
    }

    /// Tears down every session, drains pending webhooks and checkpoints
    /// the store. Each step is bounded by `timeout`.
    pub async fn shutdown(self, timeout: Duration) {
        let remaining = self.registry.terminate_all(timeout).await;
        if remaining == 0 {
            info!("all sessions stopped");
        }

        self.pipeline.queue().drain(timeout).await;
        self.dispatcher.abort();

        if let Err(e) = self.store.shutdown().await {
            warn!(error = %e, "tenant store shutdown failed");
        }
    }
}

/// Runs the `hookwire serve` command.
pub async fn run_serve(config: HookwireConfig) -> Result<(), HookwireError> {
    init_tracing(&config.log);

    info!(version = env!("CARGO_PKG_VERSION"), "starting hookwire serve");

    // Bind first so a taken port fails before any session is restored.
    let listener = bind(&config.server.host, config.server.port).await?;

    let factory = Arc::new(BridgeClientFactory::new(config.protocol.clone())?);
    match factory.health_check().await {
        Ok(HealthStatus::Healthy) => info!(url = factory.bridge_url(), "protocol bridge reachable"),
        Ok(status) => warn!(url = factory.bridge_url(), ?status, "protocol bridge not healthy"),
        Err(e) => warn!(url = factory.bridge_url(), error = %e, "protocol bridge health check failed"),
    }

    let services = assemble(&config, factory).await?;

    if config.session.reconnect_on_startup {
        if let Err(e) = connect_on_startup(&services.registry, &services.auth).await {
            warn!(error = %e, "failed to restore sessions, continuing without them");
        }
    } else {
        info!("session restore disabled by configuration");
    }

    let cancel = install_signal_handler();
    let router = build_router(services.gateway_state(&config));
    let served = serve(listener, router, cancel).await;

    services
        .shutdown(Duration::from_secs(config.session.shutdown_timeout_secs))
        .await;
    served?;

    info!("hookwire serve shutdown complete");
    Ok(())
}

/// Default filter directive when `RUST_LOG` is unset.
fn default_directive(log_level: &str) -> String {
    format!("hookwire={log_level},warn")
}

/// Initializes the tracing subscriber from the `[log]` section.
fn init_tracing(log: &LogConfig) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(&log.level)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false);

    if log.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio_util::sync::CancellationToken;

    use hookwire_core::NewTenant;
    use hookwire_session::SessionState;
    use hookwire_test_utils::MockClientFactory;

    fn config_in(dir: &tempfile::TempDir) -> HookwireConfig {
        let mut config = HookwireConfig::default();
        config.storage.database_path = dir.path().join("hookwire.db").display().to_string();
        config.files.root = dir.path().join("files").display().to_string();
        config
    }

    async fn connected_tenant(services: &Services, token: &str) -> hookwire_core::TenantRecord {
        let record = services
            .store
            .create_tenant(NewTenant {
                name: "acme".into(),
                token: token.into(),
                ..NewTenant::default()
            })
            .await
            .unwrap();
        services
            .store
            .set_jid(record.id, Some("5511@s.whatsapp.net"))
            .await
            .unwrap();
        services.store.set_connected(record.id, true).await.unwrap();
        record
    }

    #[test]
    fn default_directive_scopes_level_to_hookwire() {
        assert_eq!(default_directive("debug"), "hookwire=debug,warn");
    }

    #[tokio::test]
    async fn restores_sessions_and_keeps_flags_across_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let factory = Arc::new(MockClientFactory::new());
        let services = assemble(&config, factory.clone()).await.unwrap();
        let record = connected_tenant(&services, "abc").await;

        let restored = connect_on_startup(&services.registry, &services.auth)
            .await
            .unwrap();
        assert_eq!(restored, 1);
        assert!(services.auth.get_cached("abc").is_some());

        let handle = services.registry.acquire(record.id).unwrap();
        let state = handle
            .wait_for_state(Duration::from_secs(2), |s| s == SessionState::Connected)
            .await;
        assert_eq!(state, SessionState::Connected);
        assert_eq!(factory.created_for(record.id), 1);
        drop(handle);

        let store = services.store.clone();
        services.shutdown(Duration::from_secs(2)).await;

        let after = store.get(record.id).await.unwrap().unwrap();
        assert!(after.connected);
    }

    #[tokio::test]
    async fn gateway_answers_over_tcp_until_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let services = assemble(&config, Arc::new(MockClientFactory::new()))
            .await
            .unwrap();

        let listener = bind("127.0.0.1", 0).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let cancel = CancellationToken::new();
        let server = tokio::spawn(serve(
            listener,
            build_router(services.gateway_state(&config)),
            cancel.clone(),
        ));

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200"), "{response}");
        assert!(response.contains("\"sessions\":0"));

        cancel.cancel();
        server.await.unwrap().unwrap();
        services.shutdown(Duration::from_secs(1)).await;
    }
}
