// SPDX-FileCopyrightText: 2026 Hookwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Protocol client backed by an HTTP/SSE protocol sidecar.
//!
//! The messaging protocol runs in a separate process. [`BridgeClientFactory`]
//! implements [`ProtocolClientFactory`] by handing out one [`BridgeClient`]
//! per tenant device on that sidecar.

pub mod client;
pub mod sse;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use hookwire_config::model::ProtocolConfig;
use hookwire_core::{
    AdapterType, ClientParams, HealthStatus, HookwireError, PluginAdapter, ProtocolClient,
    ProtocolClientFactory,
};

pub use client::BridgeClient;

/// Connect timeout for the long-lived event stream, which has no overall timeout.
const STREAM_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Builds [`BridgeClient`]s that share one connection pool.
pub struct BridgeClientFactory {
    config: ProtocolConfig,
    http: reqwest::Client,
    stream_http: reqwest::Client,
}

impl BridgeClientFactory {
    pub fn new(config: ProtocolConfig) -> Result<Self, HookwireError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| HookwireError::Protocol {
                message: format!("failed to build bridge HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        let stream_http = reqwest::Client::builder()
            .connect_timeout(STREAM_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| HookwireError::Protocol {
                message: format!("failed to build bridge stream client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            config,
            http,
            stream_http,
        })
    }

    pub fn bridge_url(&self) -> &str {
        &self.config.bridge_url
    }
}

#[async_trait]
impl PluginAdapter for BridgeClientFactory {
    fn name(&self) -> &str {
        "bridge"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Protocol
    }

    async fn health_check(&self) -> Result<HealthStatus, HookwireError> {
        let url = format!("{}/health", self.config.bridge_url.trim_end_matches('/'));
        match self.http.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => Ok(HealthStatus::Healthy),
            Ok(resp) => Ok(HealthStatus::Degraded(format!(
                "bridge health returned {}",
                resp.status()
            ))),
            Err(e) => Ok(HealthStatus::Unhealthy(format!("bridge unreachable: {e}"))),
        }
    }

    async fn shutdown(&self) -> Result<(), HookwireError> {
        Ok(())
    }
}

impl ProtocolClientFactory for BridgeClientFactory {
    fn create(&self, params: ClientParams) -> Result<Arc<dyn ProtocolClient>, HookwireError> {
        debug!(tenant_id = %params.tenant, paired = params.jid.is_some(), "creating bridge client");
        Ok(Arc::new(BridgeClient::new(
            &self.config.bridge_url,
            &self.config.device_os,
            params,
            self.http.clone(),
            self.stream_http.clone(),
        )))
    }
}
