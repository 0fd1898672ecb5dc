// SPDX-FileCopyrightText: 2026 Hookwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound webhook HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use tracing::debug;

use hookwire_config::model::DeliveryConfig;
use hookwire_core::{
    AdapterType, DeliveryMode, HealthStatus, HookwireError, PluginAdapter, WebhookDelivery,
    WebhookSink,
};

/// Body of a file-reference delivery.
#[derive(Debug, Serialize)]
struct FileReferenceBody<'a> {
    #[serde(rename = "jsonData")]
    json_data: &'a str,
    token: &'a str,
    file_url: &'a str,
}

/// [`WebhookSink`] that POSTs to the tenant's webhook URL with reqwest.
///
/// One client is kept per distinct proxy URL so connection pools are reused
/// across deliveries.
pub struct HttpWebhookSink {
    config: DeliveryConfig,
    direct: reqwest::Client,
    proxied: DashMap<String, reqwest::Client>,
}

impl HttpWebhookSink {
    pub fn new(config: &DeliveryConfig) -> Result<Self, HookwireError> {
        Ok(Self {
            direct: build_client(config, None)?,
            config: config.clone(),
            proxied: DashMap::new(),
        })
    }

    fn client_for(&self, proxy_url: Option<&str>) -> Result<reqwest::Client, HookwireError> {
        let Some(proxy_url) = proxy_url.filter(|p| !p.is_empty()) else {
            return Ok(self.direct.clone());
        };
        if let Some(client) = self.proxied.get(proxy_url) {
            return Ok(client.clone());
        }
        let client = build_client(&self.config, Some(proxy_url))?;
        self.proxied.insert(proxy_url.to_string(), client.clone());
        Ok(client)
    }
}

fn build_client(
    config: &DeliveryConfig,
    proxy_url: Option<&str>,
) -> Result<reqwest::Client, HookwireError> {
    let mut builder = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
        .danger_accept_invalid_certs(config.accept_invalid_certs);
    if let Some(proxy_url) = proxy_url {
        let proxy = reqwest::Proxy::all(proxy_url).map_err(|e| HookwireError::Delivery {
            message: format!("invalid proxy URL `{proxy_url}`: {e}"),
            source: Some(Box::new(e)),
        })?;
        builder = builder.proxy(proxy);
    }
    builder.build().map_err(|e| HookwireError::Delivery {
        message: format!("failed to build HTTP client: {e}"),
        source: Some(Box::new(e)),
    })
}

#[async_trait]
impl PluginAdapter for HttpWebhookSink {
    fn name(&self) -> &str {
        "http"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Webhook
    }

    async fn health_check(&self) -> Result<HealthStatus, HookwireError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), HookwireError> {
        self.proxied.clear();
        Ok(())
    }
}

#[async_trait]
impl WebhookSink for HttpWebhookSink {
    async fn deliver(&self, delivery: WebhookDelivery) -> Result<(), HookwireError> {
        let client = self.client_for(delivery.proxy_url.as_deref())?;

        let request = match &delivery.mode {
            DeliveryMode::Form => client.post(&delivery.url).form(&[
                ("jsonData", delivery.json_data.as_str()),
                ("token", delivery.token.as_str()),
            ]),
            DeliveryMode::FileReference {
                file_path,
                file_url,
            } => {
                let exists = tokio::fs::try_exists(file_path)
                    .await
                    .map_err(|e| HookwireError::io(file_path, e))?;
                if !exists {
                    return Err(HookwireError::delivery(format!(
                        "attachment {} no longer exists",
                        file_path.display()
                    )));
                }
                client.post(&delivery.url).json(&FileReferenceBody {
                    json_data: &delivery.json_data,
                    token: &delivery.token,
                    file_url,
                })
            }
        };

        let response = request.send().await.map_err(|e| HookwireError::Delivery {
            message: format!("POST {} failed: {e}", delivery.url),
            source: Some(Box::new(e)),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(HookwireError::delivery(format!(
                "{} responded with {status}",
                delivery.url
            )));
        }
        debug!(
            tenant_id = %delivery.tenant,
            event_type = %delivery.event_type,
            status = %status,
            "webhook delivered"
        );
        Ok(())
    }
}
