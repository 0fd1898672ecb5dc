// SPDX-FileCopyrightText: 2026 Hookwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook sink that captures deliveries instead of sending them.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use hookwire_core::{
    AdapterType, HealthStatus, HookwireError, PluginAdapter, WebhookDelivery, WebhookSink,
};

/// Captures every [`WebhookDelivery`] for assertion.
#[derive(Default)]
pub struct RecordingSink {
    delivered: Mutex<Vec<WebhookDelivery>>,
    notify: Notify,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deliveries(&self) -> Vec<WebhookDelivery> {
        self.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.lock().len()
    }

    /// Waits until at least `n` deliveries have been captured, or `timeout` passes.
    ///
    /// Returns the deliveries captured so far either way.
    pub async fn wait_for(&self, n: usize, timeout: Duration) -> Vec<WebhookDelivery> {
        let _ = tokio::time::timeout(timeout, async {
            loop {
                let notified = self.notify.notified();
                if self.count() >= n {
                    return;
                }
                notified.await;
            }
        })
        .await;
        self.deliveries()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<WebhookDelivery>> {
        self.delivered.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[async_trait]
impl PluginAdapter for RecordingSink {
    fn name(&self) -> &str {
        "recording"
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
        Ok(())
    }
}

#[async_trait]
impl WebhookSink for RecordingSink {
    async fn deliver(&self, delivery: WebhookDelivery) -> Result<(), HookwireError> {
        self.lock().push(delivery);
        self.notify.notify_waiters();
        Ok(())
    }
}
