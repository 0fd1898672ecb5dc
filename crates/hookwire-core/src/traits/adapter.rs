// SPDX-FileCopyrightText: 2026 Hookwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base adapter trait shared by every pluggable backend.

use async_trait::async_trait;

use crate::error::HookwireError;
use crate::types::{AdapterType, HealthStatus};

/// Identity, health and shutdown hooks common to every backend the gateway
/// plugs in: the protocol bridge, the tenant store and the webhook sink.
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Short name used in logs, e.g. `sqlite` or `bridge`.
    fn name(&self) -> &str;

    fn version(&self) -> semver::Version;

    fn adapter_type(&self) -> AdapterType;

    /// Probes the backend. Unreachable backends report
    /// [`HealthStatus::Unhealthy`] rather than an error where possible.
    async fn health_check(&self) -> Result<HealthStatus, HookwireError>;

    /// Flushes and releases backend resources before process exit.
    async fn shutdown(&self) -> Result<(), HookwireError>;
}
