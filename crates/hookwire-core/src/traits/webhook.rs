// SPDX-FileCopyrightText: 2026 Hookwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook sink trait and its input contract.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::HookwireError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{EventType, TenantId};

/// How a delivery is encoded on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Form-encoded POST of `jsonData` and `token`.
    Form,
    /// JSON POST of `jsonData`, `token` and `file_url` pointing at a saved attachment.
    FileReference { file_path: PathBuf, file_url: String },
}

/// One outbound webhook call.
#[derive(Debug, Clone)]
pub struct WebhookDelivery {
    pub tenant: TenantId,
    pub url: String,
    pub token: String,
    pub event_type: EventType,
    /// Filtered payload, already serialized to a JSON string.
    pub json_data: String,
    pub mode: DeliveryMode,
    /// Per-tenant outbound proxy.
    pub proxy_url: Option<String>,
}

/// Performs outbound webhook calls.
#[async_trait]
pub trait WebhookSink: PluginAdapter {
    /// Sends one delivery. A non-success status is an error; there is no retry.
    async fn deliver(&self, delivery: WebhookDelivery) -> Result<(), HookwireError>;
}
