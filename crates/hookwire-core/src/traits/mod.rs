// SPDX-FileCopyrightText: 2026 Hookwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams between the orchestration core and its collaborators.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod protocol;
pub mod store;
pub mod webhook;

pub use adapter::PluginAdapter;
pub use protocol::{
    ClientParams, ControlSignal, EventHandler, EventHandlerFactory, ProtocolClient,
    ProtocolClientFactory, SessionContext, SessionControl,
};
pub use store::TenantStore;
pub use webhook::{DeliveryMode, WebhookDelivery, WebhookSink};
