// SPDX-FileCopyrightText: 2026 Hookwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Hookwire gateway.
//!
//! This crate provides the error type, domain types, protocol event model, and
//! the trait seams (protocol client, tenant store, webhook sink) that the
//! session and dispatch crates are written against.

pub mod error;
pub mod events;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{ErrorKind, HookwireError};
pub use events::{MediaKind, MediaRef, PairingEvent, ProtocolEvent};
pub use types::{
    AdapterType, EventType, HealthStatus, NewTenant, Subscriptions, TenantId, TenantInfo,
    TenantRecord,
};

pub use traits::{
    ClientParams, ControlSignal, DeliveryMode, EventHandler, EventHandlerFactory, PluginAdapter,
    ProtocolClient, ProtocolClientFactory, SessionContext, SessionControl, TenantStore,
    WebhookDelivery, WebhookSink,
};
