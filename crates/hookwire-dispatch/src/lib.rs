// SPDX-FileCopyrightText: 2026 Hookwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event dispatch pipeline for the Hookwire gateway.
//!
//! Classifies protocol events, applies their state effects, persists
//! attachments and history dumps, filters inline content out of payloads, and
//! hands webhook deliveries to a bounded queue served by an HTTP sink.

pub mod classify;
pub mod delivery;
pub mod media;
pub mod payload;
pub mod pipeline;
pub mod queue;

pub use classify::{Disposition, classify};
pub use delivery::HttpWebhookSink;
pub use payload::{WebhookPayload, filter_base64};
pub use pipeline::{EventPipeline, SessionEventHandler};
pub use queue::DeliveryQueue;
