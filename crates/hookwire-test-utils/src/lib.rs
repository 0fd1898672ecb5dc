// SPDX-FileCopyrightText: 2026 Hookwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Hookwire.
//!
//! Provides in-process stand-ins for every adapter seam so session, dispatch
//! and gateway tests run without a protocol sidecar, a database, or a network.
//!
//! # Components
//!
//! - [`MockProtocolClient`] / [`MockClientFactory`] - scriptable protocol sessions
//! - [`InMemoryTenantStore`] - `HashMap`-backed tenant store
//! - [`RecordingSink`] - webhook sink that captures deliveries

pub mod memory_store;
pub mod mock_protocol;
pub mod recording_sink;

pub use memory_store::InMemoryTenantStore;
pub use mock_protocol::{MOCK_LINKING_CODE, MockClientFactory, MockProtocolClient};
pub use recording_sink::RecordingSink;
