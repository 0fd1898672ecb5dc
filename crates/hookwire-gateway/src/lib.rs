// SPDX-FileCopyrightText: 2026 Hookwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP surface of the Hookwire gateway.
//!
//! Tenants authenticate with their token and drive their session
//! (connect, pair, disconnect, logout), manage webhook settings, and fetch
//! saved attachments from `/files`.

pub mod auth;
pub mod envelope;
pub mod handlers;
pub mod server;
pub mod webhook;

pub use envelope::{ApiError, ok};
pub use server::{GatewayState, bind, build_router, serve};
