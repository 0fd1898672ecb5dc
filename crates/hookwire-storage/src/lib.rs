// SPDX-FileCopyrightText: 2026 Hookwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for Hookwire tenants.
//!
//! WAL-mode SQLite with embedded migrations, a single background connection
//! via `tokio-rusqlite`, and single-column updates so concurrent writers for
//! different tenant attributes never overwrite each other.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteTenantStore;
pub use database::Database;
