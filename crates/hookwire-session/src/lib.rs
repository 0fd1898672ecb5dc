// SPDX-FileCopyrightText: 2026 Hookwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tenant sessions for the Hookwire gateway.
//!
//! [`SessionRegistry`] owns one live protocol session per tenant. Each
//! session is driven by its own controller task through the pairing and
//! connection states in [`SessionState`], and is torn down through its
//! control channel.

mod lifecycle;
pub mod qr;
pub mod reconcile;
pub mod registry;
pub mod shutdown;
pub mod state;

pub use reconcile::connect_on_startup;
pub use registry::{CreateOutcome, SessionHandle, SessionRegistry, SessionSpec, SessionStatus};
pub use shutdown::install_signal_handler;
pub use state::SessionState;
