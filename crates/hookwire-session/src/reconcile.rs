// SPDX-FileCopyrightText: 2026 Hookwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Startup reconnection of tenants that were connected at last shutdown.

use tracing::{info, warn};

use hookwire_auth::AuthCache;
use hookwire_core::HookwireError;

use crate::registry::{SessionRegistry, SessionSpec};

/// Starts a session for every tenant whose persisted connected flag is set
/// and seeds the auth cache with its record.
///
/// Does not wait for the sessions to come up. A tenant that fails to start
/// is logged and skipped. Returns the number of sessions started.
pub async fn connect_on_startup(
    registry: &SessionRegistry,
    auth: &AuthCache,
) -> Result<usize, HookwireError> {
    let records = registry.store().list_connected().await?;
    if records.is_empty() {
        info!("no sessions to restore");
        return Ok(0);
    }

    let mut started = 0;
    for record in &records {
        auth.seed(record);
        match registry.create_if_absent(SessionSpec::from(record)) {
            Ok(outcome) if outcome.created => started += 1,
            Ok(_) => {}
            Err(e) => {
                warn!(tenant_id = %record.id, error = %e, "failed to restore session");
            }
        }
    }
    info!(restored = started, total = records.len(), "restored sessions");
    Ok(started)
}
