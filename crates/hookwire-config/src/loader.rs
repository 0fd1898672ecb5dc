// SPDX-FileCopyrightText: 2026 Hookwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./hookwire.toml` > `~/.config/hookwire/hookwire.toml` > `/etc/hookwire/hookwire.toml`
//! with environment variable overrides via `HOOKWIRE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::HookwireConfig;

pub(crate) const LOCAL_CONFIG: &str = "hookwire.toml";
pub(crate) const SYSTEM_CONFIG: &str = "/etc/hookwire/hookwire.toml";
pub(crate) const USER_CONFIG: &str = "hookwire/hookwire.toml";

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/hookwire/hookwire.toml` (system-wide)
/// 3. `~/.config/hookwire/hookwire.toml` (user XDG config)
/// 4. `./hookwire.toml` (local directory)
/// 5. `HOOKWIRE_*` environment variables
pub fn load_config() -> Result<HookwireConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<HookwireConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(HookwireConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<HookwireConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(HookwireConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(HookwireConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join(USER_CONFIG))
                .unwrap_or_default(),
        ))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `HOOKWIRE_DELIVERY_MAX_IN_FLIGHT` must map to
/// `delivery.max_in_flight`, not `delivery.max.in.flight`.
fn env_provider() -> Env {
    Env::prefixed("HOOKWIRE_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("server_", "server.", 1)
            .replacen("session_", "session.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("files_", "files.", 1)
            .replacen("delivery_", "delivery.", 1)
            .replacen("protocol_", "protocol.", 1)
            .replacen("log_", "log.", 1);
        mapped.into()
    })
}
