// SPDX-FileCopyrightText: 2026 Hookwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as bind addresses, URL schemes, and non-zero capacities.

use crate::diagnostic::ConfigError;
use crate::model::HookwireConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: &[&str] = &["text", "json"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &HookwireConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    let host = config.server.host.trim();
    if host.is_empty() {
        fail("server.host must not be empty".to_string());
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            fail(format!(
                "server.host `{host}` is not a valid IP address or hostname"
            ));
        }
    }

    if config.server.port == 0 {
        fail("server.port must not be 0".to_string());
    }

    if let Some(url) = &config.server.public_base_url
        && !is_http_url(url)
    {
        fail(format!(
            "server.public_base_url `{url}` must start with http:// or https://"
        ));
    }

    if config.session.connect_wait_secs > 300 {
        fail(format!(
            "session.connect_wait_secs must be at most 300, got {}",
            config.session.connect_wait_secs
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    if config.files.root.trim().is_empty() {
        fail("files.root must not be empty".to_string());
    }

    if config.delivery.timeout_secs == 0 {
        fail("delivery.timeout_secs must be at least 1".to_string());
    }
    if config.delivery.max_in_flight == 0 {
        fail("delivery.max_in_flight must be at least 1".to_string());
    }
    if config.delivery.queue_capacity == 0 {
        fail("delivery.queue_capacity must be at least 1".to_string());
    }

    if !is_http_url(&config.protocol.bridge_url) {
        fail(format!(
            "protocol.bridge_url `{}` must start with http:// or https://",
            config.protocol.bridge_url
        ));
    }
    if config.protocol.request_timeout_secs == 0 {
        fail("protocol.request_timeout_secs must be at least 1".to_string());
    }

    if !LOG_LEVELS.contains(&config.log.level.as_str()) {
        fail(format!(
            "log.level `{}` must be one of: {}",
            config.log.level,
            LOG_LEVELS.join(", ")
        ));
    }
    if !LOG_FORMATS.contains(&config.log.format.as_str()) {
        fail(format!(
            "log.format `{}` must be one of: {}",
            config.log.format,
            LOG_FORMATS.join(", ")
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
