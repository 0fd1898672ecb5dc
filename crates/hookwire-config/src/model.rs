// SPDX-FileCopyrightText: 2026 Hookwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Hookwire gateway.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Hookwire configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HookwireConfig {
    /// HTTP listener and public URL settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Session lifecycle settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Tenant store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Attachment and history dump storage.
    #[serde(default)]
    pub files: FilesConfig,

    /// Outbound webhook delivery settings.
    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// Protocol bridge settings.
    #[serde(default)]
    pub protocol: ProtocolConfig,

    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Base URL under which `/files` is reachable by webhook receivers.
    /// Defaults to `http://localhost:<port>`.
    #[serde(default)]
    pub public_base_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_base_url: None,
        }
    }
}

impl ServerConfig {
    /// The effective public base URL, without a trailing slash.
    pub fn public_base_url(&self) -> String {
        match &self.public_base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://localhost:{}", self.port),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Session lifecycle configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// How long a non-immediate connect request waits before checking the outcome.
    #[serde(default = "default_connect_wait_secs")]
    pub connect_wait_secs: u64,

    /// How long shutdown waits for controllers to finish teardown.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,

    /// Reconnect tenants whose persisted connected flag is set at startup.
    #[serde(default = "default_reconnect_on_startup")]
    pub reconnect_on_startup: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_wait_secs: default_connect_wait_secs(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
            reconnect_on_startup: default_reconnect_on_startup(),
        }
    }
}

fn default_connect_wait_secs() -> u64 {
    10
}

fn default_shutdown_timeout_secs() -> u64 {
    15
}

fn default_reconnect_on_startup() -> bool {
    true
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("hookwire").join("hookwire.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("hookwire.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Local file storage for attachments and history dumps.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FilesConfig {
    /// Root directory; each tenant gets `user_<id>/` beneath it.
    #[serde(default = "default_files_root")]
    pub root: String,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            root: default_files_root(),
        }
    }
}

fn default_files_root() -> String {
    "files".to_string()
}

/// Outbound webhook delivery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DeliveryConfig {
    /// Per-request timeout in seconds.
    #[serde(default = "default_delivery_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum number of redirects followed per delivery.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Maximum number of deliveries in flight at once.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,

    /// Deliveries queued beyond this are dropped with a warning.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Accept invalid TLS certificates from webhook receivers.
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_delivery_timeout_secs(),
            max_redirects: default_max_redirects(),
            max_in_flight: default_max_in_flight(),
            queue_capacity: default_queue_capacity(),
            accept_invalid_certs: false,
        }
    }
}

fn default_delivery_timeout_secs() -> u64 {
    30
}

fn default_max_redirects() -> usize {
    15
}

fn default_max_in_flight() -> usize {
    64
}

fn default_queue_capacity() -> usize {
    1024
}

/// Protocol bridge configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProtocolConfig {
    /// Base URL of the protocol sidecar.
    #[serde(default = "default_bridge_url")]
    pub bridge_url: String,

    /// Operating system name advertised for linked devices.
    #[serde(default = "default_device_os")]
    pub device_os: String,

    /// Timeout for request/response calls to the sidecar, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            bridge_url: default_bridge_url(),
            device_os: default_device_os(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_bridge_url() -> String {
    "http://127.0.0.1:8090".to_string()
}

fn default_device_os() -> String {
    "Mac OS 10".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Log level for hookwire crates (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: `text` or `json`.
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}
