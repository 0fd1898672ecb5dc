// SPDX-FileCopyrightText: 2026 Hookwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types exchanged with the protocol sidecar.

use serde::{Deserialize, Serialize};

use hookwire_core::MediaRef;

/// Body of `POST /devices/{tenant}/connect`.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectRequest<'a> {
    /// Stored linked identity, or `null` for a fresh device.
    pub identity: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<&'a str>,
    pub os: &'a str,
}

/// Reply to a connect request.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectResponse {
    #[serde(default)]
    pub logged_in: bool,
    #[serde(default)]
    pub identity: Option<String>,
    #[serde(default)]
    pub push_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PairPhoneRequest<'a> {
    pub phone: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PairPhoneResponse {
    pub code: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DownloadRequest<'a> {
    pub media: &'a MediaRef,
}

#[derive(Debug, Clone, Serialize)]
pub struct PresenceRequest {
    pub state: &'static str,
}

/// Account details pushed on the `account` stream event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountUpdate {
    #[serde(default)]
    pub push_name: Option<String>,
    #[serde(default)]
    pub identity: Option<String>,
}

/// Error body returned by the sidecar on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeErrorBody {
    pub error: String,
}
