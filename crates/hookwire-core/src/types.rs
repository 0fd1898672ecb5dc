// SPDX-FileCopyrightText: 2026 Hookwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the store, the session registry, and the dispatch pipeline.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Integer identifier of a tenant, 1:1 with a tenant store row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub i64);

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a [`PluginAdapter`](crate::PluginAdapter).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Protocol,
    Storage,
    Webhook,
}

/// Classified event types. The string form is what tenants subscribe to and
/// what appears in the `type` field of a webhook payload.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
    Serialize,
    Deserialize,
)]
pub enum EventType {
    Message,
    #[strum(to_string = "ReadReceipt", serialize = "Receipt")]
    #[serde(alias = "Receipt")]
    ReadReceipt,
    Presence,
    ChatPresence,
    HistorySync,
    Call,
    Connected,
    PairSuccess,
    LoggedOut,
    Disconnected,
}

/// Wildcard subscription name.
pub const ALL_EVENTS: &str = "All";

/// The set of event types a tenant wants delivered.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Subscriptions {
    /// Every classified event type.
    #[default]
    All,
    /// Only the listed types; never empty.
    Only(BTreeSet<EventType>),
}

impl Subscriptions {
    /// Parses a list of event-type names.
    ///
    /// Unknown names are discarded with a warning and duplicates collapse.
    /// Any list naming `All`, or leaving nothing after discarding, yields
    /// [`Subscriptions::All`].
    pub fn parse<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = BTreeSet::new();
        for name in names {
            let name = name.as_ref().trim();
            if name.is_empty() {
                continue;
            }
            if name == ALL_EVENTS {
                return Subscriptions::All;
            }
            match EventType::from_str(name) {
                Ok(event_type) => {
                    set.insert(event_type);
                }
                Err(_) => {
                    tracing::warn!(event_type = name, "discarding unknown event type");
                }
            }
        }
        if set.is_empty() {
            return Subscriptions::All;
        }
        Subscriptions::Only(set)
    }

    /// Parses the comma-separated form kept in the tenant store.
    pub fn from_stored(stored: &str) -> Self {
        Self::parse(stored.split(','))
    }

    /// Renders the comma-separated form kept in the tenant store.
    pub fn to_stored(&self) -> String {
        self.names().join(",")
    }

    /// Whether `event_type` should be delivered.
    pub fn contains(&self, event_type: EventType) -> bool {
        match self {
            Subscriptions::All => true,
            Subscriptions::Only(set) => set.contains(&event_type),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Subscriptions::All)
    }

    /// Subscription names in a stable order.
    pub fn names(&self) -> Vec<String> {
        match self {
            Subscriptions::All => vec![ALL_EVENTS.to_string()],
            Subscriptions::Only(set) => set.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl Serialize for Subscriptions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.names())
    }
}

impl<'de> Deserialize<'de> for Subscriptions {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let names = Vec::<String>::deserialize(deserializer)?;
        Ok(Subscriptions::parse(names))
    }
}

/// A tenant row as kept by the tenant store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantRecord {
    pub id: TenantId,
    pub name: String,
    pub token: String,
    /// Linked protocol identity; absent until pairing succeeds.
    pub jid: Option<String>,
    /// Webhook URL; empty when unset.
    pub webhook: String,
    /// Comma-separated subscription names.
    pub events: String,
    pub proxy_url: Option<String>,
    pub connected: bool,
    /// Current pairing artifact (QR data URL); absent outside pairing.
    pub qrcode: Option<String>,
}

/// Input for provisioning a tenant.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTenant {
    pub name: String,
    pub token: String,
    #[serde(default)]
    pub webhook: String,
    #[serde(default)]
    pub events: String,
    #[serde(default)]
    pub proxy_url: Option<String>,
}

/// Resolved tenant attributes as mirrored by the auth cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantInfo {
    pub id: TenantId,
    pub token: String,
    pub jid: Option<String>,
    pub webhook: String,
    pub subscriptions: Subscriptions,
    pub proxy_url: Option<String>,
}

impl TenantInfo {
    /// Whether a webhook URL is configured.
    pub fn has_webhook(&self) -> bool {
        !self.webhook.trim().is_empty()
    }
}

impl From<&TenantRecord> for TenantInfo {
    fn from(record: &TenantRecord) -> Self {
        Self {
            id: record.id,
            token: record.token.clone(),
            jid: record.jid.clone(),
            webhook: record.webhook.clone(),
            subscriptions: Subscriptions::from_stored(&record.events),
            proxy_url: record.proxy_url.clone(),
        }
    }
}
