// SPDX-FileCopyrightText: 2026 Hookwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Events emitted by a protocol client.
//!
//! [`ProtocolEvent`] is what a session's event handler receives one at a time;
//! [`PairingEvent`] flows over the pairing channel while a session is unpaired.
//! Both are serializable so they can cross a process boundary and be embedded
//! verbatim in webhook payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of media attached to a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Audio,
    Document,
    Video,
}

/// Reference to downloadable media. `handle` is opaque to the gateway and is
/// passed back unchanged to [`ProtocolClient::download`](crate::ProtocolClient::download).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaRef {
    pub kind: MediaKind,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    #[serde(default, rename = "fileName", skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default)]
    pub handle: serde_json::Value,
}

/// Envelope metadata of a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageInfo {
    pub id: String,
    pub chat: String,
    pub sender: String,
    #[serde(default)]
    pub is_from_me: bool,
    #[serde(default)]
    pub is_group: bool,
    #[serde(default)]
    pub push_name: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEvent {
    pub info: MessageInfo,
    /// Decoded message body as produced by the protocol client.
    #[serde(default)]
    pub message: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptKind {
    Delivered,
    Read,
    ReadSelf,
    Played,
    Sender,
    Retry,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptEvent {
    pub kind: ReceiptKind,
    pub chat: String,
    pub sender: String,
    pub message_ids: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceEvent {
    pub from: String,
    #[serde(default)]
    pub unavailable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatPresenceEvent {
    pub chat: String,
    pub sender: String,
    /// `composing` or `paused`.
    pub state: String,
    /// `audio` when recording a voice note, empty otherwise.
    #[serde(default)]
    pub media: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallKind {
    Offer,
    Accept,
    Terminate,
    OfferNotice,
    RelayLatency,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallEvent {
    pub kind: CallKind,
    pub from: String,
    pub call_id: String,
    pub timestamp: DateTime<Utc>,
}

/// App-state patch name whose completed sync means the account is usable.
pub const CRITICAL_APP_STATE: &str = "critical_block";

/// One event from a protocol session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ProtocolEvent {
    Connected,
    PushNameSetting,
    AppStateSyncComplete {
        name: String,
    },
    PairSuccess {
        id: String,
        #[serde(default)]
        business_name: String,
        #[serde(default)]
        platform: String,
    },
    StreamReplaced,
    Message(MessageEvent),
    Receipt(ReceiptEvent),
    Presence(PresenceEvent),
    ChatPresence(ChatPresenceEvent),
    HistorySync {
        data: serde_json::Value,
    },
    AppState {
        #[serde(default)]
        index: Vec<String>,
    },
    LoggedOut {
        #[serde(default)]
        on_connect: bool,
        #[serde(default)]
        reason: Option<String>,
    },
    Call(CallEvent),
    /// An event the client emitted that this gateway has no mapping for.
    Unknown {
        name: String,
    },
}

impl ProtocolEvent {
    /// Short name used in logs.
    pub fn name(&self) -> &str {
        match self {
            ProtocolEvent::Connected => "Connected",
            ProtocolEvent::PushNameSetting => "PushNameSetting",
            ProtocolEvent::AppStateSyncComplete { .. } => "AppStateSyncComplete",
            ProtocolEvent::PairSuccess { .. } => "PairSuccess",
            ProtocolEvent::StreamReplaced => "StreamReplaced",
            ProtocolEvent::Message(_) => "Message",
            ProtocolEvent::Receipt(_) => "Receipt",
            ProtocolEvent::Presence(_) => "Presence",
            ProtocolEvent::ChatPresence(_) => "ChatPresence",
            ProtocolEvent::HistorySync { .. } => "HistorySync",
            ProtocolEvent::AppState { .. } => "AppState",
            ProtocolEvent::LoggedOut { .. } => "LoggedOut",
            ProtocolEvent::Call(_) => "Call",
            ProtocolEvent::Unknown { name } => name,
        }
    }
}

/// Events on a session's pairing channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "code", rename_all = "lowercase")]
pub enum PairingEvent {
    /// A fresh scannable code; replaces any earlier one.
    Code(String),
    /// The pairing window closed without a scan.
    Timeout,
    /// The code was scanned and the device is linked.
    Success,
    /// The client reported a pairing failure.
    Error(String),
}
