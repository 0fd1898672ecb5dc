// SPDX-FileCopyrightText: 2026 Hookwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Maps protocol events onto webhook event types.

use hookwire_core::EventType;
use hookwire_core::ProtocolEvent;
use hookwire_core::events::{PresenceEvent, ReceiptEvent, ReceiptKind};

/// What the pipeline does with one protocol event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Build a payload and, subject to subscriptions, deliver it.
    Deliver(EventType),
    /// Apply a state effect; never delivered.
    StateOnly,
    /// Log and drop.
    LogOnly,
    /// Log at warn and drop.
    Unhandled,
}

pub fn classify(event: &ProtocolEvent) -> Disposition {
    match event {
        ProtocolEvent::Message(_) => Disposition::Deliver(EventType::Message),
        ProtocolEvent::Receipt(receipt) => match receipt_state(receipt) {
            Some(_) => Disposition::Deliver(EventType::ReadReceipt),
            None => Disposition::LogOnly,
        },
        ProtocolEvent::Presence(_) => Disposition::Deliver(EventType::Presence),
        ProtocolEvent::ChatPresence(_) => Disposition::Deliver(EventType::ChatPresence),
        ProtocolEvent::HistorySync { .. } => Disposition::Deliver(EventType::HistorySync),
        ProtocolEvent::Call(_) => Disposition::Deliver(EventType::Call),
        ProtocolEvent::Connected
        | ProtocolEvent::PushNameSetting
        | ProtocolEvent::AppStateSyncComplete { .. }
        | ProtocolEvent::PairSuccess { .. }
        | ProtocolEvent::LoggedOut { .. } => Disposition::StateOnly,
        ProtocolEvent::StreamReplaced | ProtocolEvent::AppState { .. } => Disposition::LogOnly,
        ProtocolEvent::Unknown { .. } => Disposition::Unhandled,
    }
}

/// `state` field for a receipt; `None` for receipt kinds that are dropped.
pub fn receipt_state(receipt: &ReceiptEvent) -> Option<&'static str> {
    match receipt.kind {
        ReceiptKind::Read => Some("Read"),
        ReceiptKind::ReadSelf => Some("ReadSelf"),
        ReceiptKind::Delivered => Some("Delivered"),
        _ => None,
    }
}

pub fn presence_state(presence: &PresenceEvent) -> &'static str {
    if presence.unavailable { "offline" } else { "online" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn receipt(kind: ReceiptKind) -> ProtocolEvent {
        ProtocolEvent::Receipt(ReceiptEvent {
            kind,
            chat: "c".into(),
            sender: "s".into(),
            message_ids: vec!["m".into()],
            timestamp: Utc::now(),
        })
    }

    #[test]
    fn only_read_and_delivered_receipts_are_delivered() {
        for kind in [ReceiptKind::Read, ReceiptKind::ReadSelf, ReceiptKind::Delivered] {
            assert_eq!(
                classify(&receipt(kind)),
                Disposition::Deliver(EventType::ReadReceipt)
            );
        }
        for kind in [ReceiptKind::Played, ReceiptKind::Retry, ReceiptKind::Other] {
            assert_eq!(classify(&receipt(kind)), Disposition::LogOnly);
        }
    }

    #[test]
    fn state_events_are_never_delivered() {
        assert_eq!(classify(&ProtocolEvent::Connected), Disposition::StateOnly);
        assert_eq!(
            classify(&ProtocolEvent::LoggedOut {
                on_connect: false,
                reason: None
            }),
            Disposition::StateOnly
        );
        assert_eq!(classify(&ProtocolEvent::StreamReplaced), Disposition::LogOnly);
        assert_eq!(
            classify(&ProtocolEvent::Unknown {
                name: "Blocklist".into()
            }),
            Disposition::Unhandled
        );
    }

    #[test]
    fn presence_maps_to_online_offline() {
        let mut p = PresenceEvent {
            from: "x".into(),
            unavailable: false,
            last_seen: None,
        };
        assert_eq!(presence_state(&p), "online");
        p.unavailable = true;
        assert_eq!(presence_state(&p), "offline");
    }
}
