// SPDX-FileCopyrightText: 2026 Hookwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parser for the sidecar's per-device event stream.
//!
//! The stream is Server-Sent Events. The event name selects the payload:
//! `pairing` carries a [`PairingEvent`], `event` a [`ProtocolEvent`] and
//! `account` an [`AccountUpdate`]. Unknown names are skipped.

use std::pin::Pin;

use eventsource_stream::Eventsource;
use futures::stream::{Stream, StreamExt};
use serde::de::DeserializeOwned;

use hookwire_core::{HookwireError, PairingEvent, ProtocolEvent};

use crate::types::AccountUpdate;

/// One typed item from the device stream.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeEvent {
    Pairing(PairingEvent),
    Protocol(ProtocolEvent),
    Account {
        push_name: Option<String>,
        identity: Option<String>,
    },
    Ping,
}

pub type BridgeEventStream = Pin<Box<dyn Stream<Item = Result<BridgeEvent, HookwireError>> + Send>>;

/// Turns a streaming response into typed [`BridgeEvent`]s.
pub fn parse_event_stream(response: reqwest::Response) -> BridgeEventStream {
    let events = response.bytes_stream().eventsource();

    let mapped = events.filter_map(|result| async move {
        match result {
            Ok(event) => match event.event.as_str() {
                "pairing" => Some(
                    decode::<PairingEvent>("pairing", &event.data).map(BridgeEvent::Pairing),
                ),
                "event" => Some(
                    decode::<ProtocolEvent>("event", &event.data).map(BridgeEvent::Protocol),
                ),
                "account" => Some(decode::<AccountUpdate>("account", &event.data).map(|a| {
                    BridgeEvent::Account {
                        push_name: a.push_name,
                        identity: a.identity,
                    }
                })),
                "ping" => Some(Ok(BridgeEvent::Ping)),
                _ => None,
            },
            Err(e) => Some(Err(HookwireError::protocol(format!("event stream error: {e}")))),
        }
    });

    Box::pin(mapped)
}

fn decode<T: DeserializeOwned>(name: &str, data: &str) -> Result<T, HookwireError> {
    serde_json::from_str(data).map_err(|e| HookwireError::Protocol {
        message: format!("failed to parse {name} event: {e}"),
        source: Some(Box::new(e)),
    })
}
