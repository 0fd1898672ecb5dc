// SPDX-FileCopyrightText: 2026 Hookwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook payload construction and inline-content filtering.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use hookwire_core::EventType;

static DATA_URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^data:[\w/\-]+;base64,").unwrap());

/// Key removed from every payload before delivery.
pub const BASE64_KEY: &str = "base64";

/// The JSON object carried in `jsonData`.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookPayload {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub event: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base64: Option<String>,
    #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(rename = "fileName", skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

impl WebhookPayload {
    pub fn new(event_type: EventType, event: Value) -> Self {
        Self {
            event_type,
            event,
            state: None,
            base64: None,
            mime_type: None,
            file_name: None,
        }
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    /// Serializes to a JSON value with inline content stripped.
    pub fn to_filtered_value(&self) -> Result<Value, serde_json::Error> {
        let mut value = serde_json::to_value(self)?;
        filter_base64(&mut value);
        Ok(value)
    }
}

/// Whether `s` starts like a base64 data URL.
pub fn is_data_url(s: &str) -> bool {
    DATA_URL.is_match(s)
}

/// Removes every `base64` key and every data-URL string, at any depth.
///
/// Array elements that are data URLs are dropped from the array.
pub fn filter_base64(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|key, v| {
                key != BASE64_KEY && !matches!(v, Value::String(s) if is_data_url(s))
            });
            for v in map.values_mut() {
                filter_base64(v);
            }
        }
        Value::Array(items) => {
            items.retain(|v| !matches!(v, Value::String(s) if is_data_url(s)));
            for v in items.iter_mut() {
                filter_base64(v);
            }
        }
        _ => {}
    }
}

/// True when no `base64` key or data-URL string remains anywhere in `value`.
pub fn is_clean(value: &Value) -> bool {
    match value {
        Value::Object(map) => map
            .iter()
            .all(|(k, v)| k != BASE64_KEY && is_clean(v)),
        Value::Array(items) => items.iter().all(is_clean),
        Value::String(s) => !is_data_url(s),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_base64_key_and_data_urls_recursively() {
        let mut value = json!({
            "type": "Message",
            "base64": "AAAA",
            "event": {
                "thumb": "data:image/jpeg;base64,/9j/4AAQ",
                "caption": "hello",
                "nested": [{"base64": "x"}, "data:audio/ogg;base64,T2dn", "keep"]
            }
        });
        filter_base64(&mut value);
        assert_eq!(
            value,
            json!({
                "type": "Message",
                "event": {
                    "caption": "hello",
                    "nested": [{}, "keep"]
                }
            })
        );
        assert!(is_clean(&value));
    }

    #[test]
    fn plain_strings_mentioning_base64_survive() {
        let mut value = json!({"text": "see data:image/png;base64, inline", "url": "https://x/data:"});
        filter_base64(&mut value);
        assert_eq!(value["text"], "see data:image/png;base64, inline");
        assert_eq!(value["url"], "https://x/data:");
    }

    #[test]
    fn payload_serializes_with_wire_names() {
        let mut payload = WebhookPayload::new(EventType::Message, json!({"id": "m1"}));
        payload.base64 = Some("Zm9v".into());
        payload.mime_type = Some("image/jpeg".into());
        payload.file_name = Some("m1.jpg".into());

        let value = payload.to_filtered_value().unwrap();
        assert_eq!(value["type"], "Message");
        assert_eq!(value["mimeType"], "image/jpeg");
        assert_eq!(value["fileName"], "m1.jpg");
        assert!(value.get("base64").is_none());
        assert!(value.get("state").is_none());
    }

    #[test]
    fn receipt_payload_uses_read_receipt_tag() {
        let payload = WebhookPayload::new(EventType::ReadReceipt, json!({})).with_state("Read");
        let value = payload.to_filtered_value().unwrap();
        assert_eq!(value["type"], "ReadReceipt");
        assert_eq!(value["state"], "Read");
    }
}
