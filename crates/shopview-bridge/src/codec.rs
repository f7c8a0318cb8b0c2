//! Defensive text codec for bridge messages.

use crate::message::Message;
use serde_json::{Map, Value};
use shopview_core::{ShopviewError, ShopviewResult};
use tracing::{trace, warn};

/// Anything larger is not a bridge message.
pub const MAX_MESSAGE_BYTES: usize = 64 * 1024;

/// Serialize a message to its wire text.
pub fn encode(message: &Message) -> ShopviewResult<String> {
    Ok(serde_json::to_string(message)?)
}

/// Parse wire text into a message.
///
/// Accepts the `{type, payload}` envelope, the flat legacy form where payload
/// fields sit next to `type`, and either of those double-encoded as a JSON
/// string.
pub fn decode(raw: &str) -> ShopviewResult<Message> {
    if raw.len() > MAX_MESSAGE_BYTES {
        return Err(ShopviewError::parse(format!(
            "message of {} bytes exceeds {}",
            raw.len(),
            MAX_MESSAGE_BYTES
        )));
    }

    let mut value: Value = serde_json::from_str(raw.trim())
        .map_err(|e| ShopviewError::parse(format!("invalid JSON: {}", e)))?;
    if let Value::String(inner) = value {
        value = serde_json::from_str(inner.trim())
            .map_err(|e| ShopviewError::parse(format!("invalid inner JSON: {}", e)))?;
    }

    let Value::Object(mut object) = value else {
        return Err(ShopviewError::parse("message is not an object"));
    };

    let message_type = match object.remove("type") {
        Some(Value::String(t)) => t,
        _ => return Err(ShopviewError::parse("message has no type")),
    };

    let payload = match object.remove("payload") {
        Some(payload @ Value::Object(_)) => payload,
        Some(Value::Null) | None => Value::Object(object),
        Some(_) => return Err(ShopviewError::parse("payload is not an object")),
    };

    let mut envelope = Map::new();
    envelope.insert("type".to_string(), Value::String(message_type.clone()));
    envelope.insert("payload".to_string(), payload);

    serde_json::from_value(Value::Object(envelope))
        .map_err(|e| ShopviewError::parse(format!("bad {} message: {}", message_type, e)))
}

/// Boundary entry point: malformed input is logged and dropped, never raised.
pub fn receive(raw: &str) -> Option<Message> {
    match decode(raw) {
        Ok(message) => {
            trace!(message_type = message.type_name(), "Received bridge message");
            Some(message)
        }
        Err(e) => {
            warn!(error = %e, len = raw.len(), "Discarding malformed bridge message");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::LinkSource;
    use shopview_core::HostTab;

    #[test]
    fn test_envelope_form() {
        let message = decode(r#"{"type":"NAVIGATE_TAB","payload":{"tab":"cart"}}"#).unwrap();
        assert_eq!(message, Message::NavigateTab { tab: HostTab::Cart });
    }

    #[test]
    fn test_flat_form() {
        let message = decode(r#"{"type":"CART_COUNT","value":3}"#).unwrap();
        assert_eq!(message, Message::CartCount { value: 3 });
    }

    #[test]
    fn test_double_encoded() {
        let raw = serde_json::to_string(r#"{"type":"PING"}"#).unwrap();
        assert_eq!(decode(&raw).unwrap(), Message::Ping {});
    }

    #[test]
    fn test_encode_then_decode() {
        let message = Message::MagicLinkRequested {
            source: LinkSource::Click,
        };
        assert_eq!(decode(&encode(&message).unwrap()).unwrap(), message);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(decode("").is_err());
        assert!(decode("not json").is_err());
        assert!(decode("[1,2,3]").is_err());
        assert!(decode(r#"{"payload":{}}"#).is_err());
        assert!(decode(r#"{"type":"NOPE"}"#).is_err());
        assert!(decode(r#"{"type":"CART_COUNT","value":-1}"#).is_err());
        assert!(decode(r#"{"type":"CART_COUNT","payload":7}"#).is_err());
    }

    #[test]
    fn test_rejects_oversized() {
        let raw = format!(
            r#"{{"type":"PING","pad":"{}"}}"#,
            "x".repeat(MAX_MESSAGE_BYTES)
        );
        assert!(decode(&raw).is_err());
    }

    #[test]
    fn test_receive_swallows_errors() {
        assert_eq!(receive("{oops"), None);
        assert_eq!(
            receive(r#"{"type":"TAB_ACTIVE","payload":{"value":true}}"#),
            Some(Message::TabActive { value: true })
        );
    }
}
