//! JSON text frames exchanged with the browser.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtocolError;
use crate::serialize::WireTree;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    Init {
        path: String,
    },
    DomEvent {
        path: String,
        key: String,
        #[serde(default)]
        event: Value,
    },
}

impl ClientMessage {
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let value: Value =
            serde_json::from_str(text).map_err(|err| ProtocolError::Malformed(err.to_string()))?;
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ProtocolError::MissingType)?;
        if !matches!(kind, "init" | "dom-event") {
            return Err(ProtocolError::UnsupportedMessageType(kind.to_string()));
        }
        serde_json::from_value(value).map_err(|err| ProtocolError::Malformed(err.to_string()))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::Init { .. } => "init",
            ClientMessage::DomEvent { .. } => "dom-event",
        }
    }
}

/// `{"html": <wire tree>}`, pushed after every render.
#[derive(Debug, Serialize)]
pub struct UpdateMessage<'a> {
    pub html: &'a WireTree,
}

pub fn encode_update(tree: &WireTree) -> Result<String, serde_json::Error> {
    serde_json::to_string(&UpdateMessage { html: tree })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Primitive;
    use serde_json::json;

    #[test]
    fn parses_init() {
        let msg = ClientMessage::parse(r#"{"type": "init", "path": "/"}"#).expect("init");
        assert_eq!(
            msg,
            ClientMessage::Init {
                path: "/".to_string()
            }
        );
        assert_eq!(msg.kind(), "init");
    }

    #[test]
    fn parses_dom_event_with_payload() {
        let msg = ClientMessage::parse(
            r#"{"type": "dom-event", "path": "/", "key": "ab12", "event": {"target.value": "hi"}}"#,
        )
        .expect("dom-event");
        assert_eq!(
            msg,
            ClientMessage::DomEvent {
                path: "/".to_string(),
                key: "ab12".to_string(),
                event: json!({"target.value": "hi"}),
            }
        );
    }

    #[test]
    fn dom_event_payload_defaults_to_null() {
        let msg =
            ClientMessage::parse(r#"{"type": "dom-event", "path": "/", "key": "k"}"#).expect("ok");
        assert!(matches!(msg, ClientMessage::DomEvent { event: Value::Null, .. }));
    }

    #[test]
    fn rejects_unknown_type_and_bad_json() {
        assert_eq!(
            ClientMessage::parse(r#"{"type": "resize"}"#),
            Err(ProtocolError::UnsupportedMessageType("resize".to_string()))
        );
        assert_eq!(
            ClientMessage::parse(r#"{"path": "/"}"#),
            Err(ProtocolError::MissingType)
        );
        assert!(matches!(
            ClientMessage::parse("{not json"),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(matches!(
            ClientMessage::parse(r#"{"type": "dom-event", "path": "/"}"#),
            Err(ProtocolError::Malformed(_))
        ));
    }

    #[test]
    fn update_wraps_tree_in_html() {
        let tree = WireTree::Primitive(Primitive::from("hello"));
        let text = encode_update(&tree).expect("encode");
        let value: Value = serde_json::from_str(&text).expect("json");
        assert_eq!(value, json!({"html": "hello"}));
    }
}
