//! Turns a [`Node`] tree into the JSON-ready wire tree plus the event table
//! holding every callback found along the way.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::warn;

use crate::error::Result;
use crate::events::{random_key, EventTable};
use crate::node::{AttrValue, Content, Node, Primitive, EVENT_PREFIX};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WireTree {
    Primitive(Primitive),
    Element(WireElement),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireElement {
    pub tag: String,
    pub attributes: BTreeMap<String, Primitive>,
    /// Event name to event key; omitted when the node binds no events.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub on: BTreeMap<String, String>,
    pub children: Vec<WireTree>,
}

pub fn serialize<M>(node: &Node<M>) -> Result<(WireTree, EventTable<M>)> {
    serialize_with(node, &mut random_key)
}

pub fn serialize_content<M>(content: &Content<M>) -> Result<(WireTree, EventTable<M>)> {
    match content {
        Content::Node(node) => serialize(node),
        Content::Primitive(value) => Ok((WireTree::Primitive(value.clone()), EventTable::new())),
    }
}

/// Like [`serialize`], drawing event keys from `key_source`.
pub fn serialize_with<M>(
    node: &Node<M>,
    key_source: &mut dyn FnMut() -> String,
) -> Result<(WireTree, EventTable<M>)> {
    let mut events = EventTable::new();
    let tree = element_to_wire(node, &mut events, key_source)?;
    Ok((WireTree::Element(tree), events))
}

fn html_attribute_name(key: &str) -> &str {
    match key {
        "Class" => "class",
        "For" => "for",
        other => other,
    }
}

fn content_to_wire<M>(
    content: &Content<M>,
    events: &mut EventTable<M>,
    key_source: &mut dyn FnMut() -> String,
) -> Result<WireTree> {
    match content {
        Content::Primitive(value) => Ok(WireTree::Primitive(value.clone())),
        Content::Node(node) => Ok(WireTree::Element(element_to_wire(
            node, events, key_source,
        )?)),
    }
}

fn element_to_wire<M>(
    node: &Node<M>,
    events: &mut EventTable<M>,
    key_source: &mut dyn FnMut() -> String,
) -> Result<WireElement> {
    let mut attributes = BTreeMap::new();
    let mut on = BTreeMap::new();
    for (key, value) in node.attributes() {
        match (key.strip_prefix(EVENT_PREFIX), value) {
            (Some(event), AttrValue::Callback(handler)) => {
                let event_key = events.bind(handler.clone(), key_source)?;
                on.insert(event.to_string(), event_key);
            }
            (Some(_), AttrValue::Primitive(_)) => {
                warn!(tag = node.tag(), key = %key, "event attribute without a handler dropped");
            }
            (None, AttrValue::Primitive(value)) => {
                attributes.insert(html_attribute_name(key).to_string(), value.clone());
            }
            (None, AttrValue::Callback(_)) => {
                warn!(tag = node.tag(), key = %key, "handler bound to a non-event attribute dropped");
            }
        }
    }
    let children = node
        .children()
        .iter()
        .map(|child| content_to_wire(child, events, key_source))
        .collect::<Result<Vec<_>>>()?;
    Ok(WireElement {
        tag: node.tag().to_string(),
        attributes,
        on,
        children,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BeyondError;
    use crate::handler::{Handler, HandlerFuture};
    use crate::node::h;
    use crate::session::{Event, Session};
    use serde_json::json;

    fn noop(_session: &mut Session<()>, _event: Event) -> HandlerFuture<'_> {
        Box::pin(async { Ok(()) })
    }

    fn to_json(tree: &WireTree) -> serde_json::Value {
        serde_json::to_value(tree).expect("wire tree serializes")
    }

    #[test]
    fn tree_without_events_has_no_on_field() {
        let node: Node<()> = h("div").attr("id", "shell").child(h("h1").child("beyondjs"));
        let (tree, events) = serialize(&node).expect("serialize");
        assert!(events.is_empty());
        assert_eq!(
            to_json(&tree),
            json!({
                "tag": "div",
                "attributes": {"id": "shell"},
                "children": [{"tag": "h1", "attributes": {}, "children": ["beyondjs"]}]
            })
        );
    }

    #[test]
    fn class_and_for_are_renamed() {
        let node: Node<()> = h("label").attr("Class", "reply echo").attr("For", "name");
        let (tree, _) = serialize(&node).expect("serialize");
        assert_eq!(
            to_json(&tree)["attributes"],
            json!({"class": "reply echo", "for": "name"})
        );
    }

    #[test]
    fn primitive_children_pass_through_unchanged() {
        let node: Node<()> = h("p").child("count: ").child(3).child(1.5);
        let (tree, _) = serialize(&node).expect("serialize");
        assert_eq!(to_json(&tree)["children"], json!(["count: ", 3, 1.5]));

        let (leaf, events) = serialize_content::<()>(&Content::from("bare")).expect("serialize");
        assert_eq!(to_json(&leaf), json!("bare"));
        assert!(events.is_empty());
    }

    #[test]
    fn event_attributes_move_into_the_event_table() {
        let handler = Handler::new(noop);
        let node: Node<()> = h("button")
            .attr("type", "button")
            .on("click", handler.clone())
            .child("increment");
        let (tree, events) = serialize(&node).expect("serialize");
        let json = to_json(&tree);

        assert_eq!(json["attributes"], json!({"type": "button"}));
        let key = json["on"]["click"].as_str().expect("click key");
        assert_eq!(events.len(), 1);
        let bound = events.get(key).expect("key bound");
        assert!(bound.ptr_eq(&handler));
    }

    #[test]
    fn every_binding_gets_a_distinct_key() {
        let node: Node<()> = h("div")
            .child(h("form").on("submit", Handler::new(noop)))
            .child(
                h("ul").with_children(
                    (0..5).map(|i| h("li").on("click", Handler::new(noop)).child(i)),
                ),
            )
            .on("mouseover", Handler::new(noop))
            .on("click", Handler::new(noop));
        let (tree, events) = serialize(&node).expect("serialize");
        assert_eq!(events.len(), 8);

        let json = to_json(&tree);
        let mut keys = vec![
            json["on"]["mouseover"].as_str().expect("mouseover").to_string(),
            json["on"]["click"].as_str().expect("click").to_string(),
            json["children"][0]["on"]["submit"]
                .as_str()
                .expect("submit")
                .to_string(),
        ];
        for li in json["children"][1]["children"].as_array().expect("items") {
            keys.push(li["on"]["click"].as_str().expect("li click").to_string());
        }
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), 8);
        assert!(keys.iter().all(|key| events.contains_key(key)));
    }

    #[test]
    fn event_prefix_never_reaches_wire_attributes() {
        let node: Node<()> = h("div")
            .attr("on_click", "alert(1)")
            .attr("title", Handler::new(noop))
            .attr("data-x", "1");
        let (tree, events) = serialize(&node).expect("serialize");
        let json = to_json(&tree);
        assert_eq!(json["attributes"], json!({"data-x": "1"}));
        assert!(json.get("on").is_none());
        assert!(events.is_empty());
    }

    #[test]
    fn key_exhaustion_aborts_the_render() {
        let node: Node<()> = h("div")
            .child(h("button").on("click", Handler::new(noop)))
            .child(h("button").on("click", Handler::new(noop)));
        let mut constant = || "0000".to_string();
        let err = serialize_with(&node, &mut constant).expect_err("second key collides");
        assert!(matches!(err, BeyondError::KeyspaceExhausted { .. }));
    }
}
