//! In-memory UI tree. Nodes are rebuilt on every render and only ever read
//! by the serializer, so there is no removal or diffing API.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::handler::Handler;

/// Attribute keys starting with this prefix bind an event instead of
/// rendering an HTML attribute: `on_click` binds the `click` event.
pub const EVENT_PREFIX: &str = "on_";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Primitive {
    Text(String),
    Int(i64),
    Float(f64),
}

impl From<&str> for Primitive {
    fn from(value: &str) -> Self {
        Primitive::Text(value.to_string())
    }
}

impl From<String> for Primitive {
    fn from(value: String) -> Self {
        Primitive::Text(value)
    }
}

impl From<&String> for Primitive {
    fn from(value: &String) -> Self {
        Primitive::Text(value.clone())
    }
}

impl From<i64> for Primitive {
    fn from(value: i64) -> Self {
        Primitive::Int(value)
    }
}

impl From<i32> for Primitive {
    fn from(value: i32) -> Self {
        Primitive::Int(value.into())
    }
}

impl From<u32> for Primitive {
    fn from(value: u32) -> Self {
        Primitive::Int(value.into())
    }
}

impl From<f64> for Primitive {
    fn from(value: f64) -> Self {
        Primitive::Float(value)
    }
}

pub enum AttrValue<M> {
    Primitive(Primitive),
    Callback(Handler<M>),
}

impl<M, T> From<T> for AttrValue<M>
where
    T: Into<Primitive>,
{
    fn from(value: T) -> Self {
        AttrValue::Primitive(value.into())
    }
}

impl<M> From<Handler<M>> for AttrValue<M> {
    fn from(handler: Handler<M>) -> Self {
        AttrValue::Callback(handler)
    }
}

impl<M> fmt::Debug for AttrValue<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Primitive(value) => write!(f, "{value:?}"),
            AttrValue::Callback(handler) => write!(f, "{handler:?}"),
        }
    }
}

/// A child of a node: either another node or a text/number leaf.
pub enum Content<M> {
    Node(Node<M>),
    Primitive(Primitive),
}

impl<M> From<Node<M>> for Content<M> {
    fn from(node: Node<M>) -> Self {
        Content::Node(node)
    }
}

impl<M, T> From<T> for Content<M>
where
    T: Into<Primitive>,
{
    fn from(value: T) -> Self {
        Content::Primitive(value.into())
    }
}

impl<M> fmt::Debug for Content<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Content::Node(node) => write!(f, "{node:?}"),
            Content::Primitive(value) => write!(f, "{value:?}"),
        }
    }
}

pub struct Node<M> {
    tag: String,
    attributes: BTreeMap<String, AttrValue<M>>,
    children: Vec<Content<M>>,
}

impl<M> Node<M> {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attributes(&self) -> &BTreeMap<String, AttrValue<M>> {
        &self.attributes
    }

    pub fn children(&self) -> &[Content<M>] {
        &self.children
    }

    /// Sets one attribute, replacing any previous value under the same key.
    pub fn attr(mut self, key: impl Into<String>, value: impl Into<AttrValue<M>>) -> Self {
        self.set_attr(key, value);
        self
    }

    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<AttrValue<M>>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn attrs<I, K>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, AttrValue<M>)>,
        K: Into<String>,
    {
        for (key, value) in attributes {
            self.attributes.insert(key.into(), value);
        }
        self
    }

    /// Binds `handler` to the client-side `event` (`"click"`, `"submit"`, ...).
    pub fn on(self, event: &str, handler: Handler<M>) -> Self {
        self.attr(format!("{EVENT_PREFIX}{event}"), handler)
    }

    pub fn child(mut self, child: impl Into<Content<M>>) -> Self {
        self.append(child);
        self
    }

    pub fn with_children<I, C>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Content<M>>,
    {
        self.extend(children);
        self
    }

    pub fn append(&mut self, child: impl Into<Content<M>>) {
        self.children.push(child.into());
    }

    pub fn extend<I, C>(&mut self, children: I)
    where
        I: IntoIterator<Item = C>,
        C: Into<Content<M>>,
    {
        for child in children {
            self.append(child);
        }
    }
}

impl<M> fmt::Debug for Node<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Node: {} {:?}>", self.tag, self.attributes)
    }
}

pub fn h<M>(tag: impl Into<String>) -> Node<M> {
    Node::new(tag)
}

/// A `form` whose default browser submit is suppressed; bind `on_submit`
/// to handle it on the server.
pub fn form<M>() -> Node<M> {
    Node::new("form").attr("onsubmit", "return false;")
}

/// Text inputs get a unique tag (`input#<hex>`) so the client can tell them
/// apart between renders; any `id` given for one is dropped.
pub fn input<M, I, K>(attributes: I) -> Node<M>
where
    I: IntoIterator<Item = (K, AttrValue<M>)>,
    K: Into<String>,
{
    let attributes: Vec<(String, AttrValue<M>)> = attributes
        .into_iter()
        .map(|(key, value)| (key.into(), value))
        .collect();
    let is_text = attributes.iter().any(|(key, value)| {
        key == "type" && matches!(value, AttrValue::Primitive(Primitive::Text(t)) if t == "text")
    });
    if !is_text {
        return Node::new("input").attrs(attributes);
    }
    let tag = format!("input#{}", Uuid::new_v4().simple());
    let mut node = Node::new(tag);
    for (key, value) in attributes {
        if key == "id" {
            warn!("id attribute on text input node ignored");
            continue;
        }
        node.attributes.insert(key, value);
    }
    node
}
