//! One browser connection: its model, its current event table and the loop
//! that turns inbound frames into renders and handler calls.

use std::sync::Arc;

use beyond_http_server::{HttpServerError, WsMessage};
use futures_util::{Stream, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{BeyondError, ProtocolError, Result};
use crate::events::EventTable;
use crate::protocol::{encode_update, ClientMessage};
use crate::router::Router;
use crate::serialize::serialize;


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Init,
    DomEvent,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Init => "init",
            EventKind::DomEvent => "dom-event",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    pub path: String,
    /// Client payload of a `dom-event`; `None` for `init`.
    pub payload: Option<Value>,
}

impl Event {
    pub fn init(path: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Init,
            path: path.into(),
            payload: None,
        }
    }

    pub fn dom_event(path: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: EventKind::DomEvent,
            path: path.into(),
            payload: Some(payload),
        }
    }

    /// Looks up one field of the payload, e.g. `"target.value"`.
    pub fn payload_field(&self, name: &str) -> Option<&Value> {
        self.payload.as_ref().and_then(|payload| payload.get(name))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Socket open, nothing rendered yet.
    Connected,
    /// At least one update pushed.
    Active,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Owned by the connection's task; nothing else touches the model or the
/// event table, and frames are handled strictly one after another.
pub struct Session<M> {
    id: u64,
    router: Arc<Router<M>>,
    model: M,
    events: EventTable<M>,
    state: SessionState,
    path: Option<String>,
    outbound: mpsc::Sender<String>,
}

impl<M: Send + 'static> Session<M> {
    /// `outbound` receives every encoded update in push order.
    pub fn new(id: u64, router: Arc<Router<M>>, model: M, outbound: mpsc::Sender<String>) -> Self {
        Self {
            id,
            router,
            model,
            events: EventTable::new(),
            state: SessionState::Connected,
            path: None,
            outbound,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    pub fn events(&self) -> &EventTable<M> {
        &self.events
    }

    /// Path of the last `init`, if any.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Renders `event.path`, replaces the event table with the one from this
    /// render and pushes the new tree. A failed render or serialization
    /// leaves the previous table in place.
    pub async fn render(&mut self, event: &Event) -> Result<()> {
        let router = Arc::clone(&self.router);
        let node = router.resolve(self, event).await?;
        let (tree, events) = serialize(&node)?;
        self.events = events;
        let text = encode_update(&tree)?;
        self.outbound
            .send(text)
            .await
            .map_err(|_| BeyondError::Closed)?;
        self.state = SessionState::Active;
        Ok(())
    }

    pub async fn handle_text(&mut self, text: &str) -> Result<()> {
        let message = ClientMessage::parse(text)?;
        debug!(session = self.id, "websocket got message type: {}", message.kind());
        match message {
            ClientMessage::Init { path } => {
                let event = Event::init(path);
                self.path = Some(event.path.clone());
                self.render(&event).await
            }
            ClientMessage::DomEvent { path, key, event } => {
                self.dispatch(&key, Event::dom_event(path, event)).await
            }
        }
    }

    /// Invokes the handler bound to `key` in the current event table. Keys
    /// from an earlier render are misses.
    pub async fn dispatch(&mut self, key: &str, event: Event) -> Result<()> {
        let Some(handler) = self.events.get(key).cloned() else {
            return Err(BeyondError::DispatchMiss {
                key: key.to_string(),
            });
        };
        handler.call(self, event).await
    }

    pub async fn handle_frame(&mut self, frame: WsMessage) -> Result<Flow> {
        match frame {
            WsMessage::Text(text) => {
                self.handle_text(&text).await?;
                Ok(Flow::Continue)
            }
            WsMessage::Close => Ok(Flow::Stop),
            WsMessage::Ping | WsMessage::Pong => Ok(Flow::Continue),
            WsMessage::Binary(_) => Err(ProtocolError::UnsupportedFrame("binary").into()),
        }
    }

    /// Processes frames until the client closes, the transport fails, or a
    /// frame fails. The session ends up `Closed` in every case.
    pub async fn run<S>(&mut self, mut inbound: S) -> Result<()>
    where
        S: Stream<Item = std::result::Result<WsMessage, HttpServerError>> + Unpin + Send,
    {
        let result = loop {
            let frame = match inbound.next().await {
                Some(Ok(frame)) => frame,
                Some(Err(err)) => {
                    warn!(session = self.id, "websocket connection closed with exception {err}");
                    break Err(BeyondError::Transport(err));
                }
                None => break Ok(()),
            };
            match self.handle_frame(frame).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Stop) => break Ok(()),
                Err(err) => break Err(err),
            }
        };
        self.state = SessionState::Closed;
        result
    }
}
