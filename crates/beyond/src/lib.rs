//! Server-driven UI. Application state and view code stay on the server;
//! the browser receives a serialized tree over a websocket and reports
//! interactions back by event key.
//!
//! ```no_run
//! use beyond::{h, interactive, Config, Event, HandlerFuture, Node, Params, Router, Session};
//!
//! #[derive(Default)]
//! struct Counter {
//!     count: i64,
//! }
//!
//! fn init(session: &mut Session<Counter>, _params: Params, _event: Event) -> HandlerFuture<'_> {
//!     Box::pin(async move {
//!         session.model_mut().count = 0;
//!         Ok(())
//!     })
//! }
//!
//! fn increment(session: &mut Session<Counter>, _event: Event) -> HandlerFuture<'_> {
//!     Box::pin(async move {
//!         session.model_mut().count += 1;
//!         Ok(())
//!     })
//! }
//!
//! fn render(_params: &Params, model: &Counter, _event: &Event) -> Node<Counter> {
//!     h("div")
//!         .child(h("h2").child(format!("The count is {}", model.count)))
//!         .child(h("button").on("click", interactive(increment)).child("increment the count"))
//! }
//!
//! # async fn run() -> beyond::Result<()> {
//! let mut router = Router::new();
//! router.add_route(r"/counter$", init, render)?;
//! let server = beyond::serve(router, &Config::default()).await?;
//! # server.stop().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod handler;
pub mod logging;
pub mod node;
pub mod protocol;
pub mod rerender;
pub mod router;
pub mod serialize;
pub mod server;
pub mod session;

pub use beyond_http_server::ServerHandle;
pub use config::{Config, LoggingConfig, ServerConfig};
pub use error::{BeyondError, ProtocolError, Result};
pub use events::EventTable;
pub use handler::{Handler, HandlerFuture};
pub use logging::init_logging;
pub use node::{form, h, input, AttrValue, Content, Node, Primitive};
pub use protocol::ClientMessage;
pub use rerender::{interactive, with_rerender};
pub use router::{Params, Router};
pub use serialize::{serialize, WireTree};
pub use server::serve;
pub use session::{Event, EventKind, Session, SessionState};
