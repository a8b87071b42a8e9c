//! Serves the wire protocol at one websocket endpoint, one [`Session`] per
//! connection.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use beyond_http_server::{
    start_server, Handler, HttpRequest, HttpResponse, HttpServerError, ServerHandle, ServerReply,
    WebSocketHandle, WsHandler, WsMessage,
};
use tokio::sync::mpsc;
use tracing::{error, info, info_span, warn, Instrument};

use crate::config::Config;
use crate::error::Result;
use crate::router::Router;
use crate::session::Session;

/// Starts serving `router`. Every websocket connection gets its own session
/// whose model starts as `M::default()`; the route's init handler fills it in.
pub async fn serve<M>(router: Router<M>, config: &Config) -> Result<ServerHandle>
where
    M: Default + Send + 'static,
{
    config.validate()?;
    let addr = config.server.socket_addr()?;
    let endpoint = Arc::new(Endpoint {
        router: Arc::new(router),
        websocket_path: config.server.websocket_path.clone(),
        index_file: config.server.index_file.clone(),
        outbound_buffer: config.server.outbound_buffer,
        next_session: AtomicU64::new(1),
    });

    let handler: Handler = Arc::new(move |req: HttpRequest| {
        let endpoint = Arc::clone(&endpoint);
        Box::pin(async move { endpoint.reply(req).await })
    });

    let server = start_server(addr, handler).await?;
    info!(
        addr = %server.local_addr(),
        path = %config.server.websocket_path,
        "serving websocket endpoint"
    );
    Ok(server)
}

struct Endpoint<M> {
    router: Arc<Router<M>>,
    websocket_path: String,
    index_file: Option<PathBuf>,
    outbound_buffer: usize,
    next_session: AtomicU64,
}

impl<M> Endpoint<M>
where
    M: Default + Send + 'static,
{
    async fn reply(&self, req: HttpRequest) -> std::result::Result<ServerReply, HttpServerError> {
        if req.route_path() == self.websocket_path {
            let id = self.next_session.fetch_add(1, Ordering::Relaxed);
            let router = Arc::clone(&self.router);
            let outbound_buffer = self.outbound_buffer;
            let ws: WsHandler = Box::new(move |socket: WebSocketHandle| {
                Box::pin(async move {
                    run_connection(id, router, socket, outbound_buffer).await;
                    Ok(())
                })
            });
            return Ok(ServerReply::Ws(ws));
        }

        match &self.index_file {
            Some(path) if req.method == "GET" => {
                let body = tokio::fs::read(path).await.map_err(|err| {
                    HttpServerError::new(format!("failed to read {}: {err}", path.display()))
                })?;
                Ok(ServerReply::Http(HttpResponse::new(200, "text/html", body)))
            }
            _ => Ok(ServerReply::Http(HttpResponse::not_found())),
        }
    }
}

/// Drives one connection to completion. Outbound updates go through a queue
/// drained by a writer task so pushes reach the socket in render order.
pub async fn run_connection<M>(
    id: u64,
    router: Arc<Router<M>>,
    socket: WebSocketHandle,
    outbound_buffer: usize,
) where
    M: Default + Send + 'static,
{
    let span = info_span!("session", id);
    async move {
        info!(remote = %socket.remote_addr(), "websocket connection opened");
        let (mut sender, receiver) = socket.split();
        let (tx, mut rx) = mpsc::channel::<String>(outbound_buffer.max(1));

        let writer = tokio::spawn(
            async move {
                while let Some(text) = rx.recv().await {
                    if let Err(err) = sender.send(WsMessage::Text(text)).await {
                        warn!("failed to push update: {err}");
                        return None;
                    }
                }
                Some(sender)
            }
            .in_current_span(),
        );

        let mut session = Session::new(id, router, M::default(), tx);
        let result = session.run(receiver).await;
        drop(session);

        match result {
            Ok(()) => info!("websocket connection closed"),
            Err(err) => error!("session terminated: {err}"),
        }

        match writer.await {
            Ok(Some(mut sender)) => {
                let _ = sender.close().await;
            }
            Ok(None) => {}
            Err(err) => warn!("writer task failed: {err}"),
        }
    }
    .instrument(span)
    .await
}
