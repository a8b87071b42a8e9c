use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, Stream, StreamExt};
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_tungstenite::tungstenite::Message;
use hyper_tungstenite::HyperWebsocketStream;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub remote_addr: Option<SocketAddr>,
}

impl HttpRequest {
    /// Request path without the query string.
    pub fn route_path(&self) -> &str {
        match self.path.split_once('?') {
            Some((path, _query)) => path,
            None => &self.path,
        }
    }
}

pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: vec![("content-type".to_string(), content_type.to_string())],
            body: body.into(),
        }
    }

    pub fn not_found() -> Self {
        Self::new(404, "text/plain", "not found")
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct HttpServerError {
    pub message: String,
}

impl HttpServerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsMessage {
    Text(String),
    Binary(Vec<u8>),
    Ping,
    Pong,
    Close,
}

pub type HandlerFuture =
    Pin<Box<dyn Future<Output = Result<ServerReply, HttpServerError>> + Send>>;
pub type Handler = Arc<dyn Fn(HttpRequest) -> HandlerFuture + Send + Sync>;
pub type WsHandlerFuture = Pin<Box<dyn Future<Output = Result<(), HttpServerError>> + Send>>;
pub type WsHandler = Box<dyn FnOnce(WebSocketHandle) -> WsHandlerFuture + Send>;

pub enum ServerReply {
    Http(HttpResponse),
    /// Accept the websocket upgrade and hand the socket to the handler.
    Ws(WsHandler),
}

pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    join_handle: Option<JoinHandle<()>>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting connections. Connections already upgraded keep running
    /// until their own transport closes.
    pub async fn stop(mut self) -> Result<(), HttpServerError> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.join_handle.take() {
            handle
                .await
                .map_err(|_| HttpServerError::new("server task panicked"))?;
        }
        Ok(())
    }
}

pub struct WebSocketHandle {
    socket: HyperWebsocketStream,
    remote_addr: SocketAddr,
}

impl WebSocketHandle {
    fn new(socket: HyperWebsocketStream, remote_addr: SocketAddr) -> Self {
        Self {
            socket,
            remote_addr,
        }
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    pub fn split(self) -> (WsSender, WsReceiver) {
        let (sink, stream) = self.socket.split();
        (WsSender { sink }, WsReceiver { stream })
    }
}

pub struct WsSender {
    sink: SplitSink<HyperWebsocketStream, Message>,
}

impl WsSender {
    pub async fn send(&mut self, msg: WsMessage) -> Result<(), HttpServerError> {
        self.sink
            .send(to_ws_message(msg))
            .await
            .map_err(|err| HttpServerError::new(err.to_string()))
    }

    pub async fn close(&mut self) -> Result<(), HttpServerError> {
        self.send(WsMessage::Close).await
    }
}

/// Inbound frames; the stream ends when the peer goes away.
pub struct WsReceiver {
    stream: SplitStream<HyperWebsocketStream>,
}

impl Stream for WsReceiver {
    type Item = Result<WsMessage, HttpServerError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.stream.poll_next_unpin(cx).map(|item| {
            item.map(|frame| {
                frame
                    .map(map_ws_message)
                    .map_err(|err| HttpServerError::new(err.to_string()))
            })
        })
    }
}

pub async fn start_server(
    addr: SocketAddr,
    handler: Handler,
) -> Result<ServerHandle, HttpServerError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|err| HttpServerError::new(format!("failed to bind {addr}: {err}")))?;
    let local_addr = listener
        .local_addr()
        .map_err(|err| HttpServerError::new(err.to_string()))?;
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

    let join_handle = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = &mut shutdown_rx => break,
                accept = listener.accept() => {
                    let (stream, remote_addr) = match accept {
                        Ok(value) => value,
                        Err(err) => {
                            warn!("accept failed: {err}");
                            continue;
                        }
                    };
                    let handler = handler.clone();
                    let service = service_fn(move |req| {
                        let handler = handler.clone();
                        async move { handle_request(req, remote_addr, handler).await }
                    });
                    tokio::spawn(async move {
                        let mut builder = auto::Builder::new(TokioExecutor::new());
                        builder.http1().keep_alive(true);
                        let conn = builder.serve_connection_with_upgrades(TokioIo::new(stream), service);
                        if let Err(err) = conn.await {
                            debug!(%remote_addr, "http connection ended: {err}");
                        }
                    });
                }
            }
        }
    });

    Ok(ServerHandle {
        local_addr,
        shutdown_tx: Some(shutdown_tx),
        join_handle: Some(join_handle),
    })
}

fn plain_response(status: StatusCode, text: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::from(text.into()));
    *response.status_mut() = status;
    response
}

async fn handle_request(
    req: Request<Incoming>,
    remote_addr: SocketAddr,
    handler: Handler,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let is_upgrade = hyper_tungstenite::is_upgrade_request(&req);
    let (parts, body) = req.into_parts();

    let (body_bytes, upgrade_body) = if is_upgrade {
        (Bytes::new(), Some(body))
    } else {
        (body.collect().await?.to_bytes(), None)
    };

    let request = match build_request(&parts, body_bytes, remote_addr) {
        Ok(value) => value,
        Err(err) => return Ok(plain_response(StatusCode::BAD_REQUEST, err.message)),
    };
    let reply = match handler(request).await {
        Ok(value) => value,
        Err(err) => {
            return Ok(plain_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                err.message,
            ))
        }
    };

    match reply {
        ServerReply::Http(response) => match convert_response(response) {
            Ok(response) => Ok(response),
            Err(err) => Ok(plain_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                err.message,
            )),
        },
        ServerReply::Ws(ws_handler) => {
            let Some(body) = upgrade_body else {
                return Ok(plain_response(StatusCode::BAD_REQUEST, "upgrade required"));
            };
            let mut req = Request::from_parts(parts, body);
            match hyper_tungstenite::upgrade(&mut req, None) {
                Ok((response, websocket)) => {
                    tokio::spawn(async move {
                        match websocket.await {
                            Ok(ws_stream) => {
                                let socket = WebSocketHandle::new(ws_stream, remote_addr);
                                if let Err(err) = ws_handler(socket).await {
                                    warn!(%remote_addr, "websocket handler failed: {err}");
                                }
                            }
                            Err(err) => warn!(%remote_addr, "websocket upgrade failed: {err}"),
                        }
                    });
                    Ok(response)
                }
                Err(_) => Ok(plain_response(StatusCode::BAD_REQUEST, "upgrade failed")),
            }
        }
    }
}

fn build_request(
    parts: &hyper::http::request::Parts,
    body: Bytes,
    remote_addr: SocketAddr,
) -> Result<HttpRequest, HttpServerError> {
    let method = parts.method.as_str().to_string();
    let path = parts
        .uri
        .path_and_query()
        .map(|value| value.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());
    let headers = headers_to_vec(&parts.headers)?;
    Ok(HttpRequest {
        method,
        path,
        headers,
        body: body.to_vec(),
        remote_addr: Some(remote_addr),
    })
}

fn headers_to_vec(
    headers: &hyper::HeaderMap<hyper::header::HeaderValue>,
) -> Result<Vec<(String, String)>, HttpServerError> {
    let mut out = Vec::new();
    for (name, value) in headers.iter() {
        let value = value
            .to_str()
            .map_err(|_| HttpServerError::new("invalid header value"))?;
        out.push((name.as_str().to_string(), value.to_string()));
    }
    Ok(out)
}

fn convert_response(response: HttpResponse) -> Result<Response<Full<Bytes>>, HttpServerError> {
    let status =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut builder = Response::builder().status(status);
    {
        let headers = builder
            .headers_mut()
            .ok_or_else(|| HttpServerError::new("failed to access headers"))?;
        for (name, value) in response.headers {
            let name = hyper::header::HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| HttpServerError::new("invalid header name"))?;
            let value = hyper::header::HeaderValue::from_str(&value)
                .map_err(|_| HttpServerError::new("invalid header value"))?;
            headers.append(name, value);
        }
    }
    builder
        .body(Full::from(Bytes::from(response.body)))
        .map_err(|_| HttpServerError::new("invalid response body"))
}

fn map_ws_message(msg: Message) -> WsMessage {
    match msg {
        Message::Text(text) => WsMessage::Text(text.to_string()),
        Message::Binary(data) => WsMessage::Binary(data.to_vec()),
        Message::Ping(_) => WsMessage::Ping,
        Message::Pong(_) => WsMessage::Pong,
        Message::Close(_) => WsMessage::Close,
        _ => WsMessage::Close,
    }
}

fn to_ws_message(msg: WsMessage) -> Message {
    match msg {
        WsMessage::Text(text) => Message::Text(text.into()),
        WsMessage::Binary(data) => Message::Binary(data.into()),
        WsMessage::Ping => Message::Ping(Vec::new().into()),
        WsMessage::Pong => Message::Pong(Vec::new().into()),
        WsMessage::Close => Message::Close(None),
    }
}
