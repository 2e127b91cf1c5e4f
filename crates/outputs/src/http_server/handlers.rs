//! HTTP route handlers
//!
//! Every request pulls transactions from the same inbound receiver. The
//! receiver sits behind an async mutex that a request holds only while it
//! waits for one transaction, so a request never has more than one
//! transaction in flight.
//!
//! # Endpoints
//!
//! - `path` - one transaction per request, 408 when none arrives in time
//! - `stream_path` - chunked body, one chunk per transaction until the
//!   client leaves
//! - `ws_path` - websocket, one binary frame per part

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::{Arc, OnceLock};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::http::{Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use conduit_component::Lifecycle;
use conduit_message::{DeliveryError, Transaction, TransactionRx};
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio_stream::Stream;

use super::metrics::HttpServerMetrics;
use super::response::{OCTET_STREAM, batch_response, stream_chunk, text_response};

/// Shared state for handlers
pub struct HandlerState {
    /// Set once by `consume`
    pub inbound: OnceLock<Mutex<TransactionRx>>,
    pub lifecycle: Lifecycle,
    pub allowed_verbs: Vec<Method>,
    pub timeout: Duration,
    pub metrics: HttpServerMetrics,
}

/// Outcome of waiting for the next transaction
enum Received {
    Transaction(Transaction),
    /// Close was requested while waiting
    Closing,
    /// Upstream dropped its sender
    UpstreamClosed,
}

impl HandlerState {
    #[inline]
    fn verb_allowed(&self, method: &Method) -> bool {
        self.allowed_verbs.contains(method)
    }

    /// Wait for the next transaction or the close signal
    ///
    /// Cancel safe: dropping the future before it resolves consumes nothing.
    async fn receive(&self) -> Received {
        let close = self.lifecycle.close_token();

        let Some(inbound) = self.inbound.get() else {
            // Not consuming yet; behave like an empty stream
            close.cancelled().await;
            return Received::Closing;
        };

        tokio::select! {
            biased;
            _ = close.cancelled() => Received::Closing,
            transaction = async { inbound.lock().await.recv().await } => match transaction {
                Some(transaction) => Received::Transaction(transaction),
                None => Received::UpstreamClosed,
            },
        }
    }

    /// Upstream is gone, so this output has nothing left to serve
    fn upstream_closed(&self) {
        if self.lifecycle.trigger_close() {
            tracing::info!("http server output upstream closed, closing");
        }
    }
}

/// Single-shot endpoint
pub async fn get_message(State(state): State<Arc<HandlerState>>, method: Method) -> Response {
    if state.lifecycle.is_closing() {
        return text_response(StatusCode::SERVICE_UNAVAILABLE, "server closed");
    }
    if !state.verb_allowed(&method) {
        return text_response(StatusCode::METHOD_NOT_ALLOWED, "incorrect method");
    }

    let started = Instant::now();
    let received = match tokio::time::timeout(state.timeout, state.receive()).await {
        Ok(received) => received,
        Err(_) => {
            return text_response(
                StatusCode::REQUEST_TIMEOUT,
                "timed out waiting for message",
            );
        }
    };

    let transaction = match received {
        Received::Transaction(transaction) => transaction,
        Received::Closing => {
            return text_response(StatusCode::SERVICE_UNAVAILABLE, "server closed");
        }
        Received::UpstreamClosed => {
            state.upstream_closed();
            return text_response(StatusCode::SERVICE_UNAVAILABLE, "server closed");
        }
    };

    let response = batch_response(transaction.payload());
    state.metrics.get.delivered(transaction.payload(), started);
    transaction.ack(Ok(()));
    response
}

/// Continuous stream endpoint
///
/// A task pulls transactions and pushes one chunk per transaction into the
/// response body. A transaction is acked once the body has handed its chunk
/// to the connection. The chunk channel closing means the client went away.
pub async fn stream_messages(State(state): State<Arc<HandlerState>>, method: Method) -> Response {
    if state.lifecycle.is_closing() {
        return text_response(StatusCode::SERVICE_UNAVAILABLE, "server closed");
    }
    if !state.verb_allowed(&method) {
        return text_response(StatusCode::METHOD_NOT_ALLOWED, "incorrect method");
    }

    let (chunk_tx, chunk_rx) = mpsc::channel::<Chunk>(1);
    tokio::spawn(pump_stream(state, chunk_tx));

    (
        [(header::CONTENT_TYPE, OCTET_STREAM)],
        Body::from_stream(TakenChunks::new(chunk_rx)),
    )
        .into_response()
}

/// A body chunk and the signal fired once the body has handed it on
type Chunk = (Bytes, oneshot::Sender<()>);

/// Response body that reports when each chunk has been taken
///
/// A chunk counts as taken when the body is polled again after yielding
/// it. Dropping the body drops every unfired signal, buffered ones included.
struct TakenChunks {
    chunks: mpsc::Receiver<Chunk>,
    yielded: Option<oneshot::Sender<()>>,
}

impl TakenChunks {
    fn new(chunks: mpsc::Receiver<Chunk>) -> Self {
        Self {
            chunks,
            yielded: None,
        }
    }
}

impl Stream for TakenChunks {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if let Some(taken) = self.yielded.take() {
            if taken.send(()).is_err() {
                tracing::debug!("stream pump stopped before chunk was taken");
            }
        }

        match self.chunks.poll_recv(cx) {
            Poll::Ready(Some((chunk, taken))) => {
                self.yielded = Some(taken);
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Outcome of handing one chunk to the body
enum Handoff {
    Taken,
    ClientGone,
    Closing,
}

async fn hand_off(state: &HandlerState, chunk_tx: &mpsc::Sender<Chunk>, chunk: Bytes) -> Handoff {
    let (taken_tx, taken_rx) = oneshot::channel();
    if chunk_tx.send((chunk, taken_tx)).await.is_err() {
        return Handoff::ClientGone;
    }

    let close = state.lifecycle.close_token();
    tokio::select! {
        taken = taken_rx => match taken {
            Ok(()) => Handoff::Taken,
            Err(_) => Handoff::ClientGone,
        },
        _ = close.cancelled() => Handoff::Closing,
    }
}

async fn pump_stream(state: Arc<HandlerState>, chunk_tx: mpsc::Sender<Chunk>) {
    loop {
        let received = tokio::select! {
            biased;
            _ = chunk_tx.closed() => break,
            received = state.receive() => received,
        };

        let transaction = match received {
            Received::Transaction(transaction) => transaction,
            Received::Closing => break,
            Received::UpstreamClosed => {
                state.upstream_closed();
                break;
            }
        };

        let started = Instant::now();
        let chunk = stream_chunk(transaction.payload());

        match hand_off(&state, &chunk_tx, chunk).await {
            Handoff::Taken => {
                state.metrics.stream.delivered(transaction.payload(), started);
                transaction.ack(Ok(()));
            }
            Handoff::ClientGone => {
                state.metrics.stream.error.inc();
                transaction.ack(Err(DeliveryError::write("stream client disconnected")));
                break;
            }
            Handoff::Closing => {
                // Chunk may still reach the client, delivery is unknown
                transaction.ack(Err(DeliveryError::ShuttingDown));
                break;
            }
        }
    }

    tracing::debug!("stream client finished");
}

/// Websocket endpoint
pub async fn websocket(State(state): State<Arc<HandlerState>>, ws: WebSocketUpgrade) -> Response {
    if state.lifecycle.is_closing() {
        return text_response(StatusCode::SERVICE_UNAVAILABLE, "server closed");
    }
    ws.on_upgrade(move |socket| serve_websocket(state, socket))
}

async fn serve_websocket(state: Arc<HandlerState>, mut socket: WebSocket) {
    loop {
        let received = tokio::select! {
            biased;
            inbound = socket.recv() => match inbound {
                // Client frames carry nothing for us
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => continue,
            },
            received = state.receive() => received,
        };

        let transaction = match received {
            Received::Transaction(transaction) => transaction,
            Received::Closing => break,
            Received::UpstreamClosed => {
                state.upstream_closed();
                break;
            }
        };

        let started = Instant::now();
        let mut failed = None;
        for part in transaction.payload().iter() {
            if let Err(e) = socket.send(Message::Binary(part.data().clone())).await {
                failed = Some(e);
                break;
            }
        }

        if let Some(e) = failed {
            tracing::warn!(error = %e, "websocket write failed");
            state.metrics.websocket.error.inc();
            transaction.ack(Err(DeliveryError::write(e.to_string())));
            break;
        }

        state
            .metrics
            .websocket
            .delivered(transaction.payload(), started);
        transaction.ack(Ok(()));
    }

    if let Err(e) = socket.send(Message::Close(None)).await {
        tracing::debug!(error = %e, "websocket close frame failed");
    }
}
