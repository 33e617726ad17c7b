//! Real-time evaluation channel.
//!
//! Each connection gets a reader (this task) and a writer task joined by a
//! bounded queue. Evaluations run on their own tasks and push their result
//! into the queue; if the connection is gone by then the frame is dropped.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{Sink, SinkExt, Stream, StreamExt};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::state::{AppState, EvaluationRequest};

/// Sending half of a connection's outbound queue
#[derive(Clone)]
pub struct Outbound {
    tx: mpsc::Sender<Message>,
}

impl Outbound {
    pub fn new(tx: mpsc::Sender<Message>) -> Self {
        Self { tx }
    }

    /// Queue a JSON frame without waiting; drops it if the queue is full
    pub fn send_json<T: Serialize>(&self, value: &T) {
        let text = match serde_json::to_string(value) {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to serialize outbound frame: {}", e);
                return;
            }
        };

        match self.tx.try_send(Message::Text(text)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => warn!("Outbound queue full, dropping frame"),
            Err(TrySendError::Closed(_)) => debug!("Connection closed, discarding frame"),
        }
    }

    pub fn send_error(&self, message: impl Into<String>) {
        self.send_json(&json!({ "error": message.into() }));
    }
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.max_message_size(state.transport.max_frame_bytes)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    info!("WebSocket client connected");
    let (sink, stream) = socket.split();
    serve_connection(sink, stream, state).await;
    info!("WebSocket client disconnected");
}

/// Run one connection until the client leaves, goes idle, or a write fails
async fn serve_connection<Si, St>(sink: Si, stream: St, state: Arc<AppState>)
where
    Si: Sink<Message, Error = axum::Error> + Unpin + Send + 'static,
    St: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    let (tx, rx) = mpsc::channel(state.transport.outbound_capacity);

    let mut writer = tokio::spawn(write_loop(
        sink,
        rx,
        state.transport.ping_interval(),
        state.transport.write_timeout(),
    ));

    tokio::select! {
        _ = read_loop(stream, Outbound::new(tx), state.clone()) => {}
        _ = &mut writer => debug!("Writer stopped, dropping connection"),
    }

    // Workers may still hold senders; stopping the writer closes the queue
    writer.abort();
}

async fn read_loop<S>(mut stream: S, outbound: Outbound, state: Arc<AppState>)
where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    let idle_timeout = state.transport.idle_timeout();
    let mut deadline = Instant::now() + idle_timeout;

    loop {
        let message = match tokio::time::timeout_at(deadline, stream.next()).await {
            Err(_) => {
                warn!("No pong within {:?}, closing connection", idle_timeout);
                break;
            }
            Ok(None) => break,
            Ok(Some(Err(e))) => {
                warn!("WebSocket read failed: {}", e);
                break;
            }
            Ok(Some(Ok(message))) => message,
        };

        match message {
            Message::Text(text) => {
                handle_frame(&state, &outbound, &text);
            }
            Message::Binary(bytes) => match std::str::from_utf8(&bytes) {
                Ok(text) => {
                    handle_frame(&state, &outbound, text);
                }
                Err(_) => outbound.send_error("Invalid request: frame is not UTF-8"),
            },
            Message::Pong(_) => deadline = Instant::now() + idle_timeout,
            Message::Ping(_) => {}
            Message::Close(_) => break,
        }
    }
}

async fn write_loop<S>(
    mut sink: S,
    mut rx: mpsc::Receiver<Message>,
    ping_interval: Duration,
    write_timeout: Duration,
) where
    S: Sink<Message, Error = axum::Error> + Unpin,
{
    let mut ticker = tokio::time::interval_at(Instant::now() + ping_interval, ping_interval);

    loop {
        let message = tokio::select! {
            next = rx.recv() => match next {
                Some(message) => message,
                None => break,
            },
            _ = ticker.tick() => Message::Ping(Vec::new()),
        };

        match tokio::time::timeout(write_timeout, sink.send(message)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!("WebSocket write failed: {}", e);
                break;
            }
            Err(_) => {
                warn!("WebSocket write timed out after {:?}", write_timeout);
                break;
            }
        }
    }

    let _ = sink.close().await;
}

/// Handle one inbound frame.
///
/// Invalid frames produce exactly one error frame and no evaluation. Valid
/// ones start an evaluation whose result or error is queued when it finishes.
pub fn handle_frame(state: &Arc<AppState>, outbound: &Outbound, text: &str) -> Option<JoinHandle<()>> {
    let request: EvaluationRequest = match serde_json::from_str(text) {
        Ok(request) => request,
        Err(e) => {
            warn!("Malformed evaluation request: {}", e);
            outbound.send_error(format!("Invalid request: {}", e));
            return None;
        }
    };

    if let Err(e) = state.validate(&request) {
        outbound.send_error(e.to_string());
        return None;
    }

    let state = state.clone();
    let outbound = outbound.clone();
    Some(tokio::spawn(async move {
        match state.run_evaluation(&request).await {
            Ok(result) => outbound.send_json(&result),
            Err(e) => outbound.send_error(e.to_string()),
        }
    }))
}
