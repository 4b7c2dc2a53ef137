use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::connection_manager::{ConnectionHandle, ConnectionState};
use crate::metrics::{
    ControlMetrics, WS_CONNECTIONS_CLOSED, WS_CONNECTIONS_OPENED, WS_CONNECTION_DURATION,
};
use crate::server::AppState;

use super::binder::IdentityBinder;
use super::message::OutboundMessage;

/// Time the writer gets to flush a close frame once the connection is torn down
const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

/// WebSocket upgrade handler.
///
/// Connections start unbound; the client binds one by sending an AUTH message.
#[tracing::instrument(name = "ws.upgrade", skip(ws, state))]
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    tracing::debug!("WebSocket upgrade requested");
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Drive one established WebSocket connection until either side goes away
#[tracing::instrument(name = "ws.connection", skip(socket, state), fields(otel.kind = "server"))]
async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_start = Instant::now();
    let (handle, rx) = ConnectionHandle::channel();
    let connection_id = handle.id;
    let mut shutdown = state.shutdown.subscribe();

    WS_CONNECTIONS_OPENED.inc();
    tracing::info!(connection_id = %connection_id, "WebSocket connection established");

    let (ws_sender, ws_receiver) = socket.split();

    // Writer drains the outbound queue, reader feeds control messages to the binder
    let mut send_task = tokio::spawn(write_loop(ws_sender, rx));
    let mut recv_task = tokio::spawn(read_loop(ws_receiver, state.binder.clone(), handle.clone()));

    let heartbeat = Duration::from_secs(state.settings.websocket.heartbeat_interval.max(1));
    let mut heartbeat_timer = tokio::time::interval(heartbeat);
    // Skip immediate first tick
    heartbeat_timer.tick().await;

    let reason = loop {
        tokio::select! {
            _ = &mut send_task => break "writer closed",
            _ = &mut recv_task => break "peer closed",
            _ = shutdown.recv() => break "server shutdown",
            _ = heartbeat_timer.tick() => {
                if handle.send(OutboundMessage::Ping).is_err() {
                    break "writer closed";
                }
            }
        }
    };

    // Writer flushes what is queued, sends the close frame and exits
    let _ = handle.send(OutboundMessage::Close);
    handle.set_state(ConnectionState::Closing);
    state.registry.unregister(&handle);

    if !recv_task.is_finished() {
        recv_task.abort();
    }
    if !send_task.is_finished() {
        if timeout(CLOSE_FLUSH_TIMEOUT, &mut send_task).await.is_err() {
            send_task.abort();
        }
    }

    WS_CONNECTIONS_CLOSED.inc();
    let duration = connection_start.elapsed().as_secs_f64();
    WS_CONNECTION_DURATION.observe(duration);

    tracing::info!(
        connection_id = %connection_id,
        user_id = ?handle.identity(),
        reason = reason,
        duration_secs = duration,
        "WebSocket connection closed"
    );
}

/// Forward queued frames to the socket, stopping at the first failed write
async fn write_loop(
    mut ws_sender: SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<OutboundMessage>,
) {
    while let Some(msg) = rx.recv().await {
        let frame = match msg {
            OutboundMessage::Text(text) => Message::Text(text),
            OutboundMessage::Ping => Message::Ping(Default::default()),
            OutboundMessage::Close => {
                let _ = ws_sender.send(Message::Close(None)).await;
                break;
            }
        };

        if ws_sender.send(frame).await.is_err() {
            tracing::debug!("WebSocket write failed, closing writer");
            break;
        }
    }
}

/// Consume inbound frames. Returns when the peer closes or the transport errors.
async fn read_loop(
    mut ws_receiver: SplitStream<WebSocket>,
    binder: IdentityBinder,
    handle: Arc<ConnectionHandle>,
) {
    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => {
                binder.handle_text(&handle, text.as_str());
            }
            Ok(Message::Binary(_)) => {
                tracing::warn!(connection_id = %handle.id, "Discarding binary frame");
                ControlMetrics::record_malformed();
            }
            Ok(Message::Close(_)) => {
                tracing::debug!(connection_id = %handle.id, "Received close frame");
                break;
            }
            // Pings are answered by the transport
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Err(e) => {
                tracing::warn!(connection_id = %handle.id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }
}
