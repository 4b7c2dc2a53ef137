//! End-to-end tests over real WebSocket connections
//!
//! Each test boots the full router on an ephemeral port and talks to it with
//! a tungstenite client.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, timeout};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use taskflow_realtime::config::Settings;
use taskflow_realtime::server::{create_app, AppState};
use taskflow_realtime::shutdown::{GracefulShutdown, ShutdownConfig};

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

const TIMEOUT: Duration = Duration::from_secs(5);

async fn start_server() -> (String, AppState) {
    let state = AppState::new(Settings::default());
    let app = create_app(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("ws://{addr}/ws"), state)
}

async fn connect(url: &str) -> WsClient {
    let (ws, _) = connect_async(url).await.expect("WebSocket connect failed");
    ws
}

async fn authenticate(ws: &mut WsClient, user_id: &str) {
    let auth = json!({"type": "AUTH", "userId": user_id}).to_string();
    ws.send(Message::text(auth)).await.unwrap();
}

async fn wait_until<F: Fn() -> bool>(condition: F) {
    timeout(TIMEOUT, async {
        while !condition() {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Next text frame, skipping control frames
async fn next_text(ws: &mut WsClient) -> String {
    loop {
        let msg = timeout(TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for message")
            .expect("stream ended")
            .expect("WebSocket error");
        match msg {
            Message::Text(text) => return text.as_str().to_owned(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

async fn assert_silent(ws: &mut WsClient) {
    let result = timeout(Duration::from_millis(200), ws.next()).await;
    assert!(result.is_err(), "expected no message, got {result:?}");
}

#[tokio::test]
async fn test_events_reach_every_device_of_the_user() {
    let (url, state) = start_server().await;
    let mut c1 = connect(&url).await;
    let mut c2 = connect(&url).await;
    authenticate(&mut c1, "u1").await;
    authenticate(&mut c2, "u1").await;
    wait_until(|| state.registry.connections_for("u1").len() == 2).await;

    let result = state.emitter.task_created("u1", &json!({"id": 7}));
    assert_eq!(result.delivered, 2);

    let expected = r#"{"type":"TASK_CREATED","payload":{"id":7}}"#;
    assert_eq!(next_text(&mut c1).await, expected);
    assert_eq!(next_text(&mut c2).await, expected);
}

#[tokio::test]
async fn test_closed_connection_is_unregistered() {
    let (url, state) = start_server().await;
    let mut c1 = connect(&url).await;
    let mut c2 = connect(&url).await;
    authenticate(&mut c1, "u1").await;
    authenticate(&mut c2, "u1").await;
    wait_until(|| state.registry.connections_for("u1").len() == 2).await;

    c1.close(None).await.unwrap();
    wait_until(|| state.registry.connections_for("u1").len() == 1).await;

    state.emitter.task_updated("u1", &json!({"id": 7}));
    assert_eq!(
        next_text(&mut c2).await,
        r#"{"type":"TASK_UPDATED","payload":{"id":7}}"#
    );

    drop(c2);
    wait_until(|| !state.registry.has_live_connections("u1")).await;
    assert_eq!(state.registry.stats().unique_users, 0);

    let result = state.emitter.task_deleted("u1", 7);
    assert_eq!(result.delivered, 0);
}

#[tokio::test]
async fn test_client_close_handshake_completes_promptly() {
    let (url, state) = start_server().await;
    let mut client = connect(&url).await;
    authenticate(&mut client, "u1").await;
    wait_until(|| state.registry.has_live_connections("u1")).await;

    let started = std::time::Instant::now();
    client.close(None).await.unwrap();
    // Drain until the server's close reply ends the stream
    timeout(TIMEOUT, async {
        while let Some(Ok(_)) = client.next().await {}
    })
    .await
    .expect("close handshake did not finish");

    assert!(
        started.elapsed() < Duration::from_millis(500),
        "close took {:?}",
        started.elapsed()
    );
    wait_until(|| !state.registry.has_live_connections("u1")).await;
}

#[tokio::test]
async fn test_share_reaches_only_the_recipient() {
    let (url, state) = start_server().await;
    let mut sharer = connect(&url).await;
    let mut recipient = connect(&url).await;
    authenticate(&mut sharer, "u1").await;
    authenticate(&mut recipient, "u2").await;
    wait_until(|| {
        state.registry.has_live_connections("u1") && state.registry.has_live_connections("u2")
    })
    .await;

    state.emitter.task_shared(&taskflow_realtime::notification::TaskShare {
        task_id: 11,
        shared_by: "u1".to_string(),
        shared_with: "u2".to_string(),
    });

    assert_eq!(
        next_text(&mut recipient).await,
        r#"{"type":"TASK_SHARED","payload":{"taskId":11,"sharedBy":"u1"}}"#
    );
    assert_silent(&mut sharer).await;
}

#[tokio::test]
async fn test_malformed_messages_keep_connection_open() {
    let (url, state) = start_server().await;
    let mut client = connect(&url).await;

    client.send(Message::text("not json")).await.unwrap();
    client
        .send(Message::text(r#"{"type":"SUBSCRIBE","channel":"x"}"#))
        .await
        .unwrap();
    authenticate(&mut client, "u3").await;
    wait_until(|| state.registry.has_live_connections("u3")).await;

    state.emitter.task_deleted("u3", 5);
    assert_eq!(
        next_text(&mut client).await,
        r#"{"type":"TASK_DELETED","payload":{"id":5}}"#
    );
}

#[tokio::test]
async fn test_second_auth_is_ignored() {
    let (url, state) = start_server().await;
    let mut client = connect(&url).await;
    authenticate(&mut client, "u1").await;
    wait_until(|| state.registry.has_live_connections("u1")).await;

    authenticate(&mut client, "u2").await;
    // Give the server time to process the second AUTH
    sleep(Duration::from_millis(100)).await;

    assert!(!state.registry.has_live_connections("u2"));
    assert_eq!(state.registry.connections_for("u1").len(), 1);
}

#[tokio::test]
async fn test_unbound_connection_receives_nothing() {
    let (url, state) = start_server().await;
    let mut client = connect(&url).await;

    state.emitter.task_created("u1", &json!({"id": 1}));

    assert_silent(&mut client).await;
    assert_eq!(state.registry.stats().total_connections, 0);
}

#[tokio::test]
async fn test_graceful_shutdown_closes_sockets() {
    let (url, state) = start_server().await;
    let mut client = connect(&url).await;
    authenticate(&mut client, "u1").await;
    wait_until(|| state.registry.has_live_connections("u1")).await;

    let shutdown = GracefulShutdown::with_config(
        state.registry.clone(),
        state.shutdown.clone(),
        ShutdownConfig {
            drain_timeout: Duration::from_secs(2),
        },
    );
    let result = shutdown.execute("test").await;

    assert_eq!(result.connections_at_start, 1);
    assert_eq!(result.connections_closed, 1);
    assert_eq!(result.connections_released, 0);

    let frame = timeout(TIMEOUT, client.next())
        .await
        .expect("timed out waiting for close")
        .expect("stream ended")
        .expect("WebSocket error");
    assert!(matches!(frame, Message::Close(_)));
}
