// Test-specific lint overrides: integration tests use unwrap/expect freely.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::missing_panics_doc,
    clippy::missing_docs_in_private_items
)]

//! Rate-limit queue tests over a live connection: cooldown activation from a
//! server notice, loss-free requeueing, and the single batched flush.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, accept_async};

use wirechat::client::{Client, ClientOptions};
use wirechat::render::{RenderEvent, StatusNotice};

type ServerWs = WebSocketStream<TcpStream>;

fn options(url: &str) -> ClientOptions {
    ClientOptions {
        server_url: url.to_string(),
        command_prefix: "!!".to_string(),
        reconnect: Duration::from_millis(200),
        watchdog: Duration::from_secs(10),
        auth_scheme: "google".to_string(),
        auth_token: "tok-123".to_string(),
    }
}

async fn bind() -> (String, TcpListener) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    (url, listener)
}

async fn accept(listener: &TcpListener) -> ServerWs {
    let (stream, _) = timeout(Duration::from_secs(5), listener.accept())
        .await
        .expect("timed out waiting for a connection")
        .unwrap();
    accept_async(stream).await.unwrap()
}

async fn read_frame(ws: &mut ServerWs) -> Value {
    try_read_frame(ws, Duration::from_secs(5))
        .await
        .expect("timed out waiting for a frame")
}

/// Read the next text frame within `window`, or `None` if nothing arrives.
async fn try_read_frame(ws: &mut ServerWs, window: Duration) -> Option<Value> {
    let deadline = tokio::time::Instant::now() + window;
    loop {
        let message = tokio::time::timeout_at(deadline, ws.next())
            .await
            .ok()?
            .expect("stream ended")
            .unwrap();
        if let Message::Text(text) = message {
            return Some(serde_json::from_str(text.as_str()).unwrap());
        }
    }
}

async fn send_packet(ws: &mut ServerWs, kind: &str, data: Value) {
    let frame = json!({ "type": kind, "data": data }).to_string();
    ws.send(Message::Text(frame.into())).await.unwrap();
}

async fn expect_event(
    rx: &mut mpsc::Receiver<RenderEvent>,
    what: &str,
    pred: impl Fn(&RenderEvent) -> bool,
) -> RenderEvent {
    loop {
        let event = timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {what}"))
            .unwrap_or_else(|| panic!("render channel closed waiting for {what}"));
        if pred(&event) {
            return event;
        }
    }
}

/// Connect, authenticate, and drain the handshake.
async fn ready_session(
    listener: &TcpListener,
    events: &mut mpsc::Receiver<RenderEvent>,
) -> ServerWs {
    let mut ws = accept(listener).await;
    for _ in 0..3 {
        read_frame(&mut ws).await;
    }
    send_packet(&mut ws, "status", json!({"status": "authenticated"})).await;
    expect_event(events, "authenticated notice", |e| {
        matches!(e, RenderEvent::Status(StatusNotice::Authenticated))
    })
    .await;
    ws
}

#[tokio::test]
async fn cooldown_queues_and_flushes_one_batched_frame() {
    let (url, listener) = bind().await;
    let (client, line_tx, mut events) = Client::new(options(&url));
    let _handle = tokio::spawn(client.run());
    let mut ws = ready_session(&listener, &mut events).await;

    // The first send reaches the wire and is remembered as the last attempt.
    line_tx.send("hello".to_string()).await.unwrap();
    let frame = read_frame(&mut ws).await;
    assert_eq!(frame["data"]["text"], "hello");

    // The server rate-limits: "please wait 1" arms a 2-second cooldown and
    // requeues the rejected send.
    send_packet(
        &mut ws,
        "servermsg",
        json!({"message": "please wait 1 seconds"}),
    )
    .await;
    expect_event(&mut events, "requeue notice", |e| {
        matches!(e, RenderEvent::RequeuedLast)
    })
    .await;

    // A line typed during the cooldown is queued, not sent.
    line_tx.send("second".to_string()).await.unwrap();
    expect_event(&mut events, "queued notice", |e| {
        matches!(e, RenderEvent::MessageQueued)
    })
    .await;
    assert!(
        try_read_frame(&mut ws, Duration::from_millis(500))
            .await
            .is_none(),
        "a frame was sent during the cooldown"
    );

    // At expiry: exactly one frame, lines newline-joined in order.
    let flushed = try_read_frame(&mut ws, Duration::from_secs(3))
        .await
        .expect("no flush after cooldown expiry");
    assert_eq!(flushed["type"], "message");
    assert_eq!(flushed["data"]["text"], "hello\nsecond");

    assert!(
        try_read_frame(&mut ws, Duration::from_millis(500))
            .await
            .is_none(),
        "more than one flush frame"
    );
}

#[tokio::test]
async fn cooldown_with_nothing_queued_flushes_nothing() {
    let (url, listener) = bind().await;
    let (client, _line_tx, mut events) = Client::new(options(&url));
    let _handle = tokio::spawn(client.run());
    let mut ws = ready_session(&listener, &mut events).await;

    // Rate limit with no preceding send: nothing to requeue, nothing to
    // flush at expiry.
    send_packet(
        &mut ws,
        "servermsg",
        json!({"message": "please wait 1 seconds"}),
    )
    .await;
    expect_event(&mut events, "server message", |e| {
        matches!(e, RenderEvent::ServerMessage(_))
    })
    .await;

    assert!(
        try_read_frame(&mut ws, Duration::from_millis(2600))
            .await
            .is_none(),
        "flush frame despite empty queue"
    );
}

#[tokio::test]
async fn messages_flow_again_after_expiry() {
    let (url, listener) = bind().await;
    let (client, line_tx, mut events) = Client::new(options(&url));
    let _handle = tokio::spawn(client.run());
    let mut ws = ready_session(&listener, &mut events).await;

    line_tx.send("first".to_string()).await.unwrap();
    read_frame(&mut ws).await;
    send_packet(
        &mut ws,
        "servermsg",
        json!({"message": "please wait 1 seconds"}),
    )
    .await;

    // Wait out the cooldown and its flush.
    let flushed = try_read_frame(&mut ws, Duration::from_secs(3))
        .await
        .expect("no flush after cooldown expiry");
    assert_eq!(flushed["data"]["text"], "first");

    // The queue is idle again: new lines go straight to the wire.
    line_tx.send("after".to_string()).await.unwrap();
    let frame = read_frame(&mut ws).await;
    assert_eq!(frame["data"]["text"], "after");
}
