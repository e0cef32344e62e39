// Test-specific lint overrides: integration tests use unwrap/expect freely.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::missing_panics_doc,
    clippy::missing_docs_in_private_items
)]

//! End-to-end session tests against a scripted in-process server.
//!
//! Each test binds a real WebSocket server on a loopback port and plays the
//! server side of the protocol by hand: accept, verify the handshake, feed
//! packets, and observe what the client puts on the wire and hands to the
//! renderer.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, accept_async};

use wirechat::client::{Client, ClientOptions, Shutdown};
use wirechat::render::{RenderEvent, StatusNotice};
use wirechat::store::ReplyContext;

type ServerWs = WebSocketStream<TcpStream>;

const SCHEME: &str = "google";
const TOKEN: &str = "tok-123";

fn options(url: &str) -> ClientOptions {
    ClientOptions {
        server_url: url.to_string(),
        command_prefix: "!!".to_string(),
        reconnect: Duration::from_millis(200),
        watchdog: Duration::from_secs(10),
        auth_scheme: SCHEME.to_string(),
        auth_token: TOKEN.to_string(),
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

/// Read the next text frame from the client, parsed as JSON.
async fn read_frame(ws: &mut ServerWs) -> Value {
    loop {
        let message = timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .unwrap();
        if let Message::Text(text) = message {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

async fn send_packet(ws: &mut ServerWs, kind: &str, data: Value) {
    let frame = json!({ "type": kind, "data": data }).to_string();
    ws.send(Message::Text(frame.into())).await.unwrap();
}

/// Expect the fixed hello/status/getuserconf handshake, verifying that
/// credentials ride on every frame.
async fn expect_handshake(ws: &mut ServerWs) {
    let hello = read_frame(ws).await;
    assert_eq!(hello["type"], "hello");
    assert_eq!(hello["data"]["last_message"], -1);
    assert_eq!(hello["auth"], SCHEME);
    assert_eq!(hello["token"], TOKEN);

    let status = read_frame(ws).await;
    assert_eq!(status["type"], "status");
    assert_eq!(status["auth"], SCHEME);

    let conf = read_frame(ws).await;
    assert_eq!(conf["type"], "getuserconf");
    assert!(conf.get("data").is_none());
}

/// Wait for a render event matching the predicate, skipping others.
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

#[tokio::test]
async fn handshake_then_authentication_reaches_ready() {
    let (url, listener) = bind().await;
    let (client, _line_tx, mut events) = Client::new(options(&url));
    let _handle = tokio::spawn(client.run());

    let mut ws = accept(&listener).await;
    expect_handshake(&mut ws).await;

    send_packet(&mut ws, "status", json!({"status": "authenticated"})).await;
    expect_event(&mut events, "authenticated notice", |e| {
        matches!(e, RenderEvent::Status(StatusNotice::Authenticated))
    })
    .await;
}

#[tokio::test]
async fn chat_line_reaches_the_wire_with_credentials() {
    let (url, listener) = bind().await;
    let (client, line_tx, mut events) = Client::new(options(&url));
    let _handle = tokio::spawn(client.run());

    let mut ws = accept(&listener).await;
    expect_handshake(&mut ws).await;
    send_packet(&mut ws, "status", json!({"status": "authenticated"})).await;
    expect_event(&mut events, "authenticated notice", |e| {
        matches!(e, RenderEvent::Status(StatusNotice::Authenticated))
    })
    .await;

    line_tx.send("hello world".to_string()).await.unwrap();

    let frame = read_frame(&mut ws).await;
    assert_eq!(frame["type"], "message");
    assert_eq!(frame["data"]["text"], "hello world");
    assert_eq!(frame["auth"], SCHEME);
    assert_eq!(frame["token"], TOKEN);
}

#[tokio::test]
async fn roster_follows_join_and_part() {
    let (url, listener) = bind().await;
    let (client, line_tx, mut events) = Client::new(options(&url));
    let _handle = tokio::spawn(client.run());

    let mut ws = accept(&listener).await;
    expect_handshake(&mut ws).await;
    send_packet(&mut ws, "status", json!({"status": "authenticated"})).await;

    send_packet(&mut ws, "join", json!({"name": "alice"})).await;
    expect_event(&mut events, "join notice", |e| {
        matches!(e, RenderEvent::Joined(name) if name == "alice")
    })
    .await;

    line_tx.send("!!users".to_string()).await.unwrap();
    let listing = expect_event(&mut events, "user listing", |e| {
        matches!(e, RenderEvent::Users(_))
    })
    .await;
    assert_eq!(listing, RenderEvent::Users(vec!["alice".to_string()]));

    send_packet(&mut ws, "part", json!({"name": "alice"})).await;
    expect_event(&mut events, "part notice", |e| {
        matches!(e, RenderEvent::Parted(name) if name == "alice")
    })
    .await;

    line_tx.send("!!users".to_string()).await.unwrap();
    let listing = expect_event(&mut events, "empty listing", |e| {
        matches!(e, RenderEvent::Users(_))
    })
    .await;
    assert_eq!(listing, RenderEvent::Users(Vec::new()));
}

#[tokio::test]
async fn reply_to_deleted_message_renders_tombstone() {
    let (url, listener) = bind().await;
    let (client, _line_tx, mut events) = Client::new(options(&url));
    let _handle = tokio::spawn(client.run());

    let mut ws = accept(&listener).await;
    expect_handshake(&mut ws).await;
    send_packet(&mut ws, "status", json!({"status": "authenticated"})).await;

    send_packet(
        &mut ws,
        "chat",
        json!({"id": 3, "author": "bob", "message": "hi", "auth": 0}),
    )
    .await;
    send_packet(&mut ws, "delete", json!({"messages": [3]})).await;
    expect_event(&mut events, "delete notice", |e| {
        matches!(e, RenderEvent::MessageDeleted(3))
    })
    .await;

    send_packet(
        &mut ws,
        "chat",
        json!({"id": 9, "author": "alice", "message": "hey", "auth": 0, "reply": 3}),
    )
    .await;
    let chat = expect_event(&mut events, "reply chat line", |e| {
        matches!(e, RenderEvent::Chat { message, .. } if message.id == 9)
    })
    .await;
    let RenderEvent::Chat { reply, .. } = chat else {
        unreachable!()
    };
    assert_eq!(reply, ReplyContext::Deleted(3));
}

#[tokio::test]
async fn banned_status_stops_processing() {
    let (url, listener) = bind().await;
    let (client, _line_tx, mut events) = Client::new(options(&url));
    let handle = tokio::spawn(client.run());

    let mut ws = accept(&listener).await;
    expect_handshake(&mut ws).await;
    send_packet(&mut ws, "status", json!({"status": "authenticated"})).await;

    send_packet(&mut ws, "status", json!({"status": "banned"})).await;
    // This frame arrives after the ban and must not be processed.
    send_packet(&mut ws, "join", json!({"name": "ghost"})).await;

    expect_event(&mut events, "ban notice", |e| {
        matches!(e, RenderEvent::Status(StatusNotice::Banned))
    })
    .await;

    let shutdown = timeout(Duration::from_secs(5), handle)
        .await
        .expect("client did not stop after ban")
        .unwrap();
    assert_eq!(shutdown, Shutdown::Banned);

    // Drain what's left: the ghost join must never surface.
    while let Some(event) = events.recv().await {
        assert!(
            !matches!(event, RenderEvent::Joined(_)),
            "frame processed after ban: {event:?}"
        );
    }
}

#[tokio::test]
async fn forced_rename_flow_retries_until_confirmed() {
    let (url, listener) = bind().await;
    let (client, line_tx, mut events) = Client::new(options(&url));
    let _handle = tokio::spawn(client.run());

    let mut ws = accept(&listener).await;
    expect_handshake(&mut ws).await;

    // First login: the server demands a name before authentication.
    send_packet(&mut ws, "status", json!({"status": "rename"})).await;
    expect_event(&mut events, "rename prompt", |e| {
        matches!(e, RenderEvent::NamePrompt)
    })
    .await;

    line_tx.send("newname".to_string()).await.unwrap();
    let frame = read_frame(&mut ws).await;
    assert_eq!(frame["type"], "setuserconf");
    assert_eq!(frame["data"]["name"], "newname");
    assert_eq!(frame["data"]["color"], "FFFFFF");

    // Rejected: no name was ever confirmed, so the flow re-prompts.
    send_packet(&mut ws, "status", json!({"status": "nameexists"})).await;
    expect_event(&mut events, "second rename prompt", |e| {
        matches!(e, RenderEvent::NamePrompt)
    })
    .await;

    line_tx.send("newname_2".to_string()).await.unwrap();
    let frame = read_frame(&mut ws).await;
    assert_eq!(frame["data"]["name"], "newname_2");

    // Accepted this time.
    send_packet(
        &mut ws,
        "accepted",
        json!({"name": "newname_2", "color": "FFFFFF"}),
    )
    .await;
    send_packet(&mut ws, "status", json!({"status": "setuserconf"})).await;
    expect_event(&mut events, "applied notice", |e| {
        matches!(e, RenderEvent::Status(StatusNotice::Applied))
    })
    .await;
}

#[tokio::test]
async fn unsupported_packet_is_reported_and_session_continues() {
    let (url, listener) = bind().await;
    let (client, _line_tx, mut events) = Client::new(options(&url));
    let _handle = tokio::spawn(client.run());

    let mut ws = accept(&listener).await;
    expect_handshake(&mut ws).await;
    send_packet(&mut ws, "status", json!({"status": "authenticated"})).await;

    send_packet(&mut ws, "blorp", json!({"x": 1})).await;
    expect_event(&mut events, "unsupported notice", |e| {
        matches!(e, RenderEvent::Unsupported { kind, .. } if kind == "blorp")
    })
    .await;

    // The connection is still alive and dispatching.
    send_packet(&mut ws, "join", json!({"name": "alice"})).await;
    expect_event(&mut events, "join after unsupported", |e| {
        matches!(e, RenderEvent::Joined(_))
    })
    .await;
}
