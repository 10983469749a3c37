use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::{accept_async, tungstenite::Message, WebSocketStream};
use vrsync_companion::{Config, ConnectionStatus, Session, VrSyncClient};

const STEP: Duration = Duration::from_secs(5);

type Server = WebSocketStream<TcpStream>;

async fn listen() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

async fn accept(listener: &TcpListener) -> Server {
    let (stream, _) = timeout(STEP, listener.accept()).await.unwrap().unwrap();
    accept_async(stream).await.unwrap()
}

async fn send(ws: &mut Server, frame: &str) {
    ws.send(Message::Text(frame.to_string())).await.unwrap();
}

async fn next_text(ws: &mut Server) -> String {
    loop {
        match timeout(STEP, ws.next()).await.unwrap() {
            Some(Ok(Message::Text(text))) => return text,
            Some(Ok(_)) => continue,
            other => panic!("expected text frame, got {other:?}"),
        }
    }
}

/// Next `message` event payload from the client
async fn next_message(ws: &mut Server) -> Value {
    loop {
        let text = next_text(ws).await;
        if let Some(body) = text.strip_prefix("42") {
            let mut items: Vec<Value> = serde_json::from_str(body).unwrap();
            assert_eq!(items[0], "message");
            return items.remove(1);
        }
    }
}

/// Run the Engine.IO open and Socket.IO connect exchange
async fn handshake(ws: &mut Server, sid: &str) {
    handshake_with_ping(ws, sid, 25000, 20000).await;
}

async fn handshake_with_ping(ws: &mut Server, sid: &str, interval_ms: u64, timeout_ms: u64) {
    send(
        ws,
        &format!(
            r#"0{{"sid":"{sid}","upgrades":[],"pingInterval":{interval_ms},"pingTimeout":{timeout_ms},"maxPayload":1000000}}"#
        ),
    )
    .await;
    assert_eq!(next_text(ws).await, "40");
    send(ws, &format!(r#"40{{"sid":"socket-{sid}"}}"#)).await;
}

async fn wait_for(client: &VrSyncClient, predicate: impl FnMut(&Session) -> bool) {
    let mut watch = client.watch_session();
    timeout(STEP, watch.wait_for(predicate))
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_session_over_websocket() {
    let (listener, port) = listen().await;
    let client = VrSyncClient::connect(Config::new("127.0.0.1", port, "LIC-9")).unwrap();

    let mut ws = accept(&listener).await;
    handshake(&mut ws, "a").await;

    let ping = next_message(&mut ws).await;
    assert_eq!(ping["type"], "Ping");
    assert_eq!(ping["sender"], "Admin");
    assert_eq!(ping["licenseCode"], "LIC-9");
    assert_eq!(ping["protocolVersion"], 2);
    wait_for(&client, |s| s.connected).await;

    // Engine.IO heartbeat is answered by the transport.
    send(&mut ws, "2").await;
    assert_eq!(next_text(&mut ws).await, "3");

    send(
        &mut ws,
        &format!(
            "42{}",
            json!(["message", {"type": "Ping", "sender": "Server", "isTrial": true, "userLimit": 3}])
        ),
    )
    .await;
    wait_for(&client, |s| s.server.is_trial == Some(true)).await;
    assert_eq!(client.session().server.user_limit, Some(3));

    client.calibrate().unwrap();
    loop {
        let message = next_message(&mut ws).await;
        if message["type"] == "Calibrate" {
            break;
        }
    }
}

#[tokio::test]
async fn test_server_disconnect_reconnects() {
    let (listener, port) = listen().await;
    let client = VrSyncClient::connect(Config::new("127.0.0.1", port, "LIC")).unwrap();

    let mut ws = accept(&listener).await;
    handshake(&mut ws, "a").await;
    next_message(&mut ws).await;
    wait_for(&client, |s| s.connected).await;

    send(&mut ws, "41").await;

    let mut second = accept(&listener).await;
    handshake(&mut second, "b").await;
    let ping = next_message(&mut second).await;
    assert_eq!(ping["type"], "Ping");
    wait_for(&client, |s| s.connected && s.status == ConnectionStatus::Connected).await;
}

#[tokio::test]
async fn test_transport_close_does_not_reconnect() {
    let (listener, port) = listen().await;
    let client = VrSyncClient::connect(Config::new("127.0.0.1", port, "LIC")).unwrap();

    let mut ws = accept(&listener).await;
    handshake(&mut ws, "a").await;
    next_message(&mut ws).await;
    wait_for(&client, |s| s.connected).await;

    ws.close(None).await.unwrap();
    wait_for(&client, |s| !s.connected).await;
    assert_eq!(client.session().status, ConnectionStatus::Disconnected);

    let reconnect = timeout(Duration::from_secs(1), listener.accept()).await;
    assert!(reconnect.is_err());
}

#[tokio::test]
async fn test_messages_before_connect_ack_are_flushed_in_order() {
    let (listener, port) = listen().await;
    let client = VrSyncClient::connect(Config::new("127.0.0.1", port, "LIC")).unwrap();

    let mut ws = accept(&listener).await;
    send(
        &mut ws,
        r#"0{"sid":"a","upgrades":[],"pingInterval":25000,"pingTimeout":20000}"#,
    )
    .await;
    assert_eq!(next_text(&mut ws).await, "40");

    client.send_text("early").unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    send(&mut ws, r#"40{"sid":"socket-a"}"#).await;

    let first = next_message(&mut ws).await;
    assert_eq!(first["type"], "Text");
    assert_eq!(first["text"], "early");
    let second = next_message(&mut ws).await;
    assert_eq!(second["type"], "Ping");
}

#[tokio::test]
async fn test_connect_error_leaves_client_disconnected() {
    let (listener, port) = listen().await;
    let client = VrSyncClient::connect(Config::new("127.0.0.1", port, "LIC")).unwrap();

    let mut ws = accept(&listener).await;
    wait_for(&client, |s| s.status == ConnectionStatus::Connecting).await;
    send(
        &mut ws,
        r#"0{"sid":"a","upgrades":[],"pingInterval":25000,"pingTimeout":20000}"#,
    )
    .await;
    assert_eq!(next_text(&mut ws).await, "40");
    send(&mut ws, r#"44{"message":"Not authorized"}"#).await;

    wait_for(&client, |s| s.status == ConnectionStatus::Disconnected).await;
    assert!(!client.is_connected());
    let reconnect = timeout(Duration::from_secs(1), listener.accept()).await;
    assert!(reconnect.is_err());
}

#[tokio::test]
async fn test_silent_server_is_detected_without_reconnect() {
    let (listener, port) = listen().await;
    let client = VrSyncClient::connect(Config::new("127.0.0.1", port, "LIC")).unwrap();

    let mut ws = accept(&listener).await;
    handshake_with_ping(&mut ws, "a", 200, 200).await;
    next_message(&mut ws).await;
    wait_for(&client, |s| s.connected).await;

    // The socket stays open but the server sends nothing more.
    wait_for(&client, |s| !s.connected).await;
    assert_eq!(client.session().status, ConnectionStatus::Disconnected);

    let reconnect = timeout(Duration::from_secs(1), listener.accept()).await;
    assert!(reconnect.is_err());
    drop(ws);
}

#[tokio::test]
async fn test_server_ping_with_loose_fields_updates_session() {
    let (listener, port) = listen().await;
    let client = VrSyncClient::connect(Config::new("127.0.0.1", port, "LIC")).unwrap();

    let mut ws = accept(&listener).await;
    handshake(&mut ws, "a").await;
    next_message(&mut ws).await;

    send(
        &mut ws,
        &format!(
            "42{}",
            json!(["message", {
                "type": "Ping",
                "sender": "Server",
                "isTrial": true,
                "userLimit": -1,
                "serverVersion": "3.0.0"
            }])
        ),
    )
    .await;

    wait_for(&client, |s| s.server.server_version.as_deref() == Some("3.0.0")).await;
    let session = client.session();
    assert!(session.connected);
    assert_eq!(session.server.user_limit, Some(-1));
    assert_eq!(session.server.is_trial, Some(true));
}
