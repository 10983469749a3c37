use crate::config::{ConnectOptions, Endpoint};
use crate::error::{Result, VrSyncError};
use crate::socketio::{Packet, MESSAGE_EVENT};
use futures_util::{Sink, SinkExt, StreamExt};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, timeout_at, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Why a transport session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The server closed the Socket.IO session
    ServerDisconnect,
    /// This client closed the session
    ClientDisconnect,
    /// The underlying connection closed without a Socket.IO disconnect
    TransportClose,
    /// The connection failed or timed out
    TransportError(String),
    /// The server rejected the Socket.IO connect
    ConnectError(String),
    /// Nothing arrived within the server's ping interval plus ping timeout
    PingTimeout,
}

impl DisconnectReason {
    /// Only a server-initiated close is followed by an automatic reopen
    pub fn is_server_initiated(&self) -> bool {
        matches!(self, DisconnectReason::ServerDisconnect)
    }
}

/// Events reported by a transport session, in arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The server acknowledged the Socket.IO connect
    Connected,
    /// A `message` event payload
    Message(Value),
    /// The session ended; no further events follow
    Disconnected(DisconnectReason),
}

/// Requests from the connection manager to a transport session
#[derive(Debug, Clone, PartialEq)]
pub enum Outgoing {
    /// Emit a `message` event
    Emit(Value),
    /// Disconnect and close the connection
    Close,
}

/// Manager-side handle to one transport session
pub struct TransportLink {
    outbound: mpsc::UnboundedSender<Outgoing>,
    events: mpsc::UnboundedReceiver<TransportEvent>,
}

/// Transport-side ends of a [`TransportLink`]
pub struct LinkPeer {
    pub outbound: mpsc::UnboundedReceiver<Outgoing>,
    pub events: mpsc::UnboundedSender<TransportEvent>,
}

impl TransportLink {
    /// Create a link and the ends a transport implementation drives
    pub fn channel() -> (TransportLink, LinkPeer) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        (
            TransportLink {
                outbound: outbound_tx,
                events: events_rx,
            },
            LinkPeer {
                outbound: outbound_rx,
                events: events_tx,
            },
        )
    }

    /// Queue a payload for transmission, preserving call order
    pub fn emit(&self, payload: Value) -> Result<()> {
        self.outbound
            .send(Outgoing::Emit(payload))
            .map_err(|_| VrSyncError::ConnectionClosed)
    }

    /// Ask the transport to disconnect; no events are delivered afterwards
    pub fn close(self) {
        let _ = self.outbound.send(Outgoing::Close);
    }

    /// Next event, treating a vanished transport as a closed connection
    pub async fn next_event(&mut self) -> TransportEvent {
        self.events
            .recv()
            .await
            .unwrap_or(TransportEvent::Disconnected(DisconnectReason::TransportClose))
    }
}

/// Opens transport sessions
///
/// `open` must not block: it returns the link immediately and completes the
/// handshake in the background, reporting the outcome as events. Every call
/// creates a fresh session.
pub trait Connector: Send + Sync + 'static {
    fn open(&self, endpoint: &Endpoint, options: &ConnectOptions) -> TransportLink;
}

/// Socket.IO client over a single WebSocket
///
/// Must be used from within a Tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl Connector for WebSocketConnector {
    fn open(&self, endpoint: &Endpoint, options: &ConnectOptions) -> TransportLink {
        let (link, peer) = TransportLink::channel();
        let url = endpoint.url().to_string();
        let options = *options;

        tokio::spawn(async move {
            let events = peer.events.clone();
            let reason = match run_session(&url, options, peer).await {
                Ok(reason) => reason,
                Err(e) => {
                    tracing::error!("Transport error on {}: {}", url, e);
                    DisconnectReason::TransportError(e.to_string())
                }
            };
            tracing::debug!("Transport session ended: {:?}", reason);
            let _ = events.send(TransportEvent::Disconnected(reason));
        });

        link
    }
}

async fn run_session(
    url: &str,
    options: ConnectOptions,
    peer: LinkPeer,
) -> Result<DisconnectReason> {
    let LinkPeer {
        mut outbound,
        events,
    } = peer;

    tracing::info!("Connecting to {}", url);
    let deadline = Instant::now() + options.handshake_timeout;

    let (ws_stream, _) = timeout_at(deadline, connect_async(url))
        .await
        .map_err(|_| VrSyncError::Timeout)??;
    let (mut write, mut read) = ws_stream.split();

    // Emits issued before the connect ack are held back, in order.
    let mut connected = false;
    let mut pending: Vec<Value> = Vec::new();

    let handshake = sleep_until(deadline);
    tokio::pin!(handshake);

    // Armed by the open packet, pushed back by every inbound frame.
    let mut liveness_window: Option<Duration> = None;
    let liveness = sleep_until(deadline);
    tokio::pin!(liveness);

    loop {
        tokio::select! {
            () = &mut handshake, if !connected => {
                return Err(VrSyncError::Timeout);
            }
            () = &mut liveness, if liveness_window.is_some() => {
                tracing::warn!("Server went silent, closing {}", url);
                let _ = write.close().await;
                return Ok(DisconnectReason::PingTimeout);
            }
            frame = read.next() => {
                if let Some(window) = liveness_window {
                    liveness.as_mut().reset(Instant::now() + window);
                }

                let text = match frame {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => return Ok(DisconnectReason::TransportClose),
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => return Err(e.into()),
                };
                tracing::trace!("Received frame: {}", text);

                let packet = match Packet::parse(&text) {
                    Ok(packet) => packet,
                    Err(e) => {
                        tracing::warn!("Ignoring malformed frame: {}", e);
                        continue;
                    }
                };

                match packet {
                    Packet::Open(open) => {
                        tracing::debug!("Engine.IO session {} opened", open.sid);
                        let window = open.liveness_window();
                        liveness.as_mut().reset(Instant::now() + window);
                        liveness_window = Some(window);
                        send_packet(&mut write, &Packet::Connect(None)).await?;
                    }
                    Packet::Ping => send_packet(&mut write, &Packet::Pong).await?,
                    Packet::Connect(_) => {
                        connected = true;
                        if events.send(TransportEvent::Connected).is_err() {
                            return Ok(DisconnectReason::ClientDisconnect);
                        }
                        for payload in pending.drain(..) {
                            send_packet(&mut write, &Packet::message(payload)).await?;
                        }
                    }
                    Packet::Event { name, mut data } if name == MESSAGE_EVENT => {
                        if data.is_empty() {
                            continue;
                        }
                        let payload = data.swap_remove(0);
                        if events.send(TransportEvent::Message(payload)).is_err() {
                            return Ok(DisconnectReason::ClientDisconnect);
                        }
                    }
                    Packet::Event { name, .. } => {
                        tracing::debug!("Ignoring event {}", name);
                    }
                    Packet::Disconnect => return Ok(DisconnectReason::ServerDisconnect),
                    Packet::Close => return Ok(DisconnectReason::TransportClose),
                    Packet::ConnectError(body) => {
                        return Ok(DisconnectReason::ConnectError(body.to_string()));
                    }
                    Packet::Pong | Packet::Other(_) => {}
                }
            }
            request = outbound.recv() => match request {
                Some(Outgoing::Emit(payload)) => {
                    if connected {
                        send_packet(&mut write, &Packet::message(payload)).await?;
                    } else {
                        pending.push(payload);
                    }
                }
                Some(Outgoing::Close) | None => {
                    if connected {
                        let _ = send_packet(&mut write, &Packet::Disconnect).await;
                    }
                    let _ = write.close().await;
                    return Ok(DisconnectReason::ClientDisconnect);
                }
            }
        }
    }
}

async fn send_packet<S>(write: &mut S, packet: &Packet) -> Result<()>
where
    S: Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
{
    let text = packet.encode()?;
    tracing::trace!("Sending frame: {}", text);
    write.send(Message::Text(text)).await?;
    Ok(())
}
