//! Rust library bridging a control surface to a VR Sync media server
//!
//! This library keeps a Socket.IO session with a VR Sync server alive and
//! exposes the handful of operations a button panel needs. It provides:
//!
//! - A resilient connection with a keep-alive heartbeat
//! - Reconnection when the server closes the session
//! - Play, stop, text message and viewpoint calibration commands
//! - A play-started signal that fires when playback actually begins
//! - Connection status, media list and server info as observable state
//!
//! # Quick Start
//!
//! ```no_run
//! use vrsync_companion::{Config, Event, MediaType, VrSyncClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = VrSyncClient::connect(Config::new("http://172.28.1.9", 7327, "LICENSE"))?;
//!     let mut events = client.subscribe();
//!
//!     while let Ok(event) = events.recv().await {
//!         if let Event::CheckFeedbacks = event {
//!             if client.is_connected() {
//!                 client.play("12", MediaType::CloudVideo, false, 5000)?;
//!                 break;
//!             }
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **Client**: cloneable handle; queues commands to the connection task
//! - **Connection**: single task owning the session, the transport and timers
//! - **Dispatcher**: applies inbound messages to the session
//! - **Protocol**: JSON message types and the envelope codec
//! - **Transport**: Socket.IO over WebSocket behind the `Connector` trait
//! - **Actions / Feedback**: the host-facing button surface

mod actions;
mod client;
mod config;
mod connection;
mod dispatcher;
mod error;
mod feedback;
mod protocol;
mod session;
mod socketio;
mod subscription;
mod timer;
mod transport;

// Public exports
pub use actions::{Action, PlayOptions};
pub use client::VrSyncClient;
pub use config::{Config, ConnectOptions, Endpoint, DEFAULT_HOST, DEFAULT_PORT};
pub use error::{Result, VrSyncError};
pub use feedback::{Feedback, Variable};
pub use protocol::{
    Codec, CommandMessage, Inbound, MediaEntry, MediaType, MediaUpdate, Outbound, PlaylistItem,
    ServerPing, TextMessage, PROTOCOL_VERSION, SENDER,
};
pub use session::{ConnectionStatus, ServerInfo, Session};
pub use socketio::{Handshake, Packet};
pub use subscription::{Event, EventReceiver, ProtocolError, VariableUpdate};
pub use timer::{HEARTBEAT_PERIOD, SERVER_TIMEOUT};
pub use transport::{
    Connector, DisconnectReason, LinkPeer, Outgoing, TransportEvent, TransportLink,
    WebSocketConnector,
};
