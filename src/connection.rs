use crate::config::{Config, ConnectOptions};
use crate::dispatcher::dispatch;
use crate::protocol::{Codec, CommandMessage, MediaType, Outbound, PlaylistItem, TextMessage};
use crate::session::{ConnectionStatus, Session};
use crate::subscription::{Event, VariableUpdate};
use crate::timer::{Heartbeat, OneShot};
use crate::transport::{Connector, DisconnectReason, TransportEvent, TransportLink};
use std::future::pending;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use uuid::Uuid;

/// Requests from client handles to the connection manager
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Command {
    Open,
    Close,
    Reconfigure(Config),
    Play(PlayRequest),
    Stop,
    SendText(String),
    Calibrate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PlayRequest {
    pub media_id: String,
    pub media_type: MediaType,
    pub looping: bool,
    pub play_delay_ms: u64,
}

/// Owns the transport session, the session state and both timers
///
/// Runs as a single task; commands, transport events and timer expiries are
/// handled one at a time, in the order they become ready.
pub(crate) struct ConnectionManager {
    config: Config,
    codec: Codec,
    options: ConnectOptions,
    connector: Box<dyn Connector>,
    link: Option<TransportLink>,
    session: Session,
    heartbeat: Heartbeat,
    play_started: OneShot,
    commands: mpsc::UnboundedReceiver<Command>,
    events: broadcast::Sender<Event>,
    snapshot: watch::Sender<Session>,
}

impl ConnectionManager {
    pub(crate) fn new(
        config: Config,
        options: ConnectOptions,
        connector: Box<dyn Connector>,
        commands: mpsc::UnboundedReceiver<Command>,
        events: broadcast::Sender<Event>,
        snapshot: watch::Sender<Session>,
    ) -> Self {
        Self {
            codec: Codec::new(&config),
            config,
            options,
            connector,
            link: None,
            session: Session::default(),
            heartbeat: Heartbeat::default(),
            play_started: OneShot::default(),
            commands,
            events,
            snapshot,
        }
    }

    /// Run until every client handle is dropped
    pub(crate) async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => {
                        self.close_transport();
                        self.publish_snapshot();
                        break;
                    }
                },
                event = next_transport_event(&mut self.link) => self.handle_transport_event(event),
                () = self.heartbeat.tick() => self.send(Outbound::Ping),
                () = self.play_started.expired() => self.publish_play_started(),
            }

            self.publish_snapshot();
        }

        tracing::debug!("Connection manager stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Open => self.open(),
            Command::Close => self.close_transport(),
            Command::Reconfigure(config) => {
                self.close_transport();
                self.codec = Codec::new(&config);
                self.config = config;
                self.open();
            }
            Command::Play(request) => self.play(request),
            Command::Stop => {
                tracing::info!("Stopping media");
                self.send(Outbound::Command(CommandMessage::stop()));
                self.play_started.cancel();
            }
            Command::SendText(text) => {
                tracing::info!("Sending text message: {}", text);
                self.send(Outbound::Text(TextMessage::new(text)));
            }
            Command::Calibrate => {
                tracing::info!("Calibrating viewpoint");
                self.send(Outbound::Calibrate);
            }
        }
    }

    fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connected => self.on_connect(),
            TransportEvent::Message(payload) => match self.codec.decode(payload) {
                Ok(inbound) => {
                    for event in dispatch(&mut self.session, inbound) {
                        self.publish(event);
                    }
                }
                Err(e) => tracing::warn!("Ignoring malformed message: {}", e),
            },
            TransportEvent::Disconnected(reason) => self.on_disconnect(reason),
        }
    }

    /// Open a fresh transport session, closing any current one first
    fn open(&mut self) {
        self.close_transport();
        self.open_transport(ConnectionStatus::Connecting);
    }

    fn open_transport(&mut self, status: ConnectionStatus) {
        let endpoint = match self.config.endpoint() {
            Ok(endpoint) => endpoint,
            Err(e) => {
                tracing::error!("Cannot connect: {}", e);
                self.set_status(ConnectionStatus::Disconnected);
                return;
            }
        };

        tracing::info!("Connecting to {}", endpoint.url());
        self.session.reset();
        self.link = Some(self.connector.open(&endpoint, &self.options));
        self.set_status(status);
    }

    fn close_transport(&mut self) {
        if let Some(link) = self.link.take() {
            link.close();
            self.on_disconnect(DisconnectReason::ClientDisconnect);
        }
    }

    fn on_connect(&mut self) {
        tracing::info!("Connected to VR Sync");
        self.session.set_connected(true);
        self.set_status(ConnectionStatus::Connected);
        self.publish(Event::CheckFeedbacks);

        self.send(Outbound::Ping);
        self.heartbeat.start();
    }

    fn on_disconnect(&mut self, reason: DisconnectReason) {
        tracing::info!("Disconnected from VR Sync: {:?}", reason);
        self.link = None;
        self.session.set_connected(false);
        self.heartbeat.stop();
        self.play_started.cancel();
        self.set_status(ConnectionStatus::Disconnected);
        self.publish(Event::CheckFeedbacks);

        if reason.is_server_initiated() {
            self.open_transport(ConnectionStatus::Reconnecting);
        }
    }

    fn play(&mut self, request: PlayRequest) {
        tracing::info!(
            "Playing media id: {} {} loop={} delay={}ms",
            request.media_id,
            request.media_type,
            request.looping,
            request.play_delay_ms
        );

        let item = PlaylistItem {
            media_type: request.media_type,
            identifier: request.media_id,
            play_delay_ms: request.play_delay_ms,
        };
        self.send(Outbound::Command(CommandMessage::new(vec![item], request.looping)));

        self.play_started.cancel();
        if request.play_delay_ms > 0 {
            self.play_started
                .arm(Duration::from_millis(request.play_delay_ms));
        } else {
            self.publish_play_started();
        }
    }

    fn publish_play_started(&self) {
        let token = Uuid::new_v4();
        tracing::debug!("Play started: {}", token);
        self.publish(Event::Variable(VariableUpdate::PlayStartedTrigger(token)));
    }

    fn send(&self, message: Outbound) {
        let Some(link) = &self.link else {
            tracing::warn!("Not connected, dropping {:?}", message);
            return;
        };

        let result = self
            .codec
            .encode(&message)
            .and_then(|payload| link.emit(payload));
        if let Err(e) = result {
            tracing::error!("Failed to send message: {}", e);
        }
    }

    fn set_status(&mut self, status: ConnectionStatus) {
        if self.session.status != status {
            self.session.status = status;
            self.publish(Event::StatusChanged(status));
        }
    }

    fn publish(&self, event: Event) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn publish_snapshot(&self) {
        self.snapshot.send_if_modified(|current| {
            if *current == self.session {
                false
            } else {
                *current = self.session.clone();
                true
            }
        });
    }
}

async fn next_transport_event(link: &mut Option<TransportLink>) -> TransportEvent {
    match link {
        Some(link) => link.next_event().await,
        None => pending().await,
    }
}
