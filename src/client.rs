use crate::config::{Config, ConnectOptions};
use crate::connection::{Command, ConnectionManager, PlayRequest};
use crate::error::{Result, VrSyncError};
use crate::protocol::MediaType;
use crate::session::Session;
use crate::subscription::{Event, EventReceiver};
use crate::transport::{Connector, WebSocketConnector};
use tokio::sync::{broadcast, mpsc, watch};

const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Client for a VR Sync server
///
/// A cheap, cloneable handle to a background task that owns the connection.
/// Every operation is queued to that task and returns immediately; results
/// show up as [`Event`]s and in the [`Session`] snapshot. The task stops when
/// the last handle is dropped.
#[derive(Clone)]
pub struct VrSyncClient {
    commands: mpsc::UnboundedSender<Command>,
    events: broadcast::Sender<Event>,
    session: watch::Receiver<Session>,
}

impl VrSyncClient {
    /// Start a client and begin connecting to the configured server
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use vrsync_companion::{Config, MediaType, VrSyncClient};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let client = VrSyncClient::connect(Config::new("http://172.28.1.9", 7327, "LICENSE"))?;
    ///     client.play("12", MediaType::CloudVideo, false, 5000)?;
    ///     Ok(())
    /// }
    /// ```
    pub fn connect(config: Config) -> Result<Self> {
        let client = Self::with_connector(config, ConnectOptions::default(), WebSocketConnector);
        client.open()?;
        Ok(client)
    }

    /// Start an idle client using the given transport
    ///
    /// Nothing is opened until [`open`](Self::open) is called.
    pub fn with_connector(
        config: Config,
        options: ConnectOptions,
        connector: impl Connector,
    ) -> Self {
        let (commands, commands_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (snapshot, session) = watch::channel(Session::default());

        let manager = ConnectionManager::new(
            config,
            options,
            Box::new(connector),
            commands_rx,
            events.clone(),
            snapshot,
        );
        tokio::spawn(manager.run());

        Self {
            commands,
            events,
            session,
        }
    }

    /// Open a fresh session, closing the current one first
    pub fn open(&self) -> Result<()> {
        self.command(Command::Open)
    }

    /// Close the session; it stays closed until [`open`](Self::open)
    pub fn close(&self) -> Result<()> {
        self.command(Command::Close)
    }

    /// Replace the configuration and reconnect with it
    pub fn reconfigure(&self, config: Config) -> Result<()> {
        self.command(Command::Reconfigure(config))
    }

    /// Play a single media item on every device
    ///
    /// `playStartedTrigger` is published once the delay has passed, or right
    /// away when `play_delay_ms` is zero. A later play or stop cancels it.
    pub fn play(
        &self,
        media_id: impl Into<String>,
        media_type: MediaType,
        looping: bool,
        play_delay_ms: u64,
    ) -> Result<()> {
        self.command(Command::Play(PlayRequest {
            media_id: media_id.into(),
            media_type,
            looping,
            play_delay_ms,
        }))
    }

    /// Stop playback on every device
    pub fn stop(&self) -> Result<()> {
        self.command(Command::Stop)
    }

    /// Show a text message on every device
    pub fn send_text(&self, text: impl Into<String>) -> Result<()> {
        self.command(Command::SendText(text.into()))
    }

    /// Recenter the viewpoint on every device
    pub fn calibrate(&self) -> Result<()> {
        self.command(Command::Calibrate)
    }

    /// Subscribe to events
    ///
    /// Only events published after subscribing are received.
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver::new(self.events.subscribe())
    }

    /// Snapshot of the current session
    pub fn session(&self) -> Session {
        self.session.borrow().clone()
    }

    /// Receiver notified on every session change
    pub fn watch_session(&self) -> watch::Receiver<Session> {
        self.session.clone()
    }

    /// Connected flag of the latest session snapshot
    pub fn is_connected(&self) -> bool {
        self.session.borrow().connected
    }

    fn command(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| VrSyncError::ConnectionClosed)
    }
}
