use crate::error::{Result, VrSyncError};
use crate::feedback::Variable;
use crate::session::ConnectionStatus;
use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Notification published to the host
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The connection status indicator changed
    StatusChanged(ConnectionStatus),

    /// Connectivity changed; feedbacks should be re-evaluated
    CheckFeedbacks,

    /// A variable has a new value
    Variable(VariableUpdate),

    /// The server reported an error. Nothing else reacts to it.
    ProtocolError(ProtocolError),
}

/// New value for a published variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableUpdate {
    /// Display labels of the server's media list
    Media(Vec<String>),

    /// Fresh token, published when a play actually starts
    PlayStartedTrigger(Uuid),
}

impl VariableUpdate {
    /// The variable this update is for
    pub fn variable(&self) -> Variable {
        match self {
            VariableUpdate::Media(_) => Variable::Media,
            VariableUpdate::PlayStartedTrigger(_) => Variable::PlayStartedTrigger,
        }
    }
}

/// Server-reported error
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolError {
    /// An `Error` message, as received
    Server(Value),

    /// The legacy `"not authenticated"` string
    NotAuthenticated,
}

/// Receiver for events
pub struct EventReceiver {
    rx: broadcast::Receiver<Event>,
}

impl EventReceiver {
    pub(crate) fn new(rx: broadcast::Receiver<Event>) -> Self {
        Self { rx }
    }

    /// Receive the next event
    ///
    /// Fails with `ConnectionClosed` once the client has shut down.
    pub async fn recv(&mut self) -> Result<Event> {
        self.rx.recv().await.map_err(|e| match e {
            broadcast::error::RecvError::Closed => VrSyncError::ConnectionClosed,
            broadcast::error::RecvError::Lagged(n) => {
                VrSyncError::ChannelError(format!("Lagged by {} events", n))
            }
        })
    }

    /// Try to receive an event without waiting
    ///
    /// Returns `None` if no event is available.
    pub fn try_recv(&mut self) -> Result<Option<Event>> {
        match self.rx.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(broadcast::error::TryRecvError::Empty) => Ok(None),
            Err(broadcast::error::TryRecvError::Closed) => Err(VrSyncError::ConnectionClosed),
            Err(broadcast::error::TryRecvError::Lagged(n)) => {
                Err(VrSyncError::ChannelError(format!("Lagged by {} events", n)))
            }
        }
    }
}
