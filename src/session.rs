use crate::protocol::{MediaEntry, ServerPing};

/// Lifecycle of the transport session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// Reopening after the server closed the session
    Reconnecting,
}

/// License and version information from the latest server ping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerInfo {
    pub is_trial: Option<bool>,
    pub user_limit: Option<i64>,
    pub server_version: Option<String>,
    pub minimum_version: Option<String>,
    pub preferred_version: Option<String>,
}

/// Live connectivity and derived state of the current connection
///
/// Owned by the connection manager; everyone else reads snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// Set by a connect ack or a server ping, cleared on disconnect
    pub connected: bool,
    pub status: ConnectionStatus,
    pub server: ServerInfo,
    /// Media list from the latest `MediaUpdate`
    pub media: Vec<MediaEntry>,
}

impl Session {
    /// Clear everything learned from the server, keeping the status
    pub(crate) fn reset(&mut self) {
        *self = Self {
            status: self.status,
            ..Self::default()
        };
    }

    /// Returns whether the connected flag changed
    pub(crate) fn set_connected(&mut self, connected: bool) -> bool {
        let changed = self.connected != connected;
        self.connected = connected;
        changed
    }

    /// Record a server ping; returns whether the connected flag changed
    pub(crate) fn apply_server_ping(&mut self, ping: ServerPing) -> bool {
        self.server = ServerInfo {
            is_trial: ping.is_trial,
            user_limit: ping.user_limit,
            server_version: ping.server_version,
            minimum_version: ping.minimum_version,
            preferred_version: ping.preferred_version,
        };
        self.set_connected(true)
    }

    /// Replace the media list and return its display labels, in order
    pub(crate) fn replace_media(&mut self, media: Vec<MediaEntry>) -> Vec<String> {
        self.media = media;
        self.media_labels()
    }

    /// Display labels of the current media list
    pub fn media_labels(&self) -> Vec<String> {
        self.media.iter().map(MediaEntry::display).collect()
    }
}
