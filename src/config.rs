use crate::error::{Result, VrSyncError};
use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Address of a VR Sync Box on a default installation
pub const DEFAULT_HOST: &str = "http://172.28.1.9";

/// Port of a VR Sync Box on a default installation
pub const DEFAULT_PORT: u16 = 7327;

/// Upper bound on a single connection attempt.
const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Module configuration as stored by the host
///
/// Keys are camelCase to match the host's config fields. `port` is stored by
/// the host as text, so both numbers and numeric strings are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Server URL or IP, with or without an `http(s)://` scheme
    pub host: String,

    /// Server port
    #[serde(deserialize_with = "deserialize_port")]
    pub port: u16,

    /// License key, passed through untouched on every outbound message
    pub license_key: String,

    /// Log every inbound message
    pub log_incoming_messages: bool,

    /// Log every outbound message. These logs contain the license key.
    pub log_outgoing_messages: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            license_key: String::new(),
            log_incoming_messages: false,
            log_outgoing_messages: false,
        }
    }
}

impl Config {
    /// Create a configuration for the given server and license
    pub fn new(host: impl Into<String>, port: u16, license_key: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            license_key: license_key.into(),
            ..Self::default()
        }
    }

    /// Parse a configuration from the host's JSON representation
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Resolve the WebSocket endpoint for this configuration
    pub fn endpoint(&self) -> Result<Endpoint> {
        let host = self.host.trim();

        let (scheme, rest) = match host.split_once("://") {
            Some(("http" | "ws", rest)) => ("ws", rest),
            Some(("https" | "wss", rest)) => ("wss", rest),
            Some((other, _)) => {
                return Err(VrSyncError::InvalidConfig(format!("unsupported scheme: {other}")))
            }
            None => ("ws", host),
        };
        let rest = rest.trim_end_matches('/');

        if rest.is_empty() {
            return Err(VrSyncError::InvalidConfig("host is empty".to_string()));
        }
        if self.port == 0 {
            return Err(VrSyncError::InvalidConfig("port must be 1-65535".to_string()));
        }

        Ok(Endpoint {
            url: format!(
                "{}://{}:{}/socket.io/?EIO=4&transport=websocket",
                scheme, rest, self.port
            ),
        })
    }
}

/// Resolved server endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: String,
}

impl Endpoint {
    /// Use a fully-formed WebSocket URL as is
    pub fn from_url(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// The WebSocket URL to connect to
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Options applied to every transport session
///
/// Sessions are never pooled and only the WebSocket transport exists, so the
/// only tunable is how long a single handshake may take. Reconnection is
/// decided by the connection manager, never by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectOptions {
    pub handshake_timeout: Duration,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }
}

fn deserialize_port<'de, D>(deserializer: D) -> std::result::Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    match Port::deserialize(deserializer)? {
        Port::Number(port) => Ok(port),
        Port::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid port: {text}"))),
    }
}
