//! VR Sync JSON message protocol
//!
//! Outbound messages are typed, then stamped with the session envelope by
//! [`Codec::encode`]. Inbound payloads are classified by their `type` tag;
//! anything unrecognised decodes to [`Inbound::Unknown`] instead of failing.

use crate::config::Config;
use crate::error::{Result, VrSyncError};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};

/// Sender identity stamped on every outbound message
pub const SENDER: &str = "Admin";

/// Sender identity of server-originated pings
pub const SERVER_SENDER: &str = "Server";

/// Protocol version stamped on every outbound message
pub const PROTOCOL_VERSION: u32 = 2;

/// How long a text message stays on the headsets
pub const TEXT_DISPLAY_MS: u64 = 5000;

/// Device selector addressing every connected headset
pub const ALL_DEVICES: &str = "all";

/// Legacy error payload sent as a bare string
pub const NOT_AUTHENTICATED: &str = "not authenticated";

/// Kind of media that can be played
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    LocalVideo,
    LocalImage,
    CloudVideo,
    CloudImage,
}

impl MediaType {
    /// All media types, in the order of their host dropdown ids
    pub const ALL: [MediaType; 4] = [
        MediaType::LocalVideo,
        MediaType::LocalImage,
        MediaType::CloudVideo,
        MediaType::CloudImage,
    ];

    /// Resolve a host dropdown index to a media type
    pub fn from_index(index: usize) -> Result<Self> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or(VrSyncError::InvalidMediaType(index))
    }

    /// Label the server expects in playlist entries
    pub fn label(self) -> &'static str {
        match self {
            MediaType::LocalVideo => "LocalVideo",
            MediaType::LocalImage => "LocalImage",
            MediaType::CloudVideo => "CloudVideo",
            MediaType::CloudImage => "CloudImage",
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Single playlist entry of a `Command`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItem {
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub identifier: String,
    pub play_delay_ms: u64,
}

/// Playback command; an empty playlist stops playback
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandMessage {
    pub current_time: u64,
    pub playlist: Vec<PlaylistItem>,
    #[serde(rename = "loop")]
    pub looping: bool,
    #[serde(rename = "deviceUIDs")]
    pub device_uids: Vec<String>,
}

impl CommandMessage {
    /// Command targeting all devices
    pub fn new(playlist: Vec<PlaylistItem>, looping: bool) -> Self {
        Self {
            current_time: 0,
            playlist,
            looping,
            device_uids: vec![ALL_DEVICES.to_string()],
        }
    }

    /// Command with an empty playlist
    pub fn stop() -> Self {
        Self::new(Vec::new(), false)
    }
}

/// Text overlay shown on every headset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextMessage {
    pub text: String,
    pub length_in_ms: u64,
    pub current_time: u64,
    #[serde(rename = "deviceUIDs")]
    pub device_uids: Vec<String>,
}

impl TextMessage {
    /// Text for every headset, shown for [`TEXT_DISPLAY_MS`]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            length_in_ms: TEXT_DISPLAY_MS,
            current_time: 0,
            device_uids: vec![ALL_DEVICES.to_string()],
        }
    }
}

/// Messages sent to the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum Outbound {
    Ping,
    Command(CommandMessage),
    Text(TextMessage),
    Calibrate,
}

/// Server heartbeat, carrying license and version information
///
/// Every field is optional and loosely typed, so a ping always decodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerPing {
    #[serde(deserialize_with = "lenient_string")]
    pub sender: Option<String>,
    #[serde(deserialize_with = "lenient_bool")]
    pub is_trial: Option<bool>,
    /// Negative values are passed through as sent
    #[serde(deserialize_with = "lenient_integer")]
    pub user_limit: Option<i64>,
    #[serde(deserialize_with = "lenient_string")]
    pub server_version: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub minimum_version: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub preferred_version: Option<String>,
}

impl ServerPing {
    /// Whether this ping was sent by the server itself
    pub fn is_from_server(&self) -> bool {
        self.sender.as_deref() == Some(SERVER_SENDER)
    }
}

/// Media available on the server
///
/// Missing fields decode as empty text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MediaEntry {
    #[serde(rename = "type", deserialize_with = "lenient_text")]
    pub media_type: String,
    #[serde(deserialize_with = "lenient_text")]
    pub identifier: String,
    #[serde(deserialize_with = "lenient_text")]
    pub media_name: String,
}

impl MediaEntry {
    /// Human-readable label, `"<type> <identifier>: <mediaName>"`
    pub fn display(&self) -> String {
        format!("{} {}: {}", self.media_type, self.identifier, self.media_name)
    }
}

/// Full media list pushed by the server
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MediaUpdate {
    /// Entries that are not objects are skipped
    #[serde(default, deserialize_with = "lenient_media")]
    pub media: Vec<MediaEntry>,
}

/// Messages received from the server
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Ping(ServerPing),
    MediaUpdate(MediaUpdate),
    /// Connected client information; not interpreted yet
    StatusUpdate(Value),
    /// Latest command sent to the clients; not interpreted yet
    CommandHistory(Value),
    Error(Value),
    /// Legacy bare-string authentication error
    NotAuthenticated,
    /// Unrecognised type tag or non-object payload
    Unknown(Value),
}

/// Converts between wire JSON and typed messages
#[derive(Debug, Clone, Default)]
pub struct Codec {
    license_code: String,
    log_outgoing: bool,
    log_incoming: bool,
}

impl Codec {
    /// Codec stamping the config's license key and honouring its log toggles
    pub fn new(config: &Config) -> Self {
        Self {
            license_code: config.license_key.clone(),
            log_outgoing: config.log_outgoing_messages,
            log_incoming: config.log_incoming_messages,
        }
    }

    /// Stamp a message with the envelope using the current time
    pub fn encode(&self, message: &Outbound) -> Result<Value> {
        self.encode_at(message, SystemTime::now())
    }

    /// Stamp a message with the envelope, sent at `sent_at`
    ///
    /// When outgoing logging is enabled the full payload is logged,
    /// license code included.
    pub fn encode_at(&self, message: &Outbound, sent_at: SystemTime) -> Result<Value> {
        let mut value = serde_json::to_value(message)?;
        let object = value
            .as_object_mut()
            .ok_or_else(|| VrSyncError::Protocol("outbound message is not an object".to_string()))?;

        let sent_ms = sent_at
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();

        object.insert("sender".to_string(), Value::from(SENDER));
        object.insert("licenseCode".to_string(), Value::from(self.license_code.as_str()));
        object.insert("protocolVersion".to_string(), Value::from(PROTOCOL_VERSION));
        object.insert("sentUnixTimestampMs".to_string(), Value::from(sent_ms));

        if self.log_outgoing {
            tracing::info!("Sending message: {}", value);
        }

        Ok(value)
    }

    /// Classify an inbound payload
    ///
    /// Fails only if a known message type has a malformed body.
    pub fn decode(&self, payload: Value) -> Result<Inbound> {
        if self.log_incoming {
            tracing::info!("Received message: {}", payload);
        }

        if payload.as_str() == Some(NOT_AUTHENTICATED) {
            return Ok(Inbound::NotAuthenticated);
        }

        let kind = payload
            .as_object()
            .and_then(|object| object.get("type"))
            .and_then(Value::as_str)
            .map(str::to_owned);

        let inbound = match kind.as_deref() {
            Some("Ping") => Inbound::Ping(serde_json::from_value(payload)?),
            Some("MediaUpdate") => Inbound::MediaUpdate(serde_json::from_value(payload)?),
            Some("StatusUpdate") => Inbound::StatusUpdate(payload),
            Some("CommandHistory") => Inbound::CommandHistory(payload),
            Some("Error") => Inbound::Error(payload),
            _ => Inbound::Unknown(payload),
        };

        Ok(inbound)
    }
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Null) | None => None,
        Some(other) => Some(other.to_string()),
    })
}

fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_string(deserializer)?.unwrap_or_default())
}

fn lenient_bool<'de, D>(deserializer: D) -> std::result::Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Bool(b)) => Some(b),
        Some(Value::String(s)) => s.trim().parse().ok(),
        Some(Value::Number(n)) => n.as_f64().map(|n| n != 0.0),
        _ => None,
    })
}

fn lenient_integer<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().map(|f| f as i64),
        _ => None,
    })
}

fn lenient_media<'de, D>(deserializer: D) -> std::result::Result<Vec<MediaEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => Ok(items
            .into_iter()
            .filter_map(|item| match serde_json::from_value(item) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::debug!("Skipping media entry: {}", e);
                    None
                }
            })
            .collect()),
        Some(Value::Null) | None => Ok(Vec::new()),
        Some(other) => Err(serde::de::Error::custom(format!("invalid media list: {other}"))),
    }
}
