use crate::client::VrSyncClient;
use crate::error::{Result, VrSyncError};
use crate::protocol::MediaType;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Options of the Play action, as stored by the host
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayOptions {
    /// Media id, free text
    #[serde(deserialize_with = "text_or_number")]
    pub id: String,
    /// Index into [`MediaType::ALL`]
    #[serde(rename = "type", deserialize_with = "index_or_text")]
    pub media_type: usize,
    #[serde(rename = "loop")]
    pub looping: bool,
    /// Preparation time for devices before playback starts in sync
    pub play_delay_ms: u64,
}

impl Default for PlayOptions {
    fn default() -> Self {
        Self {
            id: "0".to_string(),
            media_type: 2,
            looping: false,
            play_delay_ms: 5000,
        }
    }
}

/// Actions a host button can trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Play(PlayOptions),
    Stop,
    SendTextMessage { message: String },
    CalibrateViewpoint,
}

impl Action {
    /// Host action identifiers
    pub const IDS: [&'static str; 4] = [
        "play_action",
        "stop_action",
        "sendTextMessage_action",
        "calibrate_action",
    ];

    /// Build an action from the host's action id and options object
    pub fn from_host(action_id: &str, options: &Value) -> Result<Self> {
        match action_id {
            "play_action" => Ok(Action::Play(PlayOptions::deserialize(options)?)),
            "stop_action" => Ok(Action::Stop),
            "sendTextMessage_action" => {
                let message = options
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                Ok(Action::SendTextMessage { message })
            }
            "calibrate_action" => Ok(Action::CalibrateViewpoint),
            other => Err(VrSyncError::UnknownAction(other.to_string())),
        }
    }

    /// Label shown in the host's action picker
    pub fn name(&self) -> &'static str {
        match self {
            Action::Play(_) => "Play",
            Action::Stop => "Stop",
            Action::SendTextMessage { .. } => "Send Text Message",
            Action::CalibrateViewpoint => "Calibrate Viewpoint",
        }
    }

    /// Run the action against a client
    ///
    /// The server expects the media type label, not the dropdown index, so
    /// an unknown index fails here before anything is sent.
    pub fn execute(&self, client: &VrSyncClient) -> Result<()> {
        match self {
            Action::Play(options) => client.play(
                options.id.clone(),
                MediaType::from_index(options.media_type)?,
                options.looping,
                options.play_delay_ms,
            ),
            Action::Stop => client.stop(),
            Action::SendTextMessage { message } => client.send_text(message.clone()),
            Action::CalibrateViewpoint => client.calibrate(),
        }
    }
}

fn text_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("expected text, got {other}"))),
    }
}

fn index_or_text<'de, D>(deserializer: D) -> std::result::Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    let invalid = |v: &Value| -> D::Error {
        serde::de::Error::custom(format!("invalid media type: {v}"))
    };
    let value = Value::deserialize(deserializer)?;
    match &value {
        Value::Number(n) => n
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| invalid(&value)),
        Value::String(s) => s.trim().parse().map_err(|_| invalid(&value)),
        _ => Err(invalid(&value)),
    }
}
