//! Socket.IO v5 over Engine.IO v4 text framing
//!
//! Only what a websocket-only client on the default namespace needs: the
//! Engine.IO open/close/ping/pong packets and the Socket.IO connect,
//! disconnect, event and connect_error packets.

use crate::error::{Result, VrSyncError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Socket.IO event name the VR Sync server uses for every payload
pub const MESSAGE_EVENT: &str = "message";

/// Engine.IO open packet body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    pub ping_interval: u64,
    pub ping_timeout: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_payload: Option<u64>,
}

impl Handshake {
    /// Longest the server may stay silent before the session is considered dead
    pub fn liveness_window(&self) -> Duration {
        Duration::from_millis(self.ping_interval.saturating_add(self.ping_timeout))
    }
}

/// A single text frame
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// Engine.IO `0`
    Open(Handshake),
    /// Engine.IO `1`
    Close,
    /// Engine.IO `2`
    Ping,
    /// Engine.IO `3`
    Pong,
    /// Socket.IO `40`, with the server's ack body when inbound
    Connect(Option<Value>),
    /// Socket.IO `41`
    Disconnect,
    /// Socket.IO `42`
    Event { name: String, data: Vec<Value> },
    /// Socket.IO `44`
    ConnectError(Value),
    /// Anything this client does not act on (noop, upgrade, acks, binary)
    Other(String),
}

impl Packet {
    /// Build a `message` event carrying one payload
    pub fn message(payload: Value) -> Self {
        Packet::Event {
            name: MESSAGE_EVENT.to_string(),
            data: vec![payload],
        }
    }

    /// Parse a text frame
    pub fn parse(text: &str) -> Result<Self> {
        let mut chars = text.chars();
        let engine_type = chars
            .next()
            .ok_or_else(|| VrSyncError::Protocol("empty frame".to_string()))?;
        let body = chars.as_str();

        match engine_type {
            '0' => Ok(Packet::Open(serde_json::from_str(body)?)),
            '1' => Ok(Packet::Close),
            '2' => Ok(Packet::Ping),
            '3' => Ok(Packet::Pong),
            '4' => Self::parse_socket(body),
            _ => Ok(Packet::Other(text.to_string())),
        }
    }

    fn parse_socket(body: &str) -> Result<Self> {
        let mut chars = body.chars();
        let socket_type = chars
            .next()
            .ok_or_else(|| VrSyncError::Protocol("empty socket.io packet".to_string()))?;
        let rest = skip_namespace(chars.as_str());

        match socket_type {
            '0' => {
                if rest.is_empty() {
                    Ok(Packet::Connect(None))
                } else {
                    Ok(Packet::Connect(Some(serde_json::from_str(rest)?)))
                }
            }
            '1' => Ok(Packet::Disconnect),
            '2' => {
                let rest = rest.trim_start_matches(|c: char| c.is_ascii_digit());
                let mut items: Vec<Value> = serde_json::from_str(rest)?;
                if items.is_empty() {
                    return Err(VrSyncError::Protocol("event without a name".to_string()));
                }
                let name = match items.remove(0) {
                    Value::String(name) => name,
                    other => {
                        return Err(VrSyncError::Protocol(format!("invalid event name: {other}")))
                    }
                };
                Ok(Packet::Event { name, data: items })
            }
            '4' => Ok(Packet::ConnectError(if rest.is_empty() {
                Value::Null
            } else {
                serde_json::from_str(rest)?
            })),
            _ => Ok(Packet::Other(format!("4{body}"))),
        }
    }

    /// Serialize to a text frame
    pub fn encode(&self) -> Result<String> {
        Ok(match self {
            Packet::Open(handshake) => format!("0{}", serde_json::to_string(handshake)?),
            Packet::Close => "1".to_string(),
            Packet::Ping => "2".to_string(),
            Packet::Pong => "3".to_string(),
            Packet::Connect(None) => "40".to_string(),
            Packet::Connect(Some(body)) => format!("40{body}"),
            Packet::Disconnect => "41".to_string(),
            Packet::Event { name, data } => {
                let mut items = Vec::with_capacity(data.len() + 1);
                items.push(Value::String(name.clone()));
                items.extend(data.iter().cloned());
                format!("42{}", serde_json::to_string(&items)?)
            }
            Packet::ConnectError(body) => format!("44{body}"),
            Packet::Other(text) => text.clone(),
        })
    }
}

/// Strip a leading `/namespace,` prefix
fn skip_namespace(rest: &str) -> &str {
    if rest.starts_with('/') {
        match rest.split_once(',') {
            Some((_, tail)) => tail,
            None => "",
        }
    } else {
        rest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_liveness_window_is_interval_plus_timeout() {
        let Packet::Open(handshake) =
            Packet::parse(r#"0{"sid":"a","pingInterval":200,"pingTimeout":300}"#).unwrap()
        else {
            panic!("expected open");
        };
        assert_eq!(handshake.liveness_window(), Duration::from_millis(500));
    }

    #[test]
    fn test_parse_open() {
        let packet = Packet::parse(
            r#"0{"sid":"abc","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#,
        )
        .unwrap();
        let Packet::Open(handshake) = packet else {
            panic!("expected open, got {packet:?}");
        };
        assert_eq!(handshake.sid, "abc");
        assert_eq!(handshake.ping_interval, 25000);
        assert_eq!(handshake.max_payload, Some(1000000));
    }

    #[test]
    fn test_parse_engine_control_packets() {
        assert_eq!(Packet::parse("1").unwrap(), Packet::Close);
        assert_eq!(Packet::parse("2").unwrap(), Packet::Ping);
        assert_eq!(Packet::parse("3").unwrap(), Packet::Pong);
        assert_eq!(Packet::parse("6").unwrap(), Packet::Other("6".to_string()));
    }

    #[test]
    fn test_parse_connect_ack_and_disconnect() {
        assert_eq!(
            Packet::parse(r#"40{"sid":"xyz"}"#).unwrap(),
            Packet::Connect(Some(json!({"sid": "xyz"})))
        );
        assert_eq!(Packet::parse("40").unwrap(), Packet::Connect(None));
        assert_eq!(Packet::parse("41").unwrap(), Packet::Disconnect);
    }

    #[test]
    fn test_parse_message_event() {
        let packet = Packet::parse(r#"42["message",{"type":"Ping","sender":"Server"}]"#).unwrap();
        assert_eq!(
            packet,
            Packet::Event {
                name: "message".to_string(),
                data: vec![json!({"type": "Ping", "sender": "Server"})],
            }
        );
    }

    #[test]
    fn test_parse_event_with_namespace_and_ack_id() {
        let packet = Packet::parse(r#"42/admin,17["message","not authenticated"]"#).unwrap();
        assert_eq!(packet, Packet::message(json!("not authenticated")));
    }

    #[test]
    fn test_parse_connect_error() {
        assert_eq!(
            Packet::parse(r#"44{"message":"Not authorized"}"#).unwrap(),
            Packet::ConnectError(json!({"message": "Not authorized"}))
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(Packet::parse("").is_err());
        assert!(Packet::parse("4").is_err());
        assert!(Packet::parse("42[]").is_err());
        assert!(Packet::parse("42[1,2]").is_err());
        assert!(Packet::parse("42{").is_err());
    }

    #[test]
    fn test_encode_client_packets() {
        assert_eq!(Packet::Pong.encode().unwrap(), "3");
        assert_eq!(Packet::Connect(None).encode().unwrap(), "40");
        assert_eq!(Packet::Disconnect.encode().unwrap(), "41");
        assert_eq!(
            Packet::message(json!({"type": "Calibrate"})).encode().unwrap(),
            r#"42["message",{"type":"Calibrate"}]"#
        );
    }
}
