//! Engine.IO v4 / Socket.IO v5 framing for the live channel.
//!
//! Only the subset the radar needs: the open handshake, heartbeat, namespace
//! connect/disconnect and named events on the default namespace. Binary
//! attachments are not supported.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Engine.IO protocol revision sent in the handshake query.
pub const ENGINE_IO_VERSION: &str = "4";

pub const PONG: &str = "3";
pub const CONNECT: &str = "40";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenInfo {
    pub sid: String,
    #[serde(default)]
    pub ping_interval: u64,
    #[serde(default)]
    pub ping_timeout: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Open(OpenInfo),
    Close,
    Ping,
    Pong,
    Connected,
    Disconnected,
    ConnectError(Value),
    Event { name: String, args: Vec<Value> },
    /// Anything outside the subset above; ignored by the channel.
    Other(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
    #[error("empty frame")]
    Empty,
    #[error("invalid json: {0}")]
    InvalidJson(String),
    #[error("invalid event: {0}")]
    InvalidEvent(&'static str),
}

pub fn decode(frame: &str) -> Result<Packet, DecodeError> {
    let mut chars = frame.chars();
    let kind = chars.next().ok_or(DecodeError::Empty)?;
    let rest = chars.as_str();

    match kind {
        '0' => serde_json::from_str(rest)
            .map(Packet::Open)
            .map_err(|e| DecodeError::InvalidJson(e.to_string())),
        '1' => Ok(Packet::Close),
        '2' => Ok(Packet::Ping),
        '3' => Ok(Packet::Pong),
        '4' => decode_message(rest),
        _ => Ok(Packet::Other(frame.to_string())),
    }
}

fn decode_message(body: &str) -> Result<Packet, DecodeError> {
    let mut chars = body.chars();
    let kind = match chars.next() {
        Some(k) => k,
        None => return Ok(Packet::Other(format!("4{}", body))),
    };
    let rest = skip_namespace(chars.as_str());

    match kind {
        '0' => Ok(Packet::Connected),
        '1' => Ok(Packet::Disconnected),
        '2' => decode_event(rest),
        '4' => {
            let detail = if rest.is_empty() {
                Value::Null
            } else {
                serde_json::from_str(rest).map_err(|e| DecodeError::InvalidJson(e.to_string()))?
            };
            Ok(Packet::ConnectError(detail))
        }
        _ => Ok(Packet::Other(format!("4{}", body))),
    }
}

// Default namespace frames carry no prefix; others look like "/chat,".
fn skip_namespace(rest: &str) -> &str {
    if rest.starts_with('/') {
        match rest.find(',') {
            Some(idx) => &rest[idx + 1..],
            None => "",
        }
    } else {
        rest
    }
}

fn decode_event(rest: &str) -> Result<Packet, DecodeError> {
    // optional ack id before the array
    let payload = rest.trim_start_matches(|c: char| c.is_ascii_digit());
    let value: Value =
        serde_json::from_str(payload).map_err(|e| DecodeError::InvalidJson(e.to_string()))?;
    let mut items = match value {
        Value::Array(items) => items,
        _ => return Err(DecodeError::InvalidEvent("payload is not an array")),
    };
    if items.is_empty() {
        return Err(DecodeError::InvalidEvent("missing event name"));
    }
    let name = match items.remove(0) {
        Value::String(name) => name,
        _ => return Err(DecodeError::InvalidEvent("event name is not a string")),
    };
    Ok(Packet::Event { name, args: items })
}
