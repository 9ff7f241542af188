//! Text-frame codec for the persistent channel
//!
//! Inbound frames are either the literal `ping` or a JSON object:
//! ```text
//! {"cmd": "setPixelColor", "id": 7, "index": 3, "r": 255, "g": 0, "b": 0}
//! ```
//! Decoding performs admission checks in a fixed order: pong/pixel-count
//! queries first, then the command id, then the command name, then
//! command-specific bounds. Outbound replies are serialized as JSON.

use serde_json::Value;
use smart_leds::RGB8;
use thiserror::Error;

use crate::{limits, Command, CommandId, CommandKind, ConnectionId, ErrorCode, Reply};

/// A decoded inbound frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inbound {
    /// Answer with a pong, never queued
    Ping,
    /// Answer with the pixel count, never queued
    PixelCountQuery,
    /// Validated command ready for the queue
    Command(Command),
}

/// Reasons a frame is refused before it reaches the queue
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("payload is not valid JSON")]
    BadJson,

    #[error("command id missing or zero")]
    MissingId,

    #[error("unknown command (id {id})")]
    UnknownCommand { id: CommandId },

    #[error("pixel index out of bounds (id {id}, max {max})")]
    IndexOutOfBounds { id: CommandId, max: u16 },

    #[error("command queue full, dropped id {id}")]
    QueueFull { id: CommandId },
}

impl AdmissionError {
    /// The error reply sent back to the client
    pub fn reply(&self) -> Reply {
        match *self {
            AdmissionError::BadJson => Reply::error(ErrorCode::BadJson),
            AdmissionError::MissingId => Reply::error(ErrorCode::MissingId),
            AdmissionError::UnknownCommand { id } => Reply::Error {
                code: ErrorCode::UnknownCmd,
                id: Some(id),
                max: None,
            },
            AdmissionError::IndexOutOfBounds { id, max } => Reply::Error {
                code: ErrorCode::IndexOutOfBounds,
                id: Some(id),
                max: Some(max),
            },
            AdmissionError::QueueFull { id } => Reply::Error {
                code: ErrorCode::QueueFull,
                id: Some(id),
                max: None,
            },
        }
    }
}

/// Errors that can occur while encoding replies
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("JSON encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Decode one text frame received from `origin`
pub fn decode(text: &str, pixel_count: u16, origin: ConnectionId) -> Result<Inbound, AdmissionError> {
    if text == limits::PING_LITERAL {
        return Ok(Inbound::Ping);
    }

    let doc: Value = serde_json::from_str(text).map_err(|_| AdmissionError::BadJson)?;
    let cmd = doc.get("cmd").and_then(Value::as_str).unwrap_or("");

    match cmd {
        "ping" => return Ok(Inbound::Ping),
        "getPixelCount" => return Ok(Inbound::PixelCountQuery),
        _ => {}
    }

    let id = command_id(&doc).ok_or(AdmissionError::MissingId)?;

    let kind = match cmd {
        "setColor" => CommandKind::SetColor(color(&doc)),
        "clear" => CommandKind::Clear,
        "setPixelColor" => {
            let index = pixel_index(&doc, pixel_count).ok_or(AdmissionError::IndexOutOfBounds {
                id,
                max: pixel_count.saturating_sub(1),
            })?;
            CommandKind::SetPixelColor {
                index,
                color: color(&doc),
            }
        }
        "show" => CommandKind::Show,
        "setBrightness" => {
            CommandKind::SetBrightness(channel(&doc, "brightness", limits::DEFAULT_BRIGHTNESS))
        }
        _ => return Err(AdmissionError::UnknownCommand { id }),
    };

    Ok(Inbound::Command(Command::new(kind, origin, id)))
}

/// Encode a reply as a JSON text frame
pub fn encode_reply(reply: &Reply) -> Result<String, CodecError> {
    Ok(serde_json::to_string(reply)?)
}

fn command_id(doc: &Value) -> Option<CommandId> {
    doc.get("id")
        .and_then(Value::as_u64)
        .and_then(|raw| u32::try_from(raw).ok())
        .and_then(CommandId::new)
}

/// Absent index means pixel 0; anything that is not an in-range unsigned
/// integer is out of bounds
fn pixel_index(doc: &Value, pixel_count: u16) -> Option<u16> {
    let index = match doc.get("index") {
        None => 0,
        Some(value) => value.as_u64()?,
    };
    if index < u64::from(pixel_count) {
        u16::try_from(index).ok()
    } else {
        None
    }
}

fn color(doc: &Value) -> RGB8 {
    RGB8::new(channel(doc, "r", 0), channel(doc, "g", 0), channel(doc, "b", 0))
}

/// Read a 0..=255 channel, clamping out-of-range numbers
fn channel(doc: &Value, key: &str, default: u8) -> u8 {
    let Some(value) = doc.get(key) else {
        return default;
    };
    if let Some(n) = value.as_i64() {
        n.clamp(0, 255) as u8
    } else if let Some(n) = value.as_u64() {
        n.min(255) as u8
    } else if let Some(f) = value.as_f64() {
        f.clamp(0.0, 255.0) as u8
    } else {
        default
    }
}
