//! pixel-commander shared protocol types
//!
//! This crate provides the command model, wire replies, the bounded command
//! queue and the network bring-up state machine used by the LED controller.

pub mod codec;
pub mod queue;
pub mod state_machine;

use serde::{Serialize, Serializer};
use smart_leds::RGB8;
use std::fmt;
use std::num::NonZeroU32;

pub use codec::{AdmissionError, CodecError, Inbound};
pub use queue::{CommandQueue, QueueFull};

/// Controller limits and timing defaults
pub mod limits {
    /// Ring buffer slots; one is always held back, so 511 commands fit
    pub const QUEUE_CAPACITY: usize = 512;

    /// Commands applied per scheduler tick
    pub const COMMANDS_PER_TICK: usize = 10;

    /// Station join timeout in milliseconds
    pub const CONNECT_TIMEOUT_MS: u64 = 15_000;

    /// Station status poll interval in milliseconds
    pub const STATION_POLL_INTERVAL_MS: u64 = 250;

    /// Delay after starting the access point before its address is read
    pub const AP_SETTLE_MS: u64 = 500;

    /// WPA2 needs at least this many credential bytes
    pub const MIN_PROTECTED_CREDENTIAL_LEN: usize = 8;

    /// Brightness used when `setBrightness` omits the value
    pub const DEFAULT_BRIGHTNESS: u8 = 255;

    /// Literal text frame answered with a pong
    pub const PING_LITERAL: &str = "ping";
}

/// Identifier of a live client connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u32);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Client-supplied correlation token. Zero is the "missing" sentinel and is
/// never representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandId(NonZeroU32);

impl CommandId {
    pub fn new(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a queued command does to the strip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    SetPixelColor { index: u16, color: RGB8 },
    SetColor(RGB8),
    Clear,
    Show,
    SetBrightness(u8),
}

impl CommandKind {
    /// Wire name of the command
    pub fn name(&self) -> &'static str {
        match self {
            CommandKind::SetPixelColor { .. } => "setPixelColor",
            CommandKind::SetColor(_) => "setColor",
            CommandKind::Clear => "clear",
            CommandKind::Show => "show",
            CommandKind::SetBrightness(_) => "setBrightness",
        }
    }
}

/// An admitted command. Immutable once enqueued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub kind: CommandKind,
    pub origin: ConnectionId,
    pub id: CommandId,
}

impl Command {
    pub fn new(kind: CommandKind, origin: ConnectionId, id: CommandId) -> Self {
        Self { kind, origin, id }
    }
}

/// Error codes carried in `{"status":"error","error":...}` replies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    BadJson,
    MissingId,
    UnknownCmd,
    IndexOutOfBounds,
    QueueFull,
    MissingParams,
    MissingParam,
    Unavailable,
}

/// A reply sent to a client, either inline or as a deferred acknowledgment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Pong,
    PixelCount(u16),
    Ack(CommandId),
    Ok,
    Error {
        code: ErrorCode,
        id: Option<CommandId>,
        max: Option<u16>,
    },
}

impl Reply {
    /// Error reply without correlation fields
    pub fn error(code: ErrorCode) -> Self {
        Reply::Error {
            code,
            id: None,
            max: None,
        }
    }
}

/// Flat wire shape; field order is the order clients see
#[derive(Serialize)]
struct WireReply {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
    #[serde(rename = "pixelCount", skip_serializing_if = "Option::is_none")]
    pixel_count: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ack: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max: Option<u16>,
}

impl WireReply {
    fn ok() -> Self {
        Self {
            status: "ok",
            message: None,
            pixel_count: None,
            ack: None,
            error: None,
            id: None,
            max: None,
        }
    }
}

impl From<&Reply> for WireReply {
    fn from(reply: &Reply) -> Self {
        match *reply {
            Reply::Pong => WireReply {
                message: Some("pong"),
                ..WireReply::ok()
            },
            Reply::PixelCount(count) => WireReply {
                pixel_count: Some(count),
                ..WireReply::ok()
            },
            Reply::Ack(id) => WireReply {
                ack: Some(id.get()),
                ..WireReply::ok()
            },
            Reply::Ok => WireReply::ok(),
            Reply::Error { code, id, max } => WireReply {
                status: "error",
                error: Some(code),
                id: id.map(CommandId::get),
                max,
                ..WireReply::ok()
            },
        }
    }
}

impl Serialize for Reply {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WireReply::from(self).serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn json(reply: Reply) -> String {
        serde_json::to_string(&reply).unwrap()
    }

    #[test]
    fn test_command_id_rejects_zero() {
        assert!(CommandId::new(0).is_none());
        assert_eq!(CommandId::new(7).unwrap().get(), 7);
    }

    #[test]
    fn test_success_reply_shapes() {
        assert_eq!(json(Reply::Pong), r#"{"status":"ok","message":"pong"}"#);
        assert_eq!(json(Reply::PixelCount(64)), r#"{"status":"ok","pixelCount":64}"#);
        assert_eq!(
            json(Reply::Ack(CommandId::new(42).unwrap())),
            r#"{"status":"ok","ack":42}"#
        );
        assert_eq!(json(Reply::Ok), r#"{"status":"ok"}"#);
    }

    #[test]
    fn test_error_reply_shapes() {
        assert_eq!(
            json(Reply::error(ErrorCode::MissingParams)),
            r#"{"status":"error","error":"missing_params"}"#
        );
        let oob = Reply::Error {
            code: ErrorCode::IndexOutOfBounds,
            id: CommandId::new(5),
            max: Some(63),
        };
        assert_eq!(
            json(oob),
            r#"{"status":"error","error":"index_out_of_bounds","id":5,"max":63}"#
        );
    }

    #[test]
    fn test_command_names() {
        assert_eq!(CommandKind::Clear.name(), "clear");
        assert_eq!(CommandKind::SetBrightness(1).name(), "setBrightness");
    }
}
