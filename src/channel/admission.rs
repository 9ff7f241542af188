//! Admission: parse, validate, enqueue

use pixel_commander_shared::{
    codec::{self, Inbound},
    AdmissionError, CommandQueue, ConnectionId, QueueFull, Reply,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Turns persistent-channel frames into queued commands or inline replies
pub struct CommandChannel {
    queue: Arc<CommandQueue>,
    pixel_count: u16,
}

impl CommandChannel {
    pub fn new(queue: Arc<CommandQueue>, pixel_count: u16) -> Self {
        Self { queue, pixel_count }
    }

    /// Admit one text frame from `origin`
    ///
    /// Returns the reply to send immediately, or `None` when the command was
    /// queued and will be acknowledged by the executor. Never blocks.
    pub fn admit(&self, text: &str, origin: ConnectionId) -> Option<Reply> {
        match codec::decode(text, self.pixel_count, origin) {
            Ok(Inbound::Ping) => {
                debug!("Received ping from client {}", origin);
                Some(Reply::Pong)
            }
            Ok(Inbound::PixelCountQuery) => {
                debug!("Received getPixelCount from client {}", origin);
                Some(Reply::PixelCount(self.pixel_count))
            }
            Ok(Inbound::Command(command)) => match self.queue.enqueue(command) {
                Ok(()) => None,
                Err(QueueFull { command }) => {
                    warn!(
                        "Command queue full! Dropping command id {} from client {}",
                        command.id, origin
                    );
                    Some(AdmissionError::QueueFull { id: command.id }.reply())
                }
            },
            Err(e) => {
                debug!("Rejected frame from client {}: {}", origin, e);
                Some(e.reply())
            }
        }
    }
}
