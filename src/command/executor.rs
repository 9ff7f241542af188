//! Command executor - drains queued commands and acknowledges them

use super::MirrorOp;
use crate::led::LedState;
use crate::session::SessionRegistry;
use pixel_commander_shared::{Command, CommandKind, CommandQueue, Reply};
use smart_leds::{SmartLedsWrite, RGB8};
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Applies queued commands to the strip, a bounded batch per tick
pub struct CommandExecutor<D> {
    queue: Arc<CommandQueue>,
    sessions: Arc<SessionRegistry>,
    led: LedState<D>,
    batch_size: usize,
    batch: Vec<Command>,
    executed: u64,
    acks_dropped: u64,
}

impl<D> CommandExecutor<D>
where
    D: SmartLedsWrite<Color = RGB8>,
    D::Error: Debug,
{
    pub fn new(
        queue: Arc<CommandQueue>,
        sessions: Arc<SessionRegistry>,
        led: LedState<D>,
        batch_size: usize,
    ) -> Self {
        Self {
            queue,
            sessions,
            led,
            batch_size,
            batch: Vec::with_capacity(batch_size),
            executed: 0,
            acks_dropped: 0,
        }
    }

    /// Apply up to one batch of queued commands in arrival order, then
    /// acknowledge each to its origin connection. Returns the number applied.
    pub async fn drain(&mut self) -> usize {
        let mut batch = std::mem::take(&mut self.batch);
        batch.clear();
        let taken = self.queue.drain_into(self.batch_size, &mut batch);

        for command in &batch {
            trace!(
                "Applying {} (id {}) from {}",
                command.kind.name(),
                command.id,
                command.origin
            );
            self.apply(command.kind);
            self.acknowledge(command).await;
        }
        self.executed += taken as u64;

        self.batch = batch;
        taken
    }

    /// Apply a mirror operation; no id, no acknowledgment
    pub fn apply_direct(&mut self, op: MirrorOp) {
        match op {
            MirrorOp::SetColor(color) => self.apply(CommandKind::SetColor(color)),
            MirrorOp::Clear => self.apply(CommandKind::Clear),
            MirrorOp::Show => self.apply(CommandKind::Show),
            MirrorOp::SetBrightness(level) => self.apply(CommandKind::SetBrightness(level)),
        }
    }

    fn apply(&mut self, kind: CommandKind) {
        match kind {
            CommandKind::SetPixelColor { index, color } => {
                self.led.set_pixel(index, color);
            }
            CommandKind::SetColor(color) => self.led.fill(color),
            CommandKind::Clear => self.led.clear(),
            CommandKind::Show => {
                if let Err(e) = self.led.show() {
                    warn!("LED write error: {:?}", e);
                }
            }
            CommandKind::SetBrightness(level) => {
                debug!("Brightness {} -> {}", self.led.brightness(), level);
                self.led.set_brightness(level);
            }
        }
    }

    async fn acknowledge(&mut self, command: &Command) {
        if !self.sessions.deliver(command.origin, Reply::Ack(command.id)).await {
            self.acks_dropped += 1;
            debug!(
                "Dropping ack {} for {} (connection gone)",
                command.id, command.origin
            );
        }
    }

    #[cfg(test)]
    pub fn led(&self) -> &LedState<D> {
        &self.led
    }

    /// Commands applied since startup
    pub fn executed(&self) -> u64 {
        self.executed
    }

    /// Acknowledgments that could not be delivered
    pub fn acks_dropped(&self) -> u64 {
        self.acks_dropped
    }
}
