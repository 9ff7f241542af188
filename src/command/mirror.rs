//! Immediate-apply control path
//!
//! Operations posted here skip the command queue and the id/ack protocol.
//! They are still applied by the scheduler loop, so LED state has a single
//! owner; the caller waits until the loop has applied the operation.

use smart_leds::RGB8;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Pending operations the loop may hold before callers wait for space
pub const MIRROR_DEPTH: usize = 16;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MirrorError {
    #[error("scheduler loop is not running")]
    LoopStopped,
}

/// A direct operation on the strip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorOp {
    SetColor(RGB8),
    Clear,
    Show,
    SetBrightness(u8),
}

/// An operation plus the signal fired once it has been applied
#[derive(Debug)]
pub struct MirrorRequest {
    pub op: MirrorOp,
    pub done: oneshot::Sender<()>,
}

/// Cloneable control handle for code and HTTP callers
#[derive(Clone, Debug)]
pub struct MirrorHandle {
    tx: mpsc::Sender<MirrorRequest>,
    pixel_count: u16,
}

impl MirrorHandle {
    /// Create a handle and the receiver the scheduler loop drains
    pub fn channel(pixel_count: u16, depth: usize) -> (Self, mpsc::Receiver<MirrorRequest>) {
        let (tx, rx) = mpsc::channel(depth);
        (Self { tx, pixel_count }, rx)
    }

    pub fn pixel_count(&self) -> u16 {
        self.pixel_count
    }

    /// Post an operation and wait until it has been applied
    pub async fn apply(&self, op: MirrorOp) -> Result<(), MirrorError> {
        let (done, applied) = oneshot::channel();
        self.tx
            .send(MirrorRequest { op, done })
            .await
            .map_err(|_| MirrorError::LoopStopped)?;
        applied.await.map_err(|_| MirrorError::LoopStopped)
    }

    pub async fn set_color(&self, r: u8, g: u8, b: u8) -> Result<(), MirrorError> {
        self.apply(MirrorOp::SetColor(RGB8::new(r, g, b))).await
    }

    pub async fn clear(&self) -> Result<(), MirrorError> {
        self.apply(MirrorOp::Clear).await
    }

    pub async fn show(&self) -> Result<(), MirrorError> {
        self.apply(MirrorOp::Show).await
    }

    pub async fn set_brightness(&self, brightness: u8) -> Result<(), MirrorError> {
        self.apply(MirrorOp::SetBrightness(brightness)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_apply_waits_for_completion() {
        let (handle, mut rx) = MirrorHandle::channel(8, MIRROR_DEPTH);
        let loop_side = tokio::spawn(async move {
            let request = rx.recv().await.unwrap();
            let _ = request.done.send(());
            request.op
        });

        handle.set_color(1, 2, 3).await.unwrap();
        assert_eq!(loop_side.await.unwrap(), MirrorOp::SetColor(RGB8::new(1, 2, 3)));
    }

    #[tokio::test]
    async fn test_stopped_loop_is_reported() {
        let (handle, rx) = MirrorHandle::channel(8, MIRROR_DEPTH);
        drop(rx);
        assert_eq!(handle.show().await, Err(MirrorError::LoopStopped));
    }
}
