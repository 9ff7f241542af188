//! Scheduler loop
//!
//! The single owner of LED state. Each tick it prunes departed sessions,
//! applies pending mirror operations, then drains one batch from the
//! command queue.

use crate::command::{CommandExecutor, MirrorRequest};
use crate::session::SessionRegistry;
use smart_leds::{SmartLedsWrite, RGB8};
use std::fmt::Debug;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

/// What one tick did
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub pruned: usize,
    pub mirrored: usize,
    pub executed: usize,
}

pub struct Scheduler<D> {
    executor: CommandExecutor<D>,
    sessions: Arc<SessionRegistry>,
    mirror_rx: mpsc::Receiver<MirrorRequest>,
    period: Duration,
    mirror_open: bool,
}

impl<D> Scheduler<D>
where
    D: SmartLedsWrite<Color = RGB8>,
    D::Error: Debug,
{
    pub fn new(
        executor: CommandExecutor<D>,
        sessions: Arc<SessionRegistry>,
        mirror_rx: mpsc::Receiver<MirrorRequest>,
        period: Duration,
    ) -> Self {
        Self {
            executor,
            sessions,
            mirror_rx,
            period,
            mirror_open: true,
        }
    }

    /// Run one pass of the loop
    pub async fn tick(&mut self) -> TickReport {
        let pruned = self.sessions.prune_dead().await;
        if !pruned.is_empty() {
            debug!(
                "Pruned {} departed session(s), {} remain",
                pruned.len(),
                self.sessions.count().await
            );
        }

        let mut mirrored = 0;
        while self.mirror_open {
            match self.mirror_rx.try_recv() {
                Ok(MirrorRequest { op, done }) => {
                    self.executor.apply_direct(op);
                    // The caller may have given up waiting
                    let _ = done.send(());
                    mirrored += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    warn!("Mirror channel closed; direct control disabled");
                    self.mirror_open = false;
                }
            }
        }

        let executed = self.executor.drain().await;

        TickReport {
            pruned: pruned.len(),
            mirrored,
            executed,
        }
    }

    /// Tick forever at the configured period
    pub async fn run(mut self) {
        info!("Scheduler running every {:?}", self.period);
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let report = self.tick().await;
            if report != TickReport::default() {
                trace!(
                    "Tick pruned {}, applied {} queued, {} direct ({} total, {} acks dropped)",
                    report.pruned,
                    report.executed,
                    report.mirrored,
                    self.executor.executed(),
                    self.executor.acks_dropped()
                );
            }
        }
    }

    #[cfg(test)]
    pub fn executor(&self) -> &CommandExecutor<D> {
        &self.executor
    }
}
