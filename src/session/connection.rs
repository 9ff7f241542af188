//! Individual client session handling

use anyhow::{anyhow, Result};
use pixel_commander_shared::{ConnectionId, Reply};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Notify;
use tracing::warn;

/// Handle to send replies to a specific client
#[derive(Clone, Debug)]
pub struct SessionHandle {
    pub id: ConnectionId,
    pub addr: Option<SocketAddr>,
    pub connected_at: Instant,
    outbound: mpsc::Sender<Reply>,
    alive: Arc<AtomicBool>,
    died: Arc<Notify>,
}

impl SessionHandle {
    pub(super) fn new(id: ConnectionId, addr: Option<SocketAddr>, outbound: mpsc::Sender<Reply>) -> Self {
        Self {
            id,
            addr,
            connected_at: Instant::now(),
            outbound,
            alive: Arc::new(AtomicBool::new(true)),
            died: Arc::new(Notify::new()),
        }
    }

    /// Live until disconnected or until the writer side goes away
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire) && !self.outbound.is_closed()
    }

    pub fn mark_dead(&self) {
        self.alive.store(false, Ordering::Release);
        self.died.notify_one();
    }

    /// Resolves once the session has been marked dead
    pub async fn closed(&self) {
        while self.is_alive() {
            self.died.notified().await;
        }
    }

    /// Queue a reply without waiting; false if the session is dead
    ///
    /// A client that lets its outbound buffer fill is not keeping up and is
    /// marked dead, so its connection gets closed.
    pub fn try_deliver(&self, reply: Reply) -> bool {
        if !self.is_alive() {
            return false;
        }
        match self.outbound.try_send(reply) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("Client {} outbound buffer full, closing connection", self.id);
                self.mark_dead();
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Queue a reply, waiting for outbound buffer space
    pub async fn send(&self, reply: Reply) -> Result<()> {
        if !self.is_alive() {
            return Err(anyhow!("Session {} closed", self.id));
        }
        self.outbound
            .send(reply)
            .await
            .map_err(|_| anyhow!("Session {} closed", self.id))
    }
}

/// A freshly opened session: the shared handle plus the receiving end the
/// connection's writer drains
pub struct Session {
    pub handle: SessionHandle,
    pub outbound_rx: mpsc::Receiver<Reply>,
}
