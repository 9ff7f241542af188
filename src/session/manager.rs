//! Session registry for tracking all connected clients

use super::connection::{Session, SessionHandle};
use pixel_commander_shared::{ConnectionId, Reply};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;

/// Replies buffered per connection before the client counts as stalled
const OUTBOUND_DEPTH: usize = 64;

/// Manages all active client sessions
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<ConnectionId, SessionHandle>>>,
    next_id: AtomicU32,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            next_id: AtomicU32::new(1),
        }
    }

    /// Register a new connection and allocate its id
    pub async fn open(&self, addr: Option<SocketAddr>) -> Session {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (outbound, outbound_rx) = mpsc::channel(OUTBOUND_DEPTH);
        let handle = SessionHandle::new(id, addr, outbound);

        self.sessions.write().await.insert(id, handle.clone());

        Session {
            handle,
            outbound_rx,
        }
    }

    /// Unregister a connection and mark it dead
    pub async fn close(&self, id: ConnectionId) {
        if let Some(handle) = self.sessions.write().await.remove(&id) {
            handle.mark_dead();
        }
    }

    /// Best-effort, non-blocking delivery; false when the reply was dropped
    pub async fn deliver(&self, id: ConnectionId, reply: Reply) -> bool {
        let sessions = self.sessions.read().await;
        match sessions.get(&id) {
            Some(handle) => handle.try_deliver(reply),
            None => false,
        }
    }

    /// Remove sessions that are no longer alive and return their ids
    pub async fn prune_dead(&self) -> Vec<ConnectionId> {
        let dead: Vec<ConnectionId> = {
            let sessions = self.sessions.read().await;
            sessions
                .iter()
                .filter(|(_, handle)| !handle.is_alive())
                .map(|(id, _)| *id)
                .collect()
        };

        if !dead.is_empty() {
            let mut sessions = self.sessions.write().await;
            for id in &dead {
                if let Some(handle) = sessions.remove(id) {
                    handle.mark_dead();
                    match handle.addr {
                        Some(addr) => debug!("Removed session {} ({})", id, addr),
                        None => debug!("Removed session {}", id),
                    }
                }
            }
        }
        dead
    }

    /// Get the number of registered sessions
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixel_commander_shared::CommandId;
    use std::time::Duration;

    fn ack(id: u32) -> Reply {
        Reply::Ack(CommandId::new(id).unwrap())
    }

    #[tokio::test]
    async fn test_open_assigns_distinct_ids() {
        let registry = SessionRegistry::new();
        let a = registry.open(None).await;
        let b = registry.open(None).await;
        assert_ne!(a.handle.id, b.handle.id);
        assert_eq!(registry.count().await, 2);
    }

    #[tokio::test]
    async fn test_deliver_to_live_session() {
        let registry = SessionRegistry::new();
        let mut session = registry.open(None).await;

        assert!(registry.deliver(session.handle.id, ack(1)).await);
        assert_eq!(session.outbound_rx.recv().await, Some(ack(1)));
    }

    #[tokio::test]
    async fn test_deliver_after_close_is_dropped() {
        let registry = SessionRegistry::new();
        let session = registry.open(None).await;
        let id = session.handle.id;

        registry.close(id).await;
        assert!(!session.handle.is_alive());
        assert!(!registry.deliver(id, ack(1)).await);
        assert_eq!(registry.count().await, 0);
    }

    #[tokio::test]
    async fn test_overflowing_session_is_marked_dead() {
        let registry = SessionRegistry::new();
        let session = registry.open(None).await;
        let id = session.handle.id;

        for n in 1..=OUTBOUND_DEPTH as u32 {
            assert!(registry.deliver(id, ack(n)).await);
        }
        assert!(session.handle.is_alive());

        // The client stopped reading: the ack is lost because the
        // connection is being closed, not while it stays open
        assert!(!registry.deliver(id, ack(999)).await);
        assert!(!session.handle.is_alive());
        tokio::time::timeout(Duration::from_secs(1), session.handle.closed())
            .await
            .expect("closed() should resolve once the session is dead");
        assert_eq!(registry.prune_dead().await, vec![id]);
    }

    #[tokio::test]
    async fn test_closed_waits_for_close() {
        let registry = SessionRegistry::new();
        let session = registry.open(None).await;
        let handle = session.handle.clone();

        let waiter = tokio::spawn(async move { handle.closed().await });
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        registry.close(session.handle.id).await;
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("closed() should resolve after close")
            .unwrap();
    }

    #[tokio::test]
    async fn test_prune_removes_sessions_with_dropped_writer() {
        let registry = SessionRegistry::new();
        let kept = registry.open(None).await;
        let gone = registry.open(None).await;
        let gone_id = gone.handle.id;
        drop(gone.outbound_rx);

        let pruned = registry.prune_dead().await;
        assert_eq!(pruned, vec![gone_id]);
        assert_eq!(registry.count().await, 1);
        assert!(registry.deliver(kept.handle.id, ack(1)).await);
    }
}
