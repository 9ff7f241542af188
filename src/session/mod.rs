//! Session management for connected clients
//!
//! This module handles:
//! - Registering persistent-channel connections and their outbound replies
//! - Liveness tracking so late acknowledgments can be dropped
//! - Pruning sessions whose connection has gone away

mod connection;
mod manager;

pub use connection::Session;
pub use manager::SessionRegistry;
