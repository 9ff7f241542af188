//! Command execution infrastructure for the controller
//!
//! This module handles:
//! - Draining queued commands a bounded batch per tick
//! - Applying them to LED state
//! - Acknowledging each to the connection that sent it
//! - The immediate-apply path used by the HTTP mirror and local code

mod executor;
mod mirror;

pub use executor::CommandExecutor;
pub use mirror::{MirrorError, MirrorHandle, MirrorOp, MirrorRequest, MIRROR_DEPTH};
