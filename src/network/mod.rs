//! Network bring-up for the controller
//!
//! This module handles:
//! - Joining an existing wireless network as a station
//! - Falling back to a self-hosted access point (protected, then open)
//! - A simulated radio for host builds

mod bringup;
mod radio;
mod sim;

pub use bringup::{BringupOutcome, NetworkBringup, NetworkMode};
pub use radio::WifiRadio;
pub use sim::SimulatedRadio;
