//! LED strip state and pixel drivers
//!
//! The physical driver is any `smart_leds::SmartLedsWrite` implementation;
//! `LedState` keeps the back-buffer and brightness and only writes to the
//! driver on `show`.

mod driver;
mod state;

pub use driver::SimulatedStrip;
pub use state::LedState;
