//! Pixel driver used on host builds

use smart_leds::{SmartLedsWrite, RGB8};
use std::convert::Infallible;
use tracing::{debug, info};

/// Records the last frame written instead of clocking out to a pin
#[derive(Debug)]
pub struct SimulatedStrip {
    pin: u8,
    displayed: Vec<RGB8>,
    frames_written: u64,
}

impl SimulatedStrip {
    pub fn new(pin: u8, pixel_count: u16) -> Self {
        info!("Simulated strip: {} pixels on pin {}", pixel_count, pin);
        Self {
            pin,
            displayed: vec![RGB8::default(); usize::from(pixel_count)],
            frames_written: 0,
        }
    }

    /// What the strip currently shows
    #[cfg(test)]
    pub fn displayed(&self) -> &[RGB8] {
        &self.displayed
    }

    #[cfg(test)]
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }
}

impl SmartLedsWrite for SimulatedStrip {
    type Error = Infallible;
    type Color = RGB8;

    fn write<T, I>(&mut self, iterator: T) -> Result<(), Self::Error>
    where
        T: IntoIterator<Item = I>,
        I: Into<Self::Color>,
    {
        self.displayed.clear();
        self.displayed.extend(iterator.into_iter().map(Into::into));
        self.frames_written += 1;
        debug!(
            "pin {}: frame {} ({} pixels)",
            self.pin,
            self.frames_written,
            self.displayed.len()
        );
        Ok(())
    }
}
