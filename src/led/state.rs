//! In-memory pixel buffer with an explicit flush

use smart_leds::{brightness, SmartLedsWrite, RGB8};

/// Pixel back-buffer and global brightness for one strip
///
/// Writes are only visible on the strip after `show`. Brightness is applied
/// at flush time, so it never alters the stored colors.
pub struct LedState<D> {
    driver: D,
    pixels: Vec<RGB8>,
    brightness: u8,
}

impl<D> LedState<D>
where
    D: SmartLedsWrite<Color = RGB8>,
{
    /// Create a blank strip of `pixel_count` pixels at full brightness
    pub fn new(driver: D, pixel_count: u16) -> Self {
        Self {
            driver,
            pixels: vec![RGB8::default(); usize::from(pixel_count)],
            brightness: u8::MAX,
        }
    }

    /// Write one pixel; returns false if `index` is past the end
    pub fn set_pixel(&mut self, index: u16, color: RGB8) -> bool {
        match self.pixels.get_mut(usize::from(index)) {
            Some(pixel) => {
                *pixel = color;
                true
            }
            None => false,
        }
    }

    /// Write every pixel
    pub fn fill(&mut self, color: RGB8) {
        self.pixels.fill(color);
    }

    /// Zero every pixel without flushing
    pub fn clear(&mut self) {
        self.fill(RGB8::default());
    }

    /// Set the brightness used by subsequent flushes
    pub fn set_brightness(&mut self, brightness: u8) {
        self.brightness = brightness;
    }

    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    /// Back-buffer contents (unscaled)
    #[cfg(test)]
    pub fn pixels(&self) -> &[RGB8] {
        &self.pixels
    }

    /// Flush the back-buffer, scaled by the current brightness
    pub fn show(&mut self) -> Result<(), D::Error> {
        self.driver
            .write(brightness(self.pixels.iter().copied(), self.brightness))
    }

    #[cfg(test)]
    pub fn driver(&self) -> &D {
        &self.driver
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::led::SimulatedStrip;

    fn strip(count: u16) -> LedState<SimulatedStrip> {
        LedState::new(SimulatedStrip::new(5, count), count)
    }

    #[test]
    fn test_writes_invisible_until_show() {
        let mut led = strip(4);
        led.fill(RGB8::new(10, 20, 30));
        assert!(led.driver().displayed().iter().all(|p| *p == RGB8::default()));

        led.show().unwrap();
        assert!(led.driver().displayed().iter().all(|p| *p == RGB8::new(10, 20, 30)));
    }

    #[test]
    fn test_set_pixel_bounds() {
        let mut led = strip(4);
        assert!(led.set_pixel(3, RGB8::new(1, 1, 1)));
        assert!(!led.set_pixel(4, RGB8::new(1, 1, 1)));
        assert_eq!(led.pixels()[3], RGB8::new(1, 1, 1));
    }

    #[test]
    fn test_brightness_applies_on_next_show_only() {
        let mut led = strip(2);
        led.fill(RGB8::new(200, 200, 200));
        led.show().unwrap();

        led.set_brightness(0);
        assert_eq!(led.driver().displayed()[0], RGB8::new(200, 200, 200));
        assert_eq!(led.pixels()[0], RGB8::new(200, 200, 200));

        led.show().unwrap();
        assert_eq!(led.driver().displayed()[0], RGB8::default());
    }

    #[test]
    fn test_clear_keeps_display() {
        let mut led = strip(3);
        led.fill(RGB8::new(5, 5, 5));
        led.show().unwrap();
        led.clear();
        assert!(led.pixels().iter().all(|p| *p == RGB8::default()));
        assert!(led.driver().displayed().iter().all(|p| *p == RGB8::new(5, 5, 5)));
    }
}
