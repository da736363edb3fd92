// HeartTrack - RGB Status LED Driver
//
// Three GPIO-driven channels. Colours are on/off per channel, which covers
// every pattern the firmware shows (blue, green, purple).

use std::thread;
use std::time::Duration;

use esp_idf_hal::gpio::{AnyOutputPin, Output, PinDriver};

use crate::notify::{BlinkPattern, Indicator, Rgb};

pub struct RgbLed<'d> {
    red: PinDriver<'d, AnyOutputPin, Output>,
    green: PinDriver<'d, AnyOutputPin, Output>,
    blue: PinDriver<'d, AnyOutputPin, Output>,
}

impl<'d> RgbLed<'d> {
    pub fn new(
        red: PinDriver<'d, AnyOutputPin, Output>,
        green: PinDriver<'d, AnyOutputPin, Output>,
        blue: PinDriver<'d, AnyOutputPin, Output>,
    ) -> Self {
        let mut led = Self { red, green, blue };
        led.show(Rgb::OFF);
        led
    }

    pub fn show(&mut self, color: Rgb) {
        set_channel(&mut self.red, color.r);
        set_channel(&mut self.green, color.g);
        set_channel(&mut self.blue, color.b);
    }
}

fn set_channel(pin: &mut PinDriver<'_, AnyOutputPin, Output>, level: u8) {
    let _ = if level > 0 { pin.set_high() } else { pin.set_low() };
}

impl Indicator for RgbLed<'_> {
    /// Blocks the calling thread for the whole pattern.
    fn play(&mut self, pattern: &BlinkPattern) {
        for _ in 0..pattern.repeats {
            self.show(pattern.color);
            thread::sleep(Duration::from_millis(pattern.on_ms));
            self.show(Rgb::OFF);
            thread::sleep(Duration::from_millis(pattern.off_ms));
        }
    }
}
