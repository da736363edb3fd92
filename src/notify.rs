// HeartTrack - Visual Feedback & Result Publishing
//
// The scheduler reports through a `Notifier`. `StatusNotifier` is the one the
// firmware uses: it plays blink patterns on the RGB status LED and publishes
// each successful measurement as a JSON record.

use crate::config::*;
use crate::events::MeasurementResult;

// ---------------------------------------------------------------------------
// Notifier (what the scheduler calls)
// ---------------------------------------------------------------------------
pub trait Notifier {
    /// One prompt tick while waiting for a finger.
    fn on_prompt_tick(&mut self);

    /// A full window was measured. Publishes even when flags are invalid.
    fn on_success(&mut self, result: &MeasurementResult);

    /// No finger within the prompt window. Log-only by default.
    fn on_timeout(&mut self) {}

    /// Finger was detected but the sensor stalled mid-window.
    fn on_acquisition_fault(&mut self) {}

    /// Sensor did not initialise. Called repeatedly while halted.
    fn on_fault(&mut self);
}

// ---------------------------------------------------------------------------
// Status LED
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const OFF: Rgb = Rgb::new(0, 0, 0);
    pub const BLUE: Rgb = Rgb::new(0, 0, 255);
    pub const GREEN: Rgb = Rgb::new(0, 255, 0);
    pub const PURPLE: Rgb = Rgb::new(255, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// `repeats` x (`color` for `on_ms`, then dark for `off_ms`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlinkPattern {
    pub color: Rgb,
    pub on_ms: u64,
    pub off_ms: u64,
    pub repeats: u8,
}

impl BlinkPattern {
    pub const PROMPT: BlinkPattern = BlinkPattern {
        color: Rgb::BLUE,
        on_ms: PROMPT_BLINK_ON_MS,
        off_ms: PROMPT_BLINK_OFF_MS,
        repeats: 1,
    };

    pub const SUCCESS: BlinkPattern = BlinkPattern {
        color: Rgb::GREEN,
        on_ms: SUCCESS_BLINK_MS,
        off_ms: SUCCESS_BLINK_MS,
        repeats: SUCCESS_BLINK_COUNT,
    };

    pub const FAULT: BlinkPattern = BlinkPattern {
        color: Rgb::PURPLE,
        on_ms: FAULT_BLINK_MS,
        off_ms: FAULT_BLINK_MS,
        repeats: 1,
    };

    pub const STALL: BlinkPattern = BlinkPattern {
        color: Rgb::PURPLE,
        on_ms: STALL_BLINK_MS,
        off_ms: STALL_BLINK_MS,
        repeats: STALL_BLINK_COUNT,
    };

    pub fn duration_ms(&self) -> u64 {
        (self.on_ms + self.off_ms) * u64::from(self.repeats)
    }
}

/// Something that can show a blink pattern. Blocks until it has played.
pub trait Indicator {
    fn play(&mut self, pattern: &BlinkPattern);
}

// ---------------------------------------------------------------------------
// Publishing
// ---------------------------------------------------------------------------
pub trait Publisher {
    fn publish(&mut self, event: &str, payload: &str) -> anyhow::Result<()>;
}

/// Writes publish events to the log; a serial bridge forwards them upstream.
#[derive(Debug, Default)]
pub struct LogPublisher;

impl Publisher for LogPublisher {
    fn publish(&mut self, event: &str, payload: &str) -> anyhow::Result<()> {
        log::info!("publish {} {}", event, payload);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// StatusNotifier
// ---------------------------------------------------------------------------
pub struct StatusNotifier<I, P> {
    indicator: I,
    publisher: P,
}

impl<I: Indicator, P: Publisher> StatusNotifier<I, P> {
    pub fn new(indicator: I, publisher: P) -> Self {
        Self { indicator, publisher }
    }

    pub fn indicator(&self) -> &I {
        &self.indicator
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    fn publish(&mut self, result: &MeasurementResult) -> anyhow::Result<()> {
        let payload = result.publication().to_payload()?;
        self.publisher.publish(PUBLISH_EVENT, &payload)
    }
}

impl<I: Indicator, P: Publisher> Notifier for StatusNotifier<I, P> {
    fn on_prompt_tick(&mut self) {
        self.indicator.play(&BlinkPattern::PROMPT);
    }

    fn on_success(&mut self, result: &MeasurementResult) {
        // A failed publish loses this one reading, nothing more.
        if let Err(e) = self.publish(result) {
            log::error!("Publish failed: {:#}", e);
        }
        self.indicator.play(&BlinkPattern::SUCCESS);
    }

    fn on_acquisition_fault(&mut self) {
        self.indicator.play(&BlinkPattern::STALL);
    }

    fn on_fault(&mut self) {
        self.indicator.play(&BlinkPattern::FAULT);
    }
}
