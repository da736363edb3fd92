// HeartTrack - Simulated Sensor Sources
//
// Stand-ins for the MAX30105 used by the host build and the test suite. Both
// sources move a shared `ManualClock` forward on every poll, the way real
// polling burns wall-clock time.

use std::collections::VecDeque;
use std::f64::consts::TAU;
use std::ops::Range;

use crate::acquire::SampleSource;
use crate::clock::{Clock, ManualClock};
use crate::config::SAMPLE_PERIOD_MS;
use crate::events::Sample;
use crate::notify::{BlinkPattern, Indicator, Publisher};

// ---------------------------------------------------------------------------
// Scripted source: replays a fixed list, then goes quiet
// ---------------------------------------------------------------------------
#[derive(Debug)]
pub struct ScriptedSource {
    samples: VecDeque<Sample>,
    clock: ManualClock,
    poll_cost_ms: u64,
}

impl ScriptedSource {
    pub fn new(samples: impl IntoIterator<Item = Sample>, clock: ManualClock, poll_cost_ms: u64) -> Self {
        Self {
            samples: samples.into_iter().collect(),
            clock,
            poll_cost_ms,
        }
    }

    pub fn remaining(&self) -> usize {
        self.samples.len()
    }
}

impl SampleSource for ScriptedSource {
    fn poll(&mut self) -> bool {
        self.clock.advance(self.poll_cost_ms);
        !self.samples.is_empty()
    }

    fn current_ir(&self) -> u32 {
        self.samples.front().map_or(0, |s| s.ir)
    }

    fn current_red(&self) -> u32 {
        self.samples.front().map_or(0, |s| s.red)
    }

    fn advance(&mut self) {
        self.samples.pop_front();
    }
}

// ---------------------------------------------------------------------------
// Synthetic PPG: ambient light until a finger lands, then a pulse waveform
// ---------------------------------------------------------------------------
pub const AMBIENT_IR: u32 = 2_000;
pub const AMBIENT_RED: u32 = 1_500;
const FINGER_IR_DC: f64 = 100_000.0;
const FINGER_IR_AC: f64 = 2_000.0;
const FINGER_RED_DC: f64 = 80_000.0;
const FINGER_RED_AC: f64 = 800.0;

#[derive(Debug)]
pub struct SyntheticSensor {
    clock: ManualClock,
    contacts: Vec<Range<u64>>,
    heart_rate_bpm: f64,
    current: Option<Sample>,
}

impl SyntheticSensor {
    pub fn new(clock: ManualClock, heart_rate_bpm: f64) -> Self {
        Self {
            clock,
            contacts: Vec::new(),
            heart_rate_bpm,
            current: None,
        }
    }

    /// A finger rests on the sensor for the given span of clock time.
    pub fn with_contact(mut self, span: Range<u64>) -> Self {
        self.contacts.push(span);
        self
    }

    fn finger_on(&self, t_ms: u64) -> bool {
        self.contacts.iter().any(|span| span.contains(&t_ms))
    }

    fn sample_at(&self, t_ms: u64) -> Sample {
        if !self.finger_on(t_ms) {
            return Sample::new(AMBIENT_IR, AMBIENT_RED);
        }
        let phase = TAU * self.heart_rate_bpm / 60.0 * (t_ms as f64 / 1000.0);
        let pulse = phase.sin();
        Sample::new(
            (FINGER_IR_DC + FINGER_IR_AC * pulse) as u32,
            (FINGER_RED_DC + FINGER_RED_AC * pulse) as u32,
        )
    }
}

impl SampleSource for SyntheticSensor {
    fn poll(&mut self) -> bool {
        if self.current.is_none() {
            self.clock.advance(SAMPLE_PERIOD_MS);
            self.current = Some(self.sample_at(self.clock.now_ms()));
        }
        true
    }

    fn current_ir(&self) -> u32 {
        self.current.map_or(0, |s| s.ir)
    }

    fn current_red(&self) -> u32 {
        self.current.map_or(0, |s| s.red)
    }

    fn advance(&mut self) {
        self.current = None;
    }
}

// ---------------------------------------------------------------------------
// Status LED and cloud stand-ins
// ---------------------------------------------------------------------------

/// Plays patterns by moving the clock forward for as long as they would blink.
#[derive(Debug)]
pub struct SimIndicator {
    clock: ManualClock,
    played: Vec<BlinkPattern>,
}

impl SimIndicator {
    pub fn new(clock: ManualClock) -> Self {
        Self { clock, played: Vec::new() }
    }

    pub fn played(&self) -> &[BlinkPattern] {
        &self.played
    }
}

impl Indicator for SimIndicator {
    fn play(&mut self, pattern: &BlinkPattern) {
        log::trace!("LED {:?} x{}", pattern.color, pattern.repeats);
        self.clock.advance(pattern.duration_ms());
        self.played.push(*pattern);
    }
}

/// Keeps every published event in memory.
#[derive(Debug, Default)]
pub struct MemoryPublisher {
    events: Vec<(String, String)>,
}

impl MemoryPublisher {
    pub fn events(&self) -> &[(String, String)] {
        &self.events
    }
}

impl Publisher for MemoryPublisher {
    fn publish(&mut self, event: &str, payload: &str) -> anyhow::Result<()> {
        log::info!("publish {} {}", event, payload);
        self.events.push((event.to_owned(), payload.to_owned()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_sensor_reports_ambient_until_finger() {
        let clock = ManualClock::new(0);
        let mut sensor = SyntheticSensor::new(clock.clone(), 72.0).with_contact(1_000..2_000);

        assert!(sensor.poll());
        assert_eq!(sensor.current_ir(), AMBIENT_IR);
        sensor.advance();

        clock.set(1_000);
        assert!(sensor.poll());
        assert!(sensor.current_ir() > 90_000);
        assert!(sensor.current_red() > 70_000);
        sensor.advance();

        clock.set(2_000);
        assert!(sensor.poll());
        assert_eq!(sensor.current_ir(), AMBIENT_IR);
    }

    #[test]
    fn poll_without_advance_keeps_the_same_sample() {
        let clock = ManualClock::new(0);
        let mut sensor = SyntheticSensor::new(clock.clone(), 72.0);
        sensor.poll();
        sensor.poll();
        assert_eq!(clock.now_ms(), SAMPLE_PERIOD_MS);
    }

    #[test]
    fn indicator_burns_pattern_time() {
        let clock = ManualClock::new(0);
        let mut led = SimIndicator::new(clock.clone());
        led.play(&BlinkPattern::PROMPT);
        led.play(&BlinkPattern::SUCCESS);
        assert_eq!(clock.now_ms(), 1_600);
        assert_eq!(led.played().len(), 2);
    }
}
