// HeartTrack - Sample Acquisition
//
// Pulls paired (IR, red) readings out of the optical sensor: one reading at a
// time while prompting for a finger, then a full window once a finger is on.

use std::fmt;

use crate::clock::Clock;
use crate::config::MeasurementConfig;
use crate::events::{Sample, SampleWindow, WindowBuilder};
use crate::presence::PresenceDetector;

/// Polled source of optical samples.
///
/// Callers check [`poll`](SampleSource::poll) first, read both channels of the
/// current sample, then [`advance`](SampleSource::advance) past it.
pub trait SampleSource {
    /// Returns `true` when an unread sample is ready.
    fn poll(&mut self) -> bool;

    fn current_ir(&self) -> u32;

    fn current_red(&self) -> u32;

    /// Drop the current sample.
    fn advance(&mut self);

    /// Drop every unread sample except the newest, so the next read reflects
    /// the sensor as it is now. Sources that never build a backlog keep the
    /// default.
    fn skip_stale(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionError {
    /// No new sample arrived before the acquisition deadline.
    Stalled { collected: usize, expected: usize },
}

impl fmt::Display for AcquisitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stalled { collected, expected } => {
                write!(f, "sensor stalled after {collected} of {expected} samples")
            }
        }
    }
}

impl std::error::Error for AcquisitionError {}

#[derive(Debug, Clone, Copy)]
pub struct Acquirer {
    window_size: usize,
    timeout_ms: u64,
}

impl Acquirer {
    pub fn new(window_size: usize, timeout_ms: u64) -> Self {
        Self { window_size, timeout_ms }
    }

    pub fn from_config(config: &MeasurementConfig) -> Self {
        Self::new(config.window_size, config.acquisition_timeout_ms)
    }

    /// Check once for a finger against the newest reading. Consumes at most
    /// one sample after skipping any backlog; returns `false` when no sample
    /// was ready.
    pub fn probe<S: SampleSource>(&self, source: &mut S, detector: &PresenceDetector) -> bool {
        source.skip_stale();
        if !source.poll() {
            return false;
        }
        let ir = source.current_ir();
        source.advance();
        detector.is_present(ir)
    }

    /// Fill a window of exactly `window_size` samples, in arrival order.
    ///
    /// Spins on the source until each sample is ready. If the source goes
    /// quiet and the acquisition deadline passes, the partial window is
    /// discarded and [`AcquisitionError::Stalled`] is returned.
    pub fn acquire_window<S, C>(&self, source: &mut S, clock: &C) -> Result<SampleWindow, AcquisitionError>
    where
        S: SampleSource,
        C: Clock,
    {
        let started = clock.now_ms();
        let mut builder = WindowBuilder::new(self.window_size);

        while !builder.is_full() {
            while !source.poll() {
                if clock.now_ms().wrapping_sub(started) >= self.timeout_ms {
                    return Err(self.stalled(builder.filled()));
                }
            }

            let sample = Sample::new(source.current_ir(), source.current_red());
            source.advance();
            builder.push(sample);
        }

        let collected = builder.filled();
        builder.finish().ok_or_else(|| self.stalled(collected))
    }

    fn stalled(&self, collected: usize) -> AcquisitionError {
        AcquisitionError::Stalled {
            collected,
            expected: self.window_size,
        }
    }
}
