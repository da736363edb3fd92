// HeartTrack - Measurement Data Types

use serde::Serialize;

// ---------------------------------------------------------------------------
// Sample (one paired optical reading from the MAX30105)
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sample {
    pub ir: u32,
    pub red: u32,
}

impl Sample {
    pub fn new(ir: u32, red: u32) -> Self {
        Self { ir, red }
    }
}

// ---------------------------------------------------------------------------
// Sample window
// ---------------------------------------------------------------------------

/// A completely filled, ordered window of samples.
///
/// Only [`WindowBuilder::finish`] creates one, so a partially filled window
/// can never reach the estimator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleWindow {
    samples: Vec<Sample>,
}

impl SampleWindow {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn ir(&self) -> impl ExactSizeIterator<Item = u32> + '_ {
        self.samples.iter().map(|s| s.ir)
    }

    pub fn red(&self) -> impl ExactSizeIterator<Item = u32> + '_ {
        self.samples.iter().map(|s| s.red)
    }
}

/// Fills a window slot by slot, strictly in order.
#[derive(Debug)]
pub struct WindowBuilder {
    capacity: usize,
    samples: Vec<Sample>,
}

impl WindowBuilder {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            samples: Vec::with_capacity(capacity),
        }
    }

    /// Record the next slot. Returns `false` once the window is already full.
    pub fn push(&mut self, sample: Sample) -> bool {
        if self.is_full() {
            return false;
        }
        self.samples.push(sample);
        true
    }

    pub fn filled(&self) -> usize {
        self.samples.len()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }

    /// Hand out the window, or `None` while slots remain empty.
    pub fn finish(self) -> Option<SampleWindow> {
        if self.is_full() {
            Some(SampleWindow { samples: self.samples })
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Estimator output
// ---------------------------------------------------------------------------

/// SpO2 / heart-rate estimate. Validity flags are advisory: an invalid
/// estimate is still reported and published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeasurementResult {
    pub spo2: i32,
    pub spo2_valid: bool,
    pub heart_rate: i32,
    pub heart_rate_valid: bool,
}

impl MeasurementResult {
    pub fn is_valid(&self) -> bool {
        self.spo2_valid && self.heart_rate_valid
    }

    pub fn publication(&self) -> Publication {
        Publication {
            spo2: self.spo2,
            heart_rate: self.heart_rate,
        }
    }
}

/// Outbound record. Field names are fixed for the downstream web service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Publication {
    pub spo2: i32,
    #[serde(rename = "heartRate")]
    pub heart_rate: i32,
}

impl Publication {
    pub fn to_payload(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

// ---------------------------------------------------------------------------
// Cycle outcome
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A full window was measured; flags inside may still be invalid.
    Success(MeasurementResult),
    /// No finger within the prompt window.
    Timeout,
    /// Finger detected but the sensor stopped delivering samples.
    AcquisitionFault,
    /// Sensor never came up; scheduling is halted.
    HardwareFault,
}

impl Outcome {
    /// Short label for log lines.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success(_)       => "success",
            Self::Timeout          => "timeout",
            Self::AcquisitionFault => "acquisition-fault",
            Self::HardwareFault    => "hardware-fault",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_refuses_partial_windows() {
        let mut builder = WindowBuilder::new(3);
        builder.push(Sample::new(1, 2));
        builder.push(Sample::new(3, 4));
        assert_eq!(builder.filled(), 2);
        assert!(builder.finish().is_none());
    }

    #[test]
    fn builder_keeps_order_and_stops_at_capacity() {
        let mut builder = WindowBuilder::new(3);
        for i in 0..3 {
            assert!(builder.push(Sample::new(i, i + 100)));
        }
        assert!(!builder.push(Sample::new(99, 99)));

        let window = builder.finish().expect("window is full");
        assert_eq!(window.len(), 3);
        assert_eq!(window.ir().collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(window.red().collect::<Vec<_>>(), vec![100, 101, 102]);
    }

    #[test]
    fn publication_uses_downstream_field_names() {
        let result = MeasurementResult {
            spo2: 98,
            spo2_valid: true,
            heart_rate: 72,
            heart_rate_valid: true,
        };
        let payload = result.publication().to_payload().unwrap();
        assert_eq!(payload, r#"{"spo2":98,"heartRate":72}"#);
    }

    #[test]
    fn invalid_flags_do_not_change_payload() {
        let result = MeasurementResult {
            spo2: -999,
            spo2_valid: false,
            heart_rate: 0,
            heart_rate_valid: false,
        };
        assert!(!result.is_valid());
        let payload = result.publication().to_payload().unwrap();
        assert_eq!(payload, r#"{"spo2":-999,"heartRate":0}"#);
    }
}
