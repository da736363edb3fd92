// HeartTrack - Hardware & Measurement Configuration
// Target: Seeed Studio Xiao ESP32-C3 (RISC-V) + MAX30105 breakout

// ---------------------------------------------------------------------------
// I2C Bus
// ---------------------------------------------------------------------------
pub const I2C_ADDR_MAX30105: u8 = 0x57;
pub const I2C_BAUDRATE_KHZ: u32 = 400; // I2C_SPEED_FAST
pub const I2C_TIMEOUT_TICKS: u32 = 1000; // FreeRTOS ticks

// ---------------------------------------------------------------------------
// MAX30105 LED drive (pulse amplitude, ~0.2 mA per LSB)
// ---------------------------------------------------------------------------
pub const LED_AMPLITUDE_RED: u8 = 0x0A;   // low red brightness
pub const LED_AMPLITUDE_IR: u8 = 0x1F;    // ~6.4 mA
pub const LED_AMPLITUDE_GREEN: u8 = 0x00; // green unused

// ---------------------------------------------------------------------------
// MAX30105 sampling: 100 Hz with 4x FIFO averaging -> 25 samples/s out
// ---------------------------------------------------------------------------
pub const SENSOR_SAMPLE_RATE_HZ: u32 = 100;
pub const SENSOR_SAMPLE_AVERAGE: u32 = 4;
pub const SAMPLE_RATE_HZ: u32 = SENSOR_SAMPLE_RATE_HZ / SENSOR_SAMPLE_AVERAGE;
pub const SAMPLE_PERIOD_MS: u64 = 1000 / SAMPLE_RATE_HZ as u64; // 40 ms

// ---------------------------------------------------------------------------
// Status LED blink timings (milliseconds)
// ---------------------------------------------------------------------------
pub const PROMPT_BLINK_ON_MS: u64 = 200;
pub const PROMPT_BLINK_OFF_MS: u64 = 200;
pub const SUCCESS_BLINK_MS: u64 = 200;
pub const SUCCESS_BLINK_COUNT: u8 = 3;
pub const FAULT_BLINK_MS: u64 = 300;
pub const STALL_BLINK_MS: u64 = 100;
pub const STALL_BLINK_COUNT: u8 = 2;

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------
pub const SCHEDULER_IDLE_POLL_MS: u64 = 50; // sleep between due-checks while idle
pub const PUBLISH_EVENT: &str = "HeartTrack";

// ---------------------------------------------------------------------------
// Measurement defaults
// ---------------------------------------------------------------------------
pub const WINDOW_SIZE: usize = 100;
pub const MEAS_INTERVAL_MS: u64 = 30_000;               // 30 seconds for testing
pub const MEAS_INTERVAL_PRODUCTION_MS: u64 = 1_800_000; // 30 minutes
pub const PROMPT_TIMEOUT_MS: u64 = 300_000;             // 5 minutes
pub const PRESENCE_THRESHOLD: u32 = 50_000;
pub const ACQUISITION_TIMEOUT_MS: u64 = 10_000;

/// Tunables read by the measurement core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeasurementConfig {
    /// Number of paired samples handed to the estimator.
    pub window_size: usize,
    pub meas_interval_ms: u64,
    pub prompt_timeout_ms: u64,
    /// IR intensity above which a finger counts as present.
    pub presence_threshold: u32,
    /// Upper bound on filling one window once a finger is detected.
    pub acquisition_timeout_ms: u64,
}

impl Default for MeasurementConfig {
    fn default() -> Self {
        Self {
            window_size: WINDOW_SIZE,
            meas_interval_ms: MEAS_INTERVAL_MS,
            prompt_timeout_ms: PROMPT_TIMEOUT_MS,
            presence_threshold: PRESENCE_THRESHOLD,
            acquisition_timeout_ms: ACQUISITION_TIMEOUT_MS,
        }
    }
}

impl MeasurementConfig {
    /// Field schedule: one measurement every 30 minutes.
    pub fn production() -> Self {
        Self {
            meas_interval_ms: MEAS_INTERVAL_PRODUCTION_MS,
            ..Self::default()
        }
    }

    /// Configuration selected at build time.
    pub fn from_build() -> Self {
        if cfg!(feature = "production-schedule") {
            Self::production()
        } else {
            Self::default()
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.window_size == 0 {
            anyhow::bail!("window_size must be at least 1");
        }
        if self.meas_interval_ms == 0 {
            anyhow::bail!("meas_interval_ms must be non-zero");
        }
        if self.prompt_timeout_ms == 0 {
            anyhow::bail!("prompt_timeout_ms must be non-zero");
        }
        if self.acquisition_timeout_ms == 0 {
            anyhow::bail!("acquisition_timeout_ms must be non-zero");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_the_test_schedule() {
        let config = MeasurementConfig::default();
        assert_eq!(config.window_size, 100);
        assert_eq!(config.meas_interval_ms, 30_000);
        assert_eq!(config.prompt_timeout_ms, 300_000);
        assert_eq!(config.presence_threshold, 50_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn production_only_stretches_the_interval() {
        let config = MeasurementConfig::production();
        assert_eq!(config.meas_interval_ms, 1_800_000);
        assert_eq!(
            MeasurementConfig { meas_interval_ms: MEAS_INTERVAL_MS, ..config },
            MeasurementConfig::default()
        );
    }

    #[test]
    fn validate_rejects_empty_window() {
        let config = MeasurementConfig { window_size: 0, ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_timeouts() {
        let config = MeasurementConfig { prompt_timeout_ms: 0, ..Default::default() };
        assert!(config.validate().is_err());
        let config = MeasurementConfig { acquisition_timeout_ms: 0, ..Default::default() };
        assert!(config.validate().is_err());
    }
}
