// HeartTrack - SpO2 / Heart-Rate Estimation Interface
//
// The scheduler hands a completely filled window to an `Estimator` and gets
// back SpO2, heart rate and one validity flag per metric.
//
// Architecture (`MaximEstimator`):
//   1. STUB mode (default) - a simple ratio-of-ratios / zero-crossing
//      estimate so the firmware runs end-to-end without the vendor library.
//   2. FFI mode - enable the `maxim-algorithm` feature; build.rs compiles the
//      vendor `spo2_algorithm` C sources and this module links against them.

use crate::events::{MeasurementResult, SampleWindow};

/// Value reported by the vendor algorithm for a metric it could not compute.
pub const INVALID_READING: i32 = -999;

// ---------------------------------------------------------------------------
// Public interface
// ---------------------------------------------------------------------------

/// Opaque estimation step. Implementations must not assume anything about
/// the window beyond it being full.
pub trait Estimator {
    fn estimate(&mut self, window: &SampleWindow) -> MeasurementResult;
}

/// The production estimator: vendor algorithm when linked, stub otherwise.
#[derive(Debug, Default)]
pub struct MaximEstimator;

impl MaximEstimator {
    pub fn new() -> Self {
        Self
    }
}

impl Estimator for MaximEstimator {
    fn estimate(&mut self, window: &SampleWindow) -> MeasurementResult {
        let ir: Vec<u32> = window.ir().collect();
        let red: Vec<u32> = window.red().collect();
        run_algorithm(ir, red)
    }
}

// ---------------------------------------------------------------------------
// Back-end (swap between stub / real FFI)
// ---------------------------------------------------------------------------
#[cfg(not(feature = "maxim-algorithm"))]
fn run_algorithm(ir: Vec<u32>, red: Vec<u32>) -> MeasurementResult {
    stub_estimate(&ir, &red)
}

#[cfg(feature = "maxim-algorithm")]
fn run_algorithm(ir: Vec<u32>, red: Vec<u32>) -> MeasurementResult {
    ffi_estimate(ir, red)
}

// ---------------------------------------------------------------------------
// Stub back-end - development / testing without the vendor sources
// ---------------------------------------------------------------------------

#[cfg(not(feature = "maxim-algorithm"))]
use stub::stub_estimate;

#[cfg(not(feature = "maxim-algorithm"))]
mod stub {
    use super::*;
    use crate::config::SAMPLE_RATE_HZ;

    // Below this RMS the pulse is indistinguishable from sensor noise.
    const MIN_AC_RMS: f64 = 1.0;
    const MIN_HEART_RATE: i32 = 30;
    const MAX_HEART_RATE: i32 = 250;
    const MIN_SPO2: f64 = 70.0;
    const MAX_SPO2: f64 = 100.0;

    pub(super) fn stub_estimate(ir: &[u32], red: &[u32]) -> MeasurementResult {
        let spo2 = stub_spo2(ir, red);
        let heart_rate = stub_heart_rate(ir);

        log::debug!("STUB estimate - spo2 = {:?}, hr = {:?}", spo2, heart_rate);

        MeasurementResult {
            spo2: spo2.unwrap_or(INVALID_READING),
            spo2_valid: spo2.is_some(),
            heart_rate: heart_rate.unwrap_or(INVALID_READING),
            heart_rate_valid: heart_rate.is_some(),
        }
    }

    /// Mean (DC) and RMS deviation (AC) of one channel.
    fn dc_ac(values: &[u32]) -> Option<(f64, f64)> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let dc = values.iter().map(|&v| f64::from(v)).sum::<f64>() / n;
        let ac = (values
            .iter()
            .map(|&v| {
                let diff = f64::from(v) - dc;
                diff * diff
            })
            .sum::<f64>()
            / n)
            .sqrt();
        Some((dc, ac))
    }

    /// Empirical ratio-of-ratios calibration: SpO2 = 110 - 25 * R.
    fn stub_spo2(ir: &[u32], red: &[u32]) -> Option<i32> {
        let (dc_ir, ac_ir) = dc_ac(ir)?;
        let (dc_red, ac_red) = dc_ac(red)?;

        if dc_ir < 1.0 || dc_red < 1.0 || ac_ir < MIN_AC_RMS || ac_red < MIN_AC_RMS {
            return None;
        }

        let ratio = (ac_red / dc_red) / (ac_ir / dc_ir);
        let spo2 = 110.0 - 25.0 * ratio;
        if (MIN_SPO2..=MAX_SPO2).contains(&spo2) {
            Some(spo2.round() as i32)
        } else {
            None
        }
    }

    /// Beats per minute from the spacing of rising mean crossings. A crossing
    /// only counts after the signal has dipped half an RMS below the mean.
    pub(super) fn stub_heart_rate(ir: &[u32]) -> Option<i32> {
        let (dc, ac) = dc_ac(ir)?;
        if ac < MIN_AC_RMS {
            return None;
        }

        let low = dc - 0.5 * ac;
        let mut armed = false;
        let mut crossings = Vec::new();
        for (i, &v) in ir.iter().enumerate() {
            let v = f64::from(v);
            if v < low {
                armed = true;
            } else if armed && v >= dc {
                crossings.push(i);
                armed = false;
            }
        }

        let (&first, &last) = (crossings.first()?, crossings.last()?);
        if last == first {
            return None;
        }

        let beats = (crossings.len() - 1) as f64;
        let span_s = (last - first) as f64 / f64::from(SAMPLE_RATE_HZ);
        let bpm = (60.0 * beats / span_s).round() as i32;
        (MIN_HEART_RATE..=MAX_HEART_RATE).contains(&bpm).then_some(bpm)
    }
}

// ---------------------------------------------------------------------------
// Real FFI back-end - calls the compiled vendor algorithm
// ---------------------------------------------------------------------------
#[cfg(feature = "maxim-algorithm")]
mod ffi {
    extern "C" {
        pub fn maxim_heart_rate_and_oxygen_saturation(
            pun_ir_buffer: *mut u32,
            n_ir_buffer_length: i32,
            pun_red_buffer: *mut u32,
            pn_spo2: *mut i32,
            pch_spo2_valid: *mut i8,
            pn_heart_rate: *mut i32,
            pch_hr_valid: *mut i8,
        );
    }
}

#[cfg(feature = "maxim-algorithm")]
fn ffi_estimate(mut ir: Vec<u32>, mut red: Vec<u32>) -> MeasurementResult {
    let mut spo2: i32 = INVALID_READING;
    let mut spo2_valid: i8 = 0;
    let mut heart_rate: i32 = INVALID_READING;
    let mut heart_rate_valid: i8 = 0;

    // SAFETY: both buffers hold `len` samples and outlive the call; the
    // algorithm only writes through the four output pointers.
    unsafe {
        ffi::maxim_heart_rate_and_oxygen_saturation(
            ir.as_mut_ptr(),
            ir.len() as i32,
            red.as_mut_ptr(),
            &mut spo2,
            &mut spo2_valid,
            &mut heart_rate,
            &mut heart_rate_valid,
        );
    }

    log::debug!(
        "vendor estimate - spo2 = {} ({}), hr = {} ({})",
        spo2,
        spo2_valid,
        heart_rate,
        heart_rate_valid
    );

    MeasurementResult {
        spo2,
        spo2_valid: spo2_valid != 0,
        heart_rate,
        heart_rate_valid: heart_rate_valid != 0,
    }
}
