// HeartTrack - Monotonic Time Source

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Milliseconds since an arbitrary fixed origin. Must never go backwards.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// A clock that only moves when told to.
///
/// Clones share the same time, so a simulated sensor or indicator can advance
/// the clock the scheduler reads.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_ms: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now_ms.fetch_add(ms, Ordering::Relaxed);
    }

    pub fn set(&self, ms: u64) {
        self.now_ms.store(ms, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::Relaxed)
    }
}

/// Milliseconds since boot from the ESP-IDF high-resolution timer.
#[cfg(target_os = "espidf")]
#[derive(Debug, Clone, Copy, Default)]
pub struct EspClock;

#[cfg(target_os = "espidf")]
impl Clock for EspClock {
    fn now_ms(&self) -> u64 {
        // SAFETY: esp_timer is started by ESP-IDF before `main` runs.
        unsafe { (esp_idf_sys::esp_timer_get_time() / 1000) as u64 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_time() {
        let clock = ManualClock::new(5);
        let other = clock.clone();
        other.advance(10);
        assert_eq!(clock.now_ms(), 15);
        clock.set(100);
        assert_eq!(other.now_ms(), 100);
    }
}
