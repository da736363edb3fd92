// HeartTrack - Finger Presence Detection
//
// A finger on the sensor reflects far more infrared light than open air, so a
// single IR reading above a fixed threshold is enough to call it "present".

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceDetector {
    threshold: u32,
}

impl PresenceDetector {
    pub fn new(threshold: u32) -> Self {
        Self { threshold }
    }

    /// Strictly greater than the threshold; a reading equal to it is absent.
    pub fn is_present(&self, ir: u32) -> bool {
        ir > self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_is_exclusive() {
        let detector = PresenceDetector::new(50_000);
        assert!(!detector.is_present(50_000));
        assert!(detector.is_present(50_001));
    }

    #[test]
    fn extremes() {
        let detector = PresenceDetector::new(50_000);
        assert!(!detector.is_present(0));
        assert!(detector.is_present(u32::MAX));

        // Nothing can exceed u32::MAX.
        let never = PresenceDetector::new(u32::MAX);
        assert!(!never.is_present(u32::MAX));
    }

    #[test]
    fn threshold_is_configurable() {
        let detector = PresenceDetector::new(1_000);
        assert!(detector.is_present(1_001));
        assert!(!PresenceDetector::new(2_000).is_present(1_001));
    }
}
