// HeartTrack - Periodic SpO2 / Heart-Rate Measurement
//
// The measurement core (scheduling, presence detection, acquisition, result
// reporting) builds for any `std` target. The MAX30105 and status-LED
// drivers build only for ESP-IDF.

pub mod acquire;
pub mod clock;
pub mod config;
pub mod estimator;
pub mod events;
pub mod fifo;
pub mod notify;
pub mod presence;
pub mod scheduler;
pub mod sim;

#[cfg(target_os = "espidf")]
pub mod drivers;

pub use acquire::{AcquisitionError, Acquirer, SampleSource};
pub use clock::Clock;
pub use config::MeasurementConfig;
pub use estimator::{Estimator, MaximEstimator};
pub use events::{MeasurementResult, Outcome, Sample, SampleWindow};
pub use notify::{Notifier, StatusNotifier};
pub use presence::PresenceDetector;
pub use scheduler::{ScheduleState, Scheduler, State};
