// HeartTrack - Measurement Scheduler
//
// Single-threaded state machine driving one measurement cycle at a time:
//
//   Idle --(interval elapsed)--> Prompting --(finger)--> Acquiring
//     ^                              |                       |
//     |                         (prompt timeout)             |
//     +-------- Reporting <----------+-----------------------+
//
// HardwareFault is entered only when the sensor fails to initialise, and is
// never left again.

use crate::acquire::{Acquirer, SampleSource};
use crate::clock::Clock;
use crate::config::MeasurementConfig;
use crate::estimator::Estimator;
use crate::events::Outcome;
use crate::notify::Notifier;
use crate::presence::PresenceDetector;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Prompting { started_ms: u64 },
    Acquiring,
    /// Outcome decided at `at_ms`, not yet dispatched.
    Reporting { outcome: Outcome, at_ms: u64 },
    HardwareFault,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleState {
    pub last_measurement_ms: u64,
    pub now_ms: u64,
}

impl ScheduleState {
    /// Back-date the last measurement by one interval so the first cycle is
    /// due straight after boot. Wrapping keeps this valid right at t = 0.
    pub fn first_due_at(now_ms: u64, interval_ms: u64) -> Self {
        Self {
            last_measurement_ms: now_ms.wrapping_sub(interval_ms),
            now_ms,
        }
    }

    pub fn is_due(&self, interval_ms: u64) -> bool {
        self.now_ms.wrapping_sub(self.last_measurement_ms) >= interval_ms
    }
}

pub struct Scheduler<S, E, N, C> {
    config: MeasurementConfig,
    detector: PresenceDetector,
    acquirer: Acquirer,
    source: Option<S>,
    estimator: E,
    notifier: N,
    clock: C,
    schedule: ScheduleState,
    state: State,
}

impl<S, E, N, C> Scheduler<S, E, N, C>
where
    S: SampleSource,
    E: Estimator,
    N: Notifier,
    C: Clock,
{
    /// `source` is the result of sensor bring-up. An error puts the
    /// scheduler straight into `HardwareFault`.
    pub fn new(
        config: MeasurementConfig,
        source: anyhow::Result<S>,
        estimator: E,
        mut notifier: N,
        clock: C,
    ) -> Self {
        let now = clock.now_ms();

        let (source, state) = match source {
            Ok(source) => {
                log::info!("HeartTrack firmware ready.");
                log::info!(
                    "Device will ask for a measurement every {} ms.",
                    config.meas_interval_ms
                );
                (Some(source), State::Idle)
            }
            Err(e) => {
                log::error!("Optical sensor not found: {:#}. Check wiring and power.", e);
                notifier.on_fault();
                (None, State::HardwareFault)
            }
        };

        Self {
            config,
            detector: PresenceDetector::new(config.presence_threshold),
            acquirer: Acquirer::from_config(&config),
            source,
            estimator,
            notifier,
            clock,
            schedule: ScheduleState::first_due_at(now, config.meas_interval_ms),
            state,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn schedule(&self) -> ScheduleState {
        self.schedule
    }

    pub fn is_idle(&self) -> bool {
        self.state == State::Idle
    }

    pub fn is_halted(&self) -> bool {
        self.state == State::HardwareFault
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn estimator(&self) -> &E {
        &self.estimator
    }

    pub fn source(&self) -> Option<&S> {
        self.source.as_ref()
    }

    /// Perform one transition. Returns the outcome when a cycle finishes,
    /// and `Outcome::HardwareFault` on every step once halted.
    pub fn step(&mut self) -> Option<Outcome> {
        self.schedule.now_ms = self.clock.now_ms();

        match self.state {
            State::Idle => {
                if self.schedule.is_due(self.config.meas_interval_ms) {
                    log::info!("=== Time for a new measurement ===");
                    log::info!("Please place your finger on the sensor.");
                    self.state = State::Prompting {
                        started_ms: self.schedule.now_ms,
                    };
                }
                None
            }
            State::Prompting { started_ms } => {
                self.prompt(started_ms);
                None
            }
            State::Acquiring => {
                self.state = match self.measure() {
                    Some(outcome) => State::Reporting {
                        outcome,
                        at_ms: self.clock.now_ms(),
                    },
                    None => State::HardwareFault,
                };
                None
            }
            State::Reporting { outcome, at_ms } => {
                self.report(&outcome);
                self.schedule.last_measurement_ms = at_ms;
                self.state = State::Idle;
                Some(outcome)
            }
            State::HardwareFault => {
                self.notifier.on_fault();
                Some(Outcome::HardwareFault)
            }
        }
    }

    /// Step until a cycle produces an outcome. Returns `None` straight away
    /// if the scheduler is idle and no measurement is due.
    pub fn run_cycle(&mut self) -> Option<Outcome> {
        loop {
            if let Some(outcome) = self.step() {
                return Some(outcome);
            }
            if self.is_idle() {
                return None;
            }
        }
    }

    fn prompt(&mut self, started_ms: u64) {
        self.notifier.on_prompt_tick();

        let Some(source) = self.source.as_mut() else {
            self.state = State::HardwareFault;
            return;
        };

        if self.acquirer.probe(source, &self.detector) {
            log::info!("Finger detected. Measuring now...");
            self.state = State::Acquiring;
            return;
        }

        let now = self.clock.now_ms();
        if now.wrapping_sub(started_ms) >= self.config.prompt_timeout_ms {
            self.state = State::Reporting {
                outcome: Outcome::Timeout,
                at_ms: now,
            };
        }
    }

    /// `None` when there is no sensor to read.
    fn measure(&mut self) -> Option<Outcome> {
        let source = self.source.as_mut()?;

        let outcome = match self.acquirer.acquire_window(source, &self.clock) {
            Ok(window) => {
                let result = self.estimator.estimate(&window);
                log::info!("Result: SpO2 = {}, HR = {}", result.spo2, result.heart_rate);
                if !result.is_valid() {
                    log::warn!(
                        "Measurement marked as INVALID by algorithm (spo2_valid = {}, hr_valid = {}).",
                        result.spo2_valid,
                        result.heart_rate_valid
                    );
                }
                Outcome::Success(result)
            }
            Err(e) => {
                log::warn!("Measurement aborted: {}", e);
                Outcome::AcquisitionFault
            }
        };
        Some(outcome)
    }

    fn report(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Success(result) => self.notifier.on_success(result),
            Outcome::Timeout => {
                log::info!("Measurement timed out (no finger detected).");
                self.notifier.on_timeout();
            }
            Outcome::AcquisitionFault => self.notifier.on_acquisition_fault(),
            Outcome::HardwareFault => self.notifier.on_fault(),
        }
    }
}
