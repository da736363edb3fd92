// End-to-end measurement cycles against simulated hardware and a virtual clock.

use hearttrack::clock::{Clock, ManualClock};
use hearttrack::notify::BlinkPattern;
use hearttrack::sim::{MemoryPublisher, ScriptedSource, SimIndicator, SyntheticSensor};
use hearttrack::{
    Estimator, MeasurementConfig, MeasurementResult, Outcome, Sample, SampleSource, SampleWindow,
    Scheduler, StatusNotifier,
};

/// Returns a fixed result and remembers the size of every window it saw.
struct FixedEstimator {
    result: MeasurementResult,
    windows: Vec<usize>,
}

impl FixedEstimator {
    fn new(spo2: i32, spo2_valid: bool, heart_rate: i32, heart_rate_valid: bool) -> Self {
        Self {
            result: MeasurementResult { spo2, spo2_valid, heart_rate, heart_rate_valid },
            windows: Vec::new(),
        }
    }
}

impl Estimator for FixedEstimator {
    fn estimate(&mut self, window: &SampleWindow) -> MeasurementResult {
        self.windows.push(window.len());
        self.result
    }
}

type Notify = StatusNotifier<SimIndicator, MemoryPublisher>;

fn notifier(clock: &ManualClock) -> Notify {
    StatusNotifier::new(SimIndicator::new(clock.clone()), MemoryPublisher::default())
}

fn scheduler<S: SampleSource>(
    source: S,
    estimator: FixedEstimator,
    clock: &ManualClock,
) -> Scheduler<S, FixedEstimator, Notify, ManualClock> {
    Scheduler::new(
        MeasurementConfig::default(),
        Ok(source),
        estimator,
        notifier(clock),
        clock.clone(),
    )
}

/// Two empty-handed prompt ticks, a finger at t = 1200 ms, then a window.
fn finger_at_1200ms(clock: &ManualClock) -> ScriptedSource {
    let mut samples = vec![Sample::new(1_000, 900), Sample::new(1_000, 900), Sample::new(60_000, 45_000)];
    samples.extend((0..100).map(|i| Sample::new(60_000 + i, 45_000 + i)));
    ScriptedSource::new(samples, clock.clone(), 0)
}

#[test]
fn finger_detected_measures_and_publishes() {
    let clock = ManualClock::new(0);
    let mut s = scheduler(finger_at_1200ms(&clock), FixedEstimator::new(98, true, 72, true), &clock);

    let outcome = s.run_cycle();

    assert_eq!(
        outcome,
        Some(Outcome::Success(MeasurementResult {
            spo2: 98,
            spo2_valid: true,
            heart_rate: 72,
            heart_rate_valid: true,
        }))
    );
    // Three 400 ms prompt blinks put the finger at 1200 ms; the scripted
    // window arrives instantly after that.
    assert_eq!(s.schedule().last_measurement_ms, 1_200);
    assert_eq!(s.estimator().windows, vec![100]);
    assert_eq!(
        s.notifier().publisher().events(),
        &[("HeartTrack".to_owned(), r#"{"spo2":98,"heartRate":72}"#.to_owned())]
    );
    assert_eq!(s.source().map(|src| src.remaining()), Some(0));

    let played = s.notifier().indicator().played();
    assert_eq!(played.iter().filter(|p| **p == BlinkPattern::PROMPT).count(), 3);
    assert_eq!(played.last(), Some(&BlinkPattern::SUCCESS));
}

#[test]
fn no_finger_times_out_without_measuring() {
    let clock = ManualClock::new(0);
    let sensor = SyntheticSensor::new(clock.clone(), 72.0);
    let mut s = scheduler(sensor, FixedEstimator::new(98, true, 72, true), &clock);

    let outcome = s.run_cycle();

    assert_eq!(outcome, Some(Outcome::Timeout));
    assert!(s.estimator().windows.is_empty());
    assert!(s.notifier().publisher().events().is_empty());

    // The schedule restarts from the end of the prompt window.
    let last = s.schedule().last_measurement_ms;
    assert!(last >= 300_000, "last = {last}");
    assert_eq!(last, clock.now_ms());
    assert!(s
        .notifier()
        .indicator()
        .played()
        .iter()
        .all(|p| *p == BlinkPattern::PROMPT));
}

#[test]
fn invalid_estimate_is_still_a_published_success() {
    let clock = ManualClock::new(0);
    let mut s = scheduler(finger_at_1200ms(&clock), FixedEstimator::new(0, false, 0, false), &clock);

    let outcome = s.run_cycle();

    assert_eq!(
        outcome,
        Some(Outcome::Success(MeasurementResult {
            spo2: 0,
            spo2_valid: false,
            heart_rate: 0,
            heart_rate_valid: false,
        }))
    );
    assert_eq!(s.estimator().windows.len(), 1);
    assert_eq!(
        s.notifier().publisher().events(),
        &[("HeartTrack".to_owned(), r#"{"spo2":0,"heartRate":0}"#.to_owned())]
    );

    // No retry: the next cycle waits for the interval.
    assert_eq!(s.run_cycle(), None);
}

#[test]
fn sensor_init_failure_never_prompts() {
    let clock = ManualClock::new(0);
    let mut s: Scheduler<ScriptedSource, _, _, _> = Scheduler::new(
        MeasurementConfig::default(),
        Err(anyhow::anyhow!("MAX30105 not found")),
        FixedEstimator::new(98, true, 72, true),
        notifier(&clock),
        clock.clone(),
    );

    for _ in 0..5 {
        assert_eq!(s.run_cycle(), Some(Outcome::HardwareFault));
        clock.advance(30_000);
    }

    assert!(s.is_halted());
    assert!(s.source().is_none());
    assert!(s.estimator().windows.is_empty());
    let played = s.notifier().indicator().played();
    assert_eq!(played.len(), 6);
    assert!(played.iter().all(|p| *p == BlinkPattern::FAULT));
}

#[test]
fn missed_intervals_collapse_into_one_cycle() {
    let clock = ManualClock::new(0);
    let mut s = scheduler(finger_at_1200ms(&clock), FixedEstimator::new(98, true, 72, true), &clock);
    assert!(s.run_cycle().is_some());
    let last = s.schedule().last_measurement_ms;

    // Several intervals pass without the scheduler being stepped.
    clock.set(last + 5 * 30_000);
    s.step();
    assert!(matches!(s.state(), hearttrack::State::Prompting { .. }));
}

#[test]
fn synthetic_pulse_runs_through_the_real_estimator() {
    let clock = ManualClock::new(0);
    let sensor = SyntheticSensor::new(clock.clone(), 72.0).with_contact(1_000..60_000);
    let mut s = Scheduler::new(
        MeasurementConfig::default(),
        Ok(sensor),
        hearttrack::MaximEstimator::new(),
        notifier(&clock),
        clock.clone(),
    );

    let Some(Outcome::Success(result)) = s.run_cycle() else {
        panic!("expected a successful measurement");
    };
    assert_eq!(s.notifier().publisher().events().len(), 1);
    if cfg!(not(feature = "maxim-algorithm")) {
        assert!(result.is_valid(), "{result:?}");
    }
}
