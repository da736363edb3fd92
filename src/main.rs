// HeartTrack - Firmware Entry Point
//
// Boot sequence (ESP32-C3):
//   1. Initialise logging and validate the measurement configuration.
//   2. Bring up the RGB status LED.
//   3. Bring up the MAX30105 on I2C. If it is missing, the scheduler starts
//      halted and blinks purple forever.
//   4. Run the measurement scheduler: prompt for a finger every interval,
//      measure, publish, repeat.
//
// On a host target the same scheduler runs against a simulated sensor and a
// virtual clock, so a whole day of schedule plays out in well under a second.

use hearttrack::config::*;
use hearttrack::{Outcome, Scheduler};

// ---------------------------------------------------------------------------
// Device
// ---------------------------------------------------------------------------
#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    use std::thread;
    use std::time::Duration;

    use esp_idf_hal::gpio::{OutputPin, PinDriver};
    use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
    use esp_idf_hal::prelude::*;

    use hearttrack::clock::EspClock;
    use hearttrack::drivers::led::RgbLed;
    use hearttrack::drivers::max30105::Max30105;
    use hearttrack::notify::LogPublisher;
    use hearttrack::{MaximEstimator, MeasurementConfig, StatusNotifier};

    // Link esp-idf-sys runtime patches and initialise logging.
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();
    log::info!("HeartTrack firmware starting...");

    let config = MeasurementConfig::from_build();
    config.validate()?;

    // ---- Peripherals ------------------------------------------------------
    let peripherals = Peripherals::take()?;

    let led = RgbLed::new(
        PinDriver::output(peripherals.pins.gpio3.downgrade_output())?, // D1 - red
        PinDriver::output(peripherals.pins.gpio4.downgrade_output())?, // D2 - green
        PinDriver::output(peripherals.pins.gpio5.downgrade_output())?, // D3 - blue
    );
    let notifier = StatusNotifier::new(led, LogPublisher);

    let i2c_config = I2cConfig::new().baudrate(I2C_BAUDRATE_KHZ.kHz().into());
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio6, // D4 - SDA
        peripherals.pins.gpio7, // D5 - SCL
        &i2c_config,
    )?;
    let sensor = Max30105::open(i2c);

    // ---- Scheduler --------------------------------------------------------
    let mut scheduler = Scheduler::new(config, sensor, MaximEstimator::new(), notifier, EspClock);
    let idle_poll = Duration::from_millis(SCHEDULER_IDLE_POLL_MS);

    loop {
        match scheduler.step() {
            // Halted: the fault blink inside `step` paces this loop.
            Some(Outcome::HardwareFault) => {}
            Some(outcome) => log::info!("Cycle finished: {}", outcome.label()),
            None => {}
        }

        if scheduler.is_idle() {
            thread::sleep(idle_poll);
        }
    }
}

// ---------------------------------------------------------------------------
// Host simulation
// ---------------------------------------------------------------------------
#[cfg(not(target_os = "espidf"))]
const SIM_HEART_RATE_BPM: f64 = 72.0;
#[cfg(not(target_os = "espidf"))]
const SIM_CYCLES: usize = 3;

#[cfg(not(target_os = "espidf"))]
fn main() -> anyhow::Result<()> {
    use hearttrack::clock::ManualClock;
    use hearttrack::Clock;
    use hearttrack::sim::{MemoryPublisher, SimIndicator, SyntheticSensor};
    use hearttrack::{MaximEstimator, MeasurementConfig, StatusNotifier};

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("HeartTrack host simulation starting...");

    let config = MeasurementConfig::from_build();
    config.validate()?;

    // Finger on at boot, nobody around for the second prompt, finger back
    // for the third.
    let clock = ManualClock::new(0);
    let second_prompt_end = 2 * config.meas_interval_ms + config.prompt_timeout_ms;
    let sensor = SyntheticSensor::new(clock.clone(), SIM_HEART_RATE_BPM)
        .with_contact(1_200..config.meas_interval_ms / 2)
        .with_contact(second_prompt_end..second_prompt_end + config.meas_interval_ms);
    let notifier = StatusNotifier::new(SimIndicator::new(clock.clone()), MemoryPublisher::default());

    let mut scheduler = Scheduler::new(config, Ok(sensor), MaximEstimator::new(), notifier, clock.clone());

    let mut finished = 0;
    while finished < SIM_CYCLES {
        match scheduler.run_cycle() {
            Some(Outcome::HardwareFault) => anyhow::bail!("simulated sensor reported a hardware fault"),
            Some(outcome) => {
                finished += 1;
                log::info!("[t = {} ms] Cycle finished: {}", clock.now_ms(), outcome.label());
            }
            None => clock.advance(SCHEDULER_IDLE_POLL_MS),
        }
    }

    let published = scheduler.notifier().publisher().events().len();
    log::info!("Simulation done: {} cycles, {} results published", finished, published);
    Ok(())
}
