// HeartTrack - MAX30105 Optical Sensor Driver
//
// Register-level driver over I2C. Runs the part in SpO2 mode (red + IR),
// drains the on-chip FIFO into a local queue on every poll, and serves samples
// from that queue through `SampleSource`.

use std::thread;
use std::time::Duration;

use esp_idf_hal::i2c::I2cDriver;

use crate::acquire::SampleSource;
use crate::config::*;
use crate::events::Sample;
use crate::fifo::{pending_samples, SampleQueue, FIFO_DEPTH};

// MAX30105 register addresses
const REG_FIFO_WR_PTR: u8 = 0x04;
const REG_FIFO_OVF_COUNTER: u8 = 0x05;
const REG_FIFO_RD_PTR: u8 = 0x06;
const REG_FIFO_DATA: u8 = 0x07;
const REG_FIFO_CONFIG: u8 = 0x08;
const REG_MODE_CONFIG: u8 = 0x09;
const REG_PARTICLE_CONFIG: u8 = 0x0A;
const REG_LED1_PULSE_AMP: u8 = 0x0C; // red
const REG_LED2_PULSE_AMP: u8 = 0x0D; // IR
const REG_LED3_PULSE_AMP: u8 = 0x0E; // green
const REG_PART_ID: u8 = 0xFF;
const PART_ID_EXPECTED: u8 = 0x15;

const MODE_RESET: u8 = 0x40;
const MODE_SPO2: u8 = 0x03; // red + IR
const FIFO_ROLLOVER: u8 = 0x10;
const ADC_RANGE_4096: u8 = 0x20;
const PULSE_WIDTH_411: u8 = 0x03;

const BYTES_PER_SAMPLE: usize = 6; // 3 bytes red + 3 bytes IR
const SAMPLE_MASK: u32 = 0x3FFFF;  // 18-bit ADC
const LOCAL_QUEUE_DEPTH: usize = 2 * FIFO_DEPTH;

const RESET_POLL_MS: u64 = 1;
const RESET_TIMEOUT_MS: u64 = 100;

pub struct Max30105<'d> {
    i2c: I2cDriver<'d>,
    queue: SampleQueue,
}

impl<'d> Max30105<'d> {
    /// Probe, reset and configure the sensor.
    pub fn open(i2c: I2cDriver<'d>) -> anyhow::Result<Self> {
        let mut sensor = Self {
            i2c,
            queue: SampleQueue::new(LOCAL_QUEUE_DEPTH),
        };
        sensor.init()?;
        Ok(sensor)
    }

    /// 4x averaging, 100 Hz, 411 us pulses, 4096 nA full scale.
    fn init(&mut self) -> anyhow::Result<()> {
        let part_id = self.read_reg(REG_PART_ID)?;
        if part_id != PART_ID_EXPECTED {
            anyhow::bail!("unexpected part id 0x{:02X}", part_id);
        }

        self.soft_reset()?;

        let sample_average = match SENSOR_SAMPLE_AVERAGE {
            1 => 0b000,
            2 => 0b001,
            4 => 0b010,
            8 => 0b011,
            16 => 0b100,
            _ => 0b101, // 32
        };
        self.write_reg(REG_FIFO_CONFIG, (sample_average << 5) | FIFO_ROLLOVER)?;
        self.write_reg(REG_MODE_CONFIG, MODE_SPO2)?;

        let sample_rate = match SENSOR_SAMPLE_RATE_HZ {
            50 => 0b000,
            100 => 0b001,
            200 => 0b010,
            400 => 0b011,
            800 => 0b100,
            1000 => 0b101,
            1600 => 0b110,
            _ => 0b111, // 3200
        };
        self.write_reg(REG_PARTICLE_CONFIG, ADC_RANGE_4096 | (sample_rate << 2) | PULSE_WIDTH_411)?;

        self.write_reg(REG_LED1_PULSE_AMP, LED_AMPLITUDE_RED)?;
        self.write_reg(REG_LED2_PULSE_AMP, LED_AMPLITUDE_IR)?;
        self.write_reg(REG_LED3_PULSE_AMP, LED_AMPLITUDE_GREEN)?;

        self.clear_fifo()?;

        log::info!(
            "MAX30105 initialised (SpO2 mode, {} Hz / {}x avg, red 0x{:02X}, IR 0x{:02X})",
            SENSOR_SAMPLE_RATE_HZ,
            SENSOR_SAMPLE_AVERAGE,
            LED_AMPLITUDE_RED,
            LED_AMPLITUDE_IR
        );
        Ok(())
    }

    fn soft_reset(&mut self) -> anyhow::Result<()> {
        self.write_reg(REG_MODE_CONFIG, MODE_RESET)?;

        // The reset bit self-clears once the part is ready.
        let mut waited = 0;
        while waited < RESET_TIMEOUT_MS {
            if self.read_reg(REG_MODE_CONFIG)? & MODE_RESET == 0 {
                return Ok(());
            }
            thread::sleep(Duration::from_millis(RESET_POLL_MS));
            waited += RESET_POLL_MS;
        }
        anyhow::bail!("reset did not complete within {} ms", RESET_TIMEOUT_MS)
    }

    fn clear_fifo(&mut self) -> anyhow::Result<()> {
        self.write_reg(REG_FIFO_WR_PTR, 0)?;
        self.write_reg(REG_FIFO_OVF_COUNTER, 0)?;
        self.write_reg(REG_FIFO_RD_PTR, 0)?;
        self.queue.clear();
        Ok(())
    }

    /// Move every sample waiting in the chip FIFO into the local queue.
    /// Returns the number of new samples.
    pub fn check(&mut self) -> anyhow::Result<usize> {
        let write_ptr = self.read_reg(REG_FIFO_WR_PTR)?;
        let read_ptr = self.read_reg(REG_FIFO_RD_PTR)?;
        let overflow = self.read_reg(REG_FIFO_OVF_COUNTER)?;
        if overflow > 0 {
            log::debug!("MAX30105 FIFO overflowed, {} samples lost", overflow);
        }
        let pending = pending_samples(write_ptr, read_ptr, overflow);
        if pending == 0 {
            return Ok(0);
        }

        let mut raw = [0u8; FIFO_DEPTH * BYTES_PER_SAMPLE];
        let raw = &mut raw[..pending * BYTES_PER_SAMPLE];
        self.i2c
            .write_read(I2C_ADDR_MAX30105, &[REG_FIFO_DATA], raw, I2C_TIMEOUT_TICKS)?;

        for chunk in raw.chunks_exact(BYTES_PER_SAMPLE) {
            let red = u32::from_be_bytes([0, chunk[0], chunk[1], chunk[2]]) & SAMPLE_MASK;
            let ir = u32::from_be_bytes([0, chunk[3], chunk[4], chunk[5]]) & SAMPLE_MASK;
            self.queue.push(Sample::new(ir, red));
        }
        Ok(pending)
    }

    fn read_reg(&mut self, reg: u8) -> anyhow::Result<u8> {
        let mut buf = [0u8; 1];
        self.i2c
            .write_read(I2C_ADDR_MAX30105, &[reg], &mut buf, I2C_TIMEOUT_TICKS)?;
        Ok(buf[0])
    }

    fn write_reg(&mut self, reg: u8, value: u8) -> anyhow::Result<()> {
        self.i2c.write(I2C_ADDR_MAX30105, &[reg, value], I2C_TIMEOUT_TICKS)?;
        Ok(())
    }
}

impl SampleSource for Max30105<'_> {
    fn poll(&mut self) -> bool {
        if let Err(e) = self.check() {
            log::warn!("MAX30105 FIFO read error: {}", e);
        }
        !self.queue.is_empty()
    }

    fn current_ir(&self) -> u32 {
        self.queue.front().map_or(0, |s| s.ir)
    }

    fn current_red(&self) -> u32 {
        self.queue.front().map_or(0, |s| s.red)
    }

    fn advance(&mut self) {
        self.queue.pop();
    }

    fn skip_stale(&mut self) {
        if let Err(e) = self.check() {
            log::warn!("MAX30105 FIFO read error: {}", e);
        }
        self.queue.keep_latest();
    }
}
