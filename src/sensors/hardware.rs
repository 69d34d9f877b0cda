//! GPIO-backed sensors for Raspberry Pi deployments
//!
//! Soil moisture is a plain digital input (low = moisture present). The
//! DHT11 speaks its single-wire protocol on one GPIO pin: host start pulse,
//! sensor ack, then 40 data bits where the high-pulse width encodes the bit.

use super::{SensorReader, SensorSnapshot, SoilState};
use crate::error::{Error, Result};
use rppal::gpio::{Gpio, InputPin, IoPin, Level, Mode};
use std::thread;
use std::time::{Duration, Instant};

/// Upper bound on any single DHT11 pulse. Protocol pulses are <= 80us; a
/// stuck line shows up as a timeout rather than a hang.
const PULSE_TIMEOUT: Duration = Duration::from_millis(2);

/// High pulses longer than this are a 1 bit (nominal: 26-28us = 0, 70us = 1)
const ONE_BIT_THRESHOLD: Duration = Duration::from_micros(48);

/// GPIO sensor reader, handles held for the process lifetime
pub struct HardwareSensors {
    soil: InputPin,
    dht: IoPin,
}

impl HardwareSensors {
    pub fn new(soil_pin: u8, dht_pin: u8) -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| Error::HardwareUnavailable(e.to_string()))?;

        let soil = gpio
            .get(soil_pin)
            .map_err(|e| Error::HardwareUnavailable(format!("soil pin {}: {}", soil_pin, e)))?
            .into_input_pullup();

        let dht = gpio
            .get(dht_pin)
            .map_err(|e| Error::HardwareUnavailable(format!("DHT pin {}: {}", dht_pin, e)))?
            .into_io(Mode::Input);

        tracing::info!(
            soil_pin = soil_pin,
            dht_pin = dht_pin,
            "GPIO sensors initialized"
        );

        Ok(Self { soil, dht })
    }

    fn read_soil(&self) -> SoilState {
        match self.soil.read() {
            Level::Low => SoilState::Moisture,
            Level::High => SoilState::Dryness,
        }
    }

    /// One DHT11 exchange, returning (temperature, humidity)
    fn read_dht(&mut self) -> Result<(f32, f32)> {
        // Host start signal: hold the line low for at least 18ms, then
        // release and hand the line to the sensor.
        self.dht.set_mode(Mode::Output);
        self.dht.set_high();
        thread::sleep(Duration::from_millis(1));
        self.dht.set_low();
        thread::sleep(Duration::from_millis(20));
        self.dht.set_high();
        self.dht.set_mode(Mode::Input);

        // Sensor ack: ~80us low, ~80us high.
        wait_for(&self.dht, Level::Low)?;
        wait_for(&self.dht, Level::High)?;
        wait_for(&self.dht, Level::Low)?;

        // 40 data bits, each a ~50us low gap followed by the width-coded
        // high pulse.
        let mut bytes = [0u8; 5];
        for bit in 0..40 {
            wait_for(&self.dht, Level::High)?;
            let high = pulse_width(&self.dht, Level::High)?;
            if high > ONE_BIT_THRESHOLD {
                bytes[bit / 8] |= 1 << (7 - bit % 8);
            }
        }

        let sum = bytes[0]
            .wrapping_add(bytes[1])
            .wrapping_add(bytes[2])
            .wrapping_add(bytes[3]);
        if sum != bytes[4] {
            return Err(Error::SensorRead("DHT11 checksum mismatch".to_string()));
        }

        let humidity = bytes[0] as f32 + bytes[1] as f32 * 0.1;
        let temperature = bytes[2] as f32 + bytes[3] as f32 * 0.1;
        Ok((temperature, humidity))
    }
}

impl SensorReader for HardwareSensors {
    fn read(&mut self) -> SensorSnapshot {
        let mut snapshot = SensorSnapshot::default();

        match self.read_dht() {
            Ok((temperature, humidity)) => {
                snapshot.temperature = Some(temperature);
                snapshot.humidity = Some(humidity);
                tracing::info!(
                    temperature = temperature,
                    humidity = humidity,
                    "DHT11 reading"
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, "DHT11 reading failed");
            }
        }

        let soil = self.read_soil();
        tracing::info!(soil = soil.as_str(), "Soil sensor reading");
        snapshot.soil_moisture = Some(soil);

        snapshot
    }

    fn mode(&self) -> &'static str {
        "hardware"
    }
}

/// Busy-wait until the line reaches `level`
fn wait_for(pin: &IoPin, level: Level) -> Result<()> {
    let start = Instant::now();
    while pin.read() != level {
        if start.elapsed() > PULSE_TIMEOUT {
            return Err(Error::SensorRead(format!(
                "DHT11 timed out waiting for {:?} level",
                level
            )));
        }
    }
    Ok(())
}

/// Busy-wait while the line stays at `level`, returning the dwell time
fn pulse_width(pin: &IoPin, level: Level) -> Result<Duration> {
    let start = Instant::now();
    while pin.read() == level {
        if start.elapsed() > PULSE_TIMEOUT {
            return Err(Error::SensorRead(format!(
                "DHT11 pulse stuck at {:?} level",
                level
            )));
        }
    }
    Ok(start.elapsed())
}
