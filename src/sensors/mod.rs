//! Sensor reading with hardware-presence fallback
//!
//! ## Responsibilities
//!
//! - Best-effort environmental snapshot (temperature, humidity, soil moisture)
//! - Per-sensor failure isolation: a bad read leaves that field absent
//! - One-time mode selection at startup: GPIO hardware when the `raspi`
//!   feature is built in and the peripheral opens, simulation otherwise

use crate::config::AppConfig;

#[cfg(feature = "raspi")]
mod hardware;

/// Soil moisture sensor state, mapped from the digital input level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoilState {
    Moisture,
    Dryness,
}

impl SoilState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SoilState::Moisture => "Moisture",
            SoilState::Dryness => "Dryness",
        }
    }
}

/// One best-effort snapshot of the environmental sensors.
///
/// Fields are independently optional: a failure reading one sensor must not
/// prevent reporting the others.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorSnapshot {
    pub temperature: Option<f32>,
    pub humidity: Option<f32>,
    pub soil_moisture: Option<SoilState>,
}

/// Snapshot contract shared by the hardware and simulation readers.
///
/// `read` never fails; implementations catch per-sensor errors internally
/// and log them, leaving the corresponding field `None`.
pub trait SensorReader: Send {
    fn read(&mut self) -> SensorSnapshot;

    /// Operating mode label for startup logging
    fn mode(&self) -> &'static str;
}

/// Fixed placeholder values used when no sensor hardware is present
#[derive(Debug, Default)]
pub struct SimulatedSensors;

impl SimulatedSensors {
    pub fn new() -> Self {
        Self
    }
}

impl SensorReader for SimulatedSensors {
    fn read(&mut self) -> SensorSnapshot {
        SensorSnapshot {
            temperature: Some(27.5),
            humidity: Some(60.0),
            soil_moisture: Some(SoilState::Moisture),
        }
    }

    fn mode(&self) -> &'static str {
        "simulation"
    }
}

/// Select the sensor reader for the lifetime of the process.
///
/// The capability check runs exactly once; the decision is never re-evaluated
/// per cycle.
pub fn init_reader(config: &AppConfig) -> Box<dyn SensorReader> {
    match try_hardware(config) {
        Ok(reader) => reader,
        Err(e) => {
            tracing::warn!(error = %e, "Sensor hardware unavailable, running in simulation mode");
            Box::new(SimulatedSensors::new())
        }
    }
}

#[cfg(feature = "raspi")]
fn try_hardware(config: &AppConfig) -> crate::Result<Box<dyn SensorReader>> {
    let sensors = hardware::HardwareSensors::new(config.soil_sensor_pin, config.dht_sensor_pin)?;
    Ok(Box::new(sensors))
}

#[cfg(not(feature = "raspi"))]
fn try_hardware(_config: &AppConfig) -> crate::Result<Box<dyn SensorReader>> {
    Err(crate::Error::HardwareUnavailable(
        "built without the raspi feature".to_string(),
    ))
}
