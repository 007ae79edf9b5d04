//! ADXL345 three-axis accelerometer over I2C.
//!
//! The driver is generic over any `embedded_hal` I2C bus. Readings are taken
//! in full-resolution mode, where one LSB is 4 mg regardless of range.

use super::{Range, Sensor};
use crate::error::SensorError;
use crate::models::{Reading, Units};
use embedded_hal::i2c::{Error as _, I2c};
use tracing::debug;

pub const DEFAULT_ADDRESS: u8 = 0x53;

const DEVICE_ID: u8 = 0xE5;

const REG_DEVID: u8 = 0x00;
const REG_BW_RATE: u8 = 0x2C;
const REG_POWER_CTL: u8 = 0x2D;
const REG_DATA_FORMAT: u8 = 0x31;
const REG_DATAX0: u8 = 0x32;

const BW_RATE_100HZ: u8 = 0x0A;
const MEASURE: u8 = 0x08;
const FULL_RES: u8 = 0x08;
const RANGE_MASK: u8 = 0x0F;

const SCALE_MULTIPLIER: f64 = 0.004;
const EARTH_GRAVITY_MS2: f64 = 9.80665;

pub struct Adxl345<I2C> {
    i2c: I2C,
    address: u8,
    units: Units,
}

impl<I2C: I2c> Adxl345<I2C> {
    pub fn new(i2c: I2C, address: u8, units: Units) -> Self {
        Self {
            i2c,
            address,
            units,
        }
    }

    /// Give the bus back.
    #[allow(dead_code)] // Only needed when a bus is shared with other devices
    pub fn release(self) -> I2C {
        self.i2c
    }

    /// Check that the device answers with the ADXL345 id.
    pub fn probe(&mut self) -> Result<(), SensorError> {
        let found = self.read_register(REG_DEVID)?;
        if found != DEVICE_ID {
            return Err(SensorError::UnexpectedDevice {
                expected: DEVICE_ID,
                found,
            });
        }
        Ok(())
    }

    /// Probe, set 100 Hz output rate, apply `range` and start measuring.
    pub fn init(&mut self, range: Range) -> Result<(), SensorError> {
        self.probe()?;
        self.write_register(REG_BW_RATE, BW_RATE_100HZ)?;
        self.apply_range(range)?;
        self.write_register(REG_POWER_CTL, MEASURE)?;
        debug!("ADXL345 at 0x{:02X} measuring at {}", self.address, range);
        Ok(())
    }

    /// Read-modify-write DATA_FORMAT so the upper control bits survive.
    fn apply_range(&mut self, range: Range) -> Result<(), SensorError> {
        let mut value = self.read_register(REG_DATA_FORMAT)?;
        value &= !RANGE_MASK;
        value |= range_flags(range) | FULL_RES;
        self.write_register(REG_DATA_FORMAT, value)
    }

    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), SensorError> {
        self.i2c
            .write(self.address, &[reg, value])
            .map_err(|e| SensorError::Io(format!("write 0x{:02X}: {:?}", reg, e.kind())))
    }

    fn read_register(&mut self, reg: u8) -> Result<u8, SensorError> {
        let mut buf = [0u8];
        self.i2c
            .write_read(self.address, &[reg], &mut buf)
            .map_err(|e| SensorError::Io(format!("read 0x{:02X}: {:?}", reg, e.kind())))?;
        Ok(buf[0])
    }

    fn convert(&self, raw: i16) -> f64 {
        let g = f64::from(raw) * SCALE_MULTIPLIER;
        let value = match self.units {
            Units::G => g,
            Units::Ms2 => g * EARTH_GRAVITY_MS2,
        };
        (value * 10_000.0).round() / 10_000.0
    }
}

fn range_flags(range: Range) -> u8 {
    match range {
        Range::G2 => 0x00,
        Range::G4 => 0x01,
        Range::G8 => 0x02,
        Range::G16 => 0x03,
    }
}

impl<I2C: I2c + Send> Sensor for Adxl345<I2C> {
    fn read(&mut self) -> Result<Reading, SensorError> {
        let mut buf = [0u8; 6];
        self.i2c
            .write_read(self.address, &[REG_DATAX0], &mut buf)
            .map_err(|e| SensorError::Io(format!("read axes: {:?}", e.kind())))?;

        let x = i16::from_le_bytes([buf[0], buf[1]]);
        let y = i16::from_le_bytes([buf[2], buf[3]]);
        let z = i16::from_le_bytes([buf[4], buf[5]]);

        Ok(Reading::new(
            self.convert(x),
            self.convert(y),
            self.convert(z),
        ))
    }

    fn set_range(&mut self, range: Range) -> Result<(), SensorError> {
        self.apply_range(range)
    }

    fn name(&self) -> &'static str {
        "ADXL345"
    }
}
