//! VEML7700 ambient light sensor on a blocking I2C bus.
//!
//! The `veml6030` driver speaks the same register protocol as the VEML7700.
//! The bus owns the I2C peripheral while no sensor handle is open, so a
//! failed configuration or a release always hands the peripheral back.
use embedded_hal::blocking::i2c::{Write, WriteRead};
use veml6030::{Gain, IntegrationTime, SlaveAddr, Veml6030};

use crate::{errors::Error, sensor::SensorBus};

/// Sensor settings applied on every (re)open.
#[derive(Debug, Clone, Copy)]
pub struct SensorSettings {
    pub gain: Gain,
    pub integration_time: IntegrationTime,
}

impl Default for SensorSettings {
    /// Long integration and high gain for dark sky measurements.
    fn default() -> Self {
        Self {
            gain: Gain::Two,
            integration_time: IntegrationTime::Ms800,
        }
    }
}

pub struct VemlBus<I2C> {
    i2c: Option<I2C>,
    settings: SensorSettings,
}

impl<I2C> VemlBus<I2C> {
    pub fn new(i2c: I2C, settings: SensorSettings) -> Self {
        Self {
            i2c: Some(i2c),
            settings,
        }
    }
}

impl<I2C, E> VemlBus<I2C>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
{
    fn configure(&self, sensor: &mut Veml6030<I2C>) -> Result<(), Error> {
        sensor
            .set_gain(self.settings.gain)
            .map_err(|_| Error::VemlGainSetFailed)?;
        sensor
            .set_integration_time(self.settings.integration_time)
            .map_err(|_| Error::VemlIntegrationTimeSetFailed)?;
        sensor.enable().map_err(|_| Error::VemlEnableFailed)
    }
}

impl<I2C, E> SensorBus for VemlBus<I2C>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
{
    type Device = Veml6030<I2C>;

    fn open(&mut self) -> Result<Self::Device, Error> {
        let i2c = self.i2c.take().ok_or(Error::VemlBusInUse)?;
        let mut sensor = Veml6030::new(i2c, SlaveAddr::default());
        if let Err(e) = self.configure(&mut sensor) {
            self.i2c = Some(sensor.destroy());
            return Err(e);
        }
        Ok(sensor)
    }

    fn transact(&mut self, device: &mut Self::Device) -> Result<f32, Error> {
        device.read_lux().map_err(|_| Error::VemlReadFailed)
    }

    fn release(&mut self, mut device: Self::Device) {
        // Best effort, the sensor may be the reason we are reinitialising
        device.disable().ok();
        self.i2c = Some(device.destroy());
    }
}
