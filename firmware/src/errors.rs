//! Error handling.

use core::fmt;

use heapless::spsc::Queue;
use ufmt::{uDisplay, uWrite, Formatter};

use crate::config::ConfigError;

/// Capacity of the error log queue (one slot is reserved by the queue).
pub const ERROR_QUEUE_LEN: usize = 8;

/// Bounded log of recent driver errors, oldest dropped first.
pub type ErrorQueue = Queue<Error, ERROR_QUEUE_LEN>;

/// Driver level error codes
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Error {
    VemlGainSetFailed,
    VemlIntegrationTimeSetFailed,
    VemlEnableFailed,
    VemlReadFailed,
    VemlBusInUse,
    SensorNotOpen,
    InvalidReading,
    IndicatorWriteFailed,
    UfmtSerialWriteError,
}

impl Error {
    pub fn log<const N: usize>(&self, queue: &mut Queue<Self, N>) {
        match queue.enqueue(*self) {
            Ok(()) => { /* Enqueued */ }
            Err(e) => {
                // Queue full, drop the oldest value and try again
                queue.dequeue();
                queue.enqueue(e).ok();
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VemlGainSetFailed => "VEML7700: Setting gain failed",
            Self::VemlIntegrationTimeSetFailed => "VEML7700: Setting integration time failed",
            Self::VemlEnableFailed => "VEML7700: Enabling failed",
            Self::VemlReadFailed => "VEML7700: Reading lux failed",
            Self::VemlBusInUse => "VEML7700: I2C bus already in use",
            Self::SensorNotOpen => "Sensor: No open device handle",
            Self::InvalidReading => "Sensor: Reading is not a finite number",
            Self::IndicatorWriteFailed => "Indicator GPIO write error",
            Self::UfmtSerialWriteError => "Write serial log using ufmt failed",
        }
    }
}

impl uDisplay for Error {
    fn fmt<W>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        f.write_str(self.as_str())
    }
}

/// Failure modes of a single sensor read, as seen by the control loop.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum SensorError {
    /// A single bus transaction failed. Handled inside the sensor channel.
    TransportFailure,
    /// Every retry and the reinitialisation failed, the cycle is skipped.
    Unavailable,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TransportFailure => f.write_str("sensor transport failure"),
            Self::Unavailable => f.write_str("sensor unavailable"),
        }
    }
}

/// Unrecoverable setup failure. Ends the firmware.
#[derive(Debug, PartialEq, Copy, Clone)]
pub enum FatalInitError {
    InvalidConfig(ConfigError),
    SensorOpen(Error),
}

impl From<ConfigError> for FatalInitError {
    fn from(e: ConfigError) -> Self {
        Self::InvalidConfig(e)
    }
}

impl fmt::Display for FatalInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(e) => write!(f, "invalid configuration: {}", e),
            Self::SensorOpen(e) => write!(f, "cannot open light sensor: {}", e.as_str()),
        }
    }
}

impl uDisplay for FatalInitError {
    fn fmt<W>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        match self {
            Self::InvalidConfig(e) => {
                f.write_str("invalid configuration: ")?;
                f.write_str(e.as_str())
            }
            Self::SensorOpen(e) => {
                f.write_str("cannot open light sensor: ")?;
                f.write_str(e.as_str())
            }
        }
    }
}
