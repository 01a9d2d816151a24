//! Light sensor channel with bounded retry and reinitialisation.
//!
//! A read makes up to `retry_limit` attempts with a fixed pause in between.
//! When all of them fail, the device handle is released and reopened once,
//! followed by a single last attempt. Only then does the caller see a
//! failure. A read that starts without a handle, because the last reopen
//! failed, reopens first and gives up right away if that fails again.

use embedded_hal::blocking::delay::DelayMs;

use crate::errors::{Error, ErrorQueue, FatalInitError, SensorError};

/// Transport to a light sensor.
///
/// A bus hands out at most one device handle at a time. The handle has to
/// be given back through `release` before `open` can succeed again.
pub trait SensorBus {
    type Device;

    /// Acquire and configure the sensor.
    fn open(&mut self) -> Result<Self::Device, Error>;

    /// Perform a single measurement and return it in lux.
    fn transact(&mut self, device: &mut Self::Device) -> Result<f32, Error>;

    /// Power down the sensor and return the bus.
    fn release(&mut self, device: Self::Device);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorHealth {
    Healthy,
    /// Number of failed attempts in the current read
    Degraded(u8),
    Reinitializing,
}

pub struct SensorChannel<B: SensorBus> {
    bus: B,
    device: Option<B::Device>,
    health: SensorHealth,
    retry_limit: u8,
    backoff_ms: u32,
    reinit_count: u32,
}

impl<B: SensorBus> SensorChannel<B> {
    /// Open the sensor. Failing to do so at startup is fatal.
    pub fn open(mut bus: B, retry_limit: u8, backoff_ms: u32) -> Result<Self, FatalInitError> {
        let device = bus.open().map_err(FatalInitError::SensorOpen)?;
        Ok(Self {
            bus,
            device: Some(device),
            health: SensorHealth::Healthy,
            retry_limit: retry_limit.max(1),
            backoff_ms,
            reinit_count: 0,
        })
    }

    /// Read the current illuminance in lux.
    ///
    /// Every transport error along the way is recorded in `errors`.
    pub fn read<D: DelayMs<u32>>(
        &mut self,
        delay: &mut D,
        errors: &mut ErrorQueue,
    ) -> Result<f32, SensorError> {
        // A previous reopen failed, no point retrying without a handle
        if self.device.is_none() {
            self.reinitialize(errors);
            if self.device.is_none() {
                return Err(self.unavailable());
            }
        }

        for attempt in 1..=self.retry_limit {
            match self.attempt(errors) {
                Ok(lux) => return Ok(self.recovered(lux)),
                Err(_) => self.health = SensorHealth::Degraded(attempt),
            }
            if attempt < self.retry_limit {
                delay.delay_ms(self.backoff_ms);
            }
        }

        self.reinitialize(errors);
        match self.attempt(errors) {
            Ok(lux) => Ok(self.recovered(lux)),
            Err(_) => Err(self.unavailable()),
        }
    }

    fn unavailable(&mut self) -> SensorError {
        self.health = SensorHealth::Degraded(self.retry_limit.saturating_add(1));
        SensorError::Unavailable
    }

    fn attempt(&mut self, errors: &mut ErrorQueue) -> Result<f32, SensorError> {
        let result = match self.device.as_mut() {
            Some(device) => self.bus.transact(device),
            None => Err(Error::SensorNotOpen),
        };
        let lux = result.map_err(|e| {
            e.log(errors);
            SensorError::TransportFailure
        })?;
        if !lux.is_finite() {
            Error::InvalidReading.log(errors);
            return Err(SensorError::TransportFailure);
        }
        Ok(lux.max(0.0))
    }

    fn recovered(&mut self, lux: f32) -> f32 {
        self.health = SensorHealth::Healthy;
        lux
    }

    fn reinitialize(&mut self, errors: &mut ErrorQueue) {
        self.health = SensorHealth::Reinitializing;
        self.reinit_count = self.reinit_count.wrapping_add(1);
        if let Some(device) = self.device.take() {
            self.bus.release(device);
        }
        match self.bus.open() {
            Ok(device) => self.device = Some(device),
            Err(e) => e.log(errors),
        }
    }

    pub fn health(&self) -> SensorHealth {
        self.health
    }

    pub fn is_healthy(&self) -> bool {
        self.health == SensorHealth::Healthy
    }

    /// Number of reinitialisations since startup.
    pub fn reinit_count(&self) -> u32 {
        self.reinit_count
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }
}


#[cfg(test)]
mod tests {
    use super::fake::{Call, FakeBus, RecordingDelay};
    use super::*;

    const FAIL: Result<f32, Error> = Err(Error::VemlReadFailed);

    fn channel(bus: FakeBus) -> SensorChannel<FakeBus> {
        SensorChannel::open(bus, 3, 50).unwrap()
    }

    #[test]
    fn test_open_failure_is_fatal() {
        let mut bus = FakeBus::new([]);
        bus.open_results.push_back(Err(Error::VemlEnableFailed));
        assert_eq!(
            SensorChannel::open(bus, 3, 50).err(),
            Some(FatalInitError::SensorOpen(Error::VemlEnableFailed))
        );
    }

    #[test]
    fn test_single_read() {
        let mut channel = channel(FakeBus::new([Ok(12.5)]));
        let mut delay = RecordingDelay::default();
        let mut errors = ErrorQueue::new();
        assert_eq!(channel.read(&mut delay, &mut errors), Ok(12.5));
        assert!(channel.is_healthy());
        assert!(delay.waits.is_empty());
        assert_eq!(errors.len(), 0);
    }

    #[test]
    fn test_retry_without_reinit() {
        let mut channel = channel(FakeBus::new([FAIL, FAIL, Ok(3.0)]));
        let mut delay = RecordingDelay::default();
        let mut errors = ErrorQueue::new();
        assert_eq!(channel.read(&mut delay, &mut errors), Ok(3.0));
        assert_eq!(channel.reinit_count(), 0);
        assert_eq!(delay.waits, [50, 50]);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_reinit_once_after_exhausted_retries() {
        let mut channel = channel(FakeBus::new([FAIL, FAIL, FAIL, Ok(0.2)]));
        let mut delay = RecordingDelay::default();
        let mut errors = ErrorQueue::new();
        assert_eq!(channel.read(&mut delay, &mut errors), Ok(0.2));
        assert_eq!(channel.reinit_count(), 1);
        assert_eq!(channel.health(), SensorHealth::Healthy);

        // Old handle released before the new one was opened
        assert_eq!(
            channel.bus().calls,
            [
                Call::Open,
                Call::Transact,
                Call::Transact,
                Call::Transact,
                Call::Release,
                Call::Open,
                Call::Transact,
            ]
        );
        assert_eq!(channel.bus().open_handles, 1);
    }

    #[test]
    fn test_unavailable() {
        let mut channel = channel(FakeBus::new([]));
        let mut delay = RecordingDelay::default();
        let mut errors = ErrorQueue::new();
        assert_eq!(
            channel.read(&mut delay, &mut errors),
            Err(SensorError::Unavailable)
        );
        assert_eq!(channel.reinit_count(), 1);
        assert_eq!(channel.bus().count(Call::Transact), 4);
        assert_eq!(channel.health(), SensorHealth::Degraded(4));
        assert!(!channel.is_healthy());
    }

    #[test]
    fn test_recovers_after_failed_reopen() {
        let mut bus = FakeBus::new([FAIL, FAIL, FAIL]);
        // Initial open succeeds, the reopen fails
        bus.open_results.push_back(Ok(()));
        bus.open_results.push_back(Err(Error::VemlEnableFailed));
        let mut channel = channel(bus);
        let mut delay = RecordingDelay::default();
        let mut errors = ErrorQueue::new();

        assert_eq!(
            channel.read(&mut delay, &mut errors),
            Err(SensorError::Unavailable)
        );
        assert_eq!(channel.bus().open_handles, 0);
        assert_eq!(channel.bus().count(Call::Transact), 3);

        // Next cycle: no device, so it is reopened before the first attempt
        let waits = delay.waits.len();
        channel.bus.fallback = Ok(7.0);
        assert_eq!(channel.read(&mut delay, &mut errors), Ok(7.0));
        assert_eq!(channel.reinit_count(), 2);
        assert_eq!(channel.bus().count(Call::Transact), 4);
        assert_eq!(channel.bus().count(Call::Release), 1);
        assert_eq!(delay.waits.len(), waits);
    }

    #[test]
    fn test_missing_handle_skips_retries() {
        let mut bus = FakeBus::new([FAIL, FAIL, FAIL]);
        bus.open_results.push_back(Ok(()));
        bus.open_results.push_back(Err(Error::VemlEnableFailed));
        bus.open_results.push_back(Err(Error::VemlEnableFailed));
        let mut channel = channel(bus);
        let mut delay = RecordingDelay::default();
        let mut errors = ErrorQueue::new();
        assert_eq!(
            channel.read(&mut delay, &mut errors),
            Err(SensorError::Unavailable)
        );
        assert_eq!(delay.waits, [50, 50]);

        // Reopen fails again: no transactions, no backoff sleeps
        assert_eq!(
            channel.read(&mut delay, &mut errors),
            Err(SensorError::Unavailable)
        );
        assert_eq!(channel.bus().count(Call::Transact), 3);
        assert_eq!(channel.bus().count(Call::Open), 3);
        assert_eq!(delay.waits, [50, 50]);
        assert_eq!(channel.reinit_count(), 2);
        assert_eq!(channel.health(), SensorHealth::Degraded(4));
    }

    #[test]
    fn test_invalid_readings() {
        let mut channel = channel(FakeBus::new([Ok(f32::NAN), Ok(-0.5)]));
        let mut delay = RecordingDelay::default();
        let mut errors = ErrorQueue::new();
        // NaN is a failed attempt, negative values are clamped
        assert_eq!(channel.read(&mut delay, &mut errors), Ok(0.0));
        assert_eq!(errors.dequeue(), Some(Error::InvalidReading));
    }
}
