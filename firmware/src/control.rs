//! The measurement control loop.
//!
//! One cycle reads the sensor, smooths and classifies the reading and
//! updates the indicators. A failed read skips the rest of the cycle and
//! leaves the indicators at the last known classification. The loop then
//! sleeps for the configured interval and starts over.

use embedded_hal::{blocking::delay::DelayMs, digital::v2::OutputPin};

use crate::{
    bortle::{BortleTier, ThresholdTable},
    config::{MeterConfig, WINDOW_CAPACITY},
    errors::{Error, ErrorQueue, FatalInitError},
    indicators::{IndicatorState, Indicators},
    sensor::{SensorBus, SensorChannel},
    smoother::Smoother,
    states::State,
};

/// Read-only view of a single cycle, for logging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    pub cycle: u32,
    pub raw_lux: Option<f32>,
    pub smoothed_lux: Option<f32>,
    pub ema_lux: Option<f32>,
    pub tier: Option<BortleTier>,
    /// Indicator lit after this cycle, possibly retained from an earlier one
    pub indicator: Option<IndicatorState>,
    pub sensor_healthy: bool,
    pub state: State,
    /// Set when the loop state changed during this cycle
    pub state_change: Option<(State, State)>,
    /// Set when a different indicator was lit during this cycle
    pub indicator_change: Option<(Option<IndicatorState>, IndicatorState)>,
}

pub struct ControlLoop<B, P, D, const W: usize = WINDOW_CAPACITY>
where
    B: SensorBus,
{
    sensor: SensorChannel<B>,
    smoother: Smoother<W>,
    thresholds: ThresholdTable,
    indicators: Indicators<P>,
    delay: D,
    cycle_interval_ms: u32,
    state: State,
    cycle: u32,
    errors: ErrorQueue,
}

impl<B, P, D, const W: usize> ControlLoop<B, P, D, W>
where
    B: SensorBus,
    P: OutputPin,
    D: DelayMs<u32>,
{
    /// Validate the configuration and set up every component.
    pub fn start(
        config: MeterConfig,
        bus: B,
        indicators: Indicators<P>,
        delay: D,
    ) -> Result<Self, FatalInitError> {
        config.validate(W)?;
        let smoother = Smoother::new(config.smoothing_window_size, config.ema_alpha)?;
        let sensor = SensorChannel::open(bus, config.retry_limit, config.retry_backoff_ms)?;

        let mut control = Self {
            sensor,
            smoother,
            thresholds: config.thresholds,
            indicators,
            delay,
            cycle_interval_ms: config.cycle_interval_ms,
            state: State::Starting,
            cycle: 0,
            errors: ErrorQueue::new(),
        };
        control.state = State::Running;
        Ok(control)
    }

    /// Run a single cycle without the trailing sleep.
    pub fn cycle(&mut self) -> Snapshot {
        self.cycle = self.cycle.wrapping_add(1);
        let previous_state = self.state;
        let previous_indicator = self.indicators.active();

        let reading = self.sensor.read(&mut self.delay, &mut self.errors).ok();
        self.state = previous_state.after_read(reading.is_some());

        let mut snapshot = Snapshot {
            cycle: self.cycle,
            raw_lux: reading,
            smoothed_lux: None,
            ema_lux: None,
            tier: None,
            indicator: previous_indicator,
            sensor_healthy: self.sensor.is_healthy(),
            state: self.state,
            state_change: (previous_state != self.state).then_some((previous_state, self.state)),
            indicator_change: None,
        };

        if let Some(lux) = reading {
            let smoothed = self.smoother.push(lux);
            let tier = self.thresholds.classify(smoothed);
            if self.indicators.apply(tier).is_err() {
                Error::IndicatorWriteFailed.log(&mut self.errors);
            }
            let indicator = self.indicators.active();

            snapshot.smoothed_lux = Some(smoothed);
            snapshot.ema_lux = self.smoother.ema();
            snapshot.tier = Some(tier);
            snapshot.indicator = indicator;
            snapshot.indicator_change = indicator
                .filter(|&now| Some(now) != previous_indicator)
                .map(|now| (previous_indicator, now));
        }

        snapshot
    }

    /// Run a cycle, then sleep for the cycle interval.
    pub fn step(&mut self) -> Snapshot {
        let snapshot = self.cycle();
        self.delay.delay_ms(self.cycle_interval_ms);
        snapshot
    }

    /// Run forever, handing every snapshot to `observe` before sleeping.
    pub fn run<F: FnMut(&Snapshot, &mut ErrorQueue)>(&mut self, mut observe: F) -> ! {
        loop {
            let snapshot = self.cycle();
            observe(&snapshot, &mut self.errors);
            self.delay.delay_ms(self.cycle_interval_ms);
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn active_indicator(&self) -> Option<IndicatorState> {
        self.indicators.active()
    }

    pub fn sensor(&self) -> &SensorChannel<B> {
        &self.sensor
    }

    /// Take the oldest recorded driver error.
    pub fn pop_error(&mut self) -> Option<Error> {
        self.errors.dequeue()
    }
}
