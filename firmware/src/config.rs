//! Static meter configuration.
//!
//! The configuration is a plain value handed to the control loop at startup.
//! Nothing in here is global, so several simulated meters can coexist.

use core::fmt;

use crate::bortle::ThresholdTable;

/// Largest smoothing window the firmware is compiled for.
pub const WINDOW_CAPACITY: usize = 16;

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum ConfigError {
    WindowSize,
    CycleInterval,
    RetryLimit,
    EmaAlpha,
    TableLength,
    BoundNotFinite,
    BoundsNotIncreasing,
    TierOutOfOrder,
}

impl ConfigError {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WindowSize => "smoothing window size out of range",
            Self::CycleInterval => "cycle interval must be positive",
            Self::RetryLimit => "retry limit must be at least 1",
            Self::EmaAlpha => "EMA weight must be in (0, 1]",
            Self::TableLength => "threshold table must cover tiers 1 to 8",
            Self::BoundNotFinite => "threshold bounds must be finite and non-negative",
            Self::BoundsNotIncreasing => "threshold bounds must be strictly increasing",
            Self::TierOutOfOrder => "threshold tiers must run from 1 to 8 in order",
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeterConfig {
    /// Number of samples in the moving average
    pub smoothing_window_size: usize,
    /// Sleep between the end of one cycle and the start of the next
    pub cycle_interval_ms: u32,
    /// Read attempts per cycle before the sensor is reinitialised
    pub retry_limit: u8,
    /// Pause between two failed read attempts
    pub retry_backoff_ms: u32,
    /// Weight of the newest sample in the exponential moving average
    pub ema_alpha: f32,
    pub thresholds: ThresholdTable,
}

impl MeterConfig {
    /// Check all ranges. `capacity` is the compiled smoothing ring size.
    pub fn validate(&self, capacity: usize) -> Result<(), ConfigError> {
        if self.smoothing_window_size == 0 || self.smoothing_window_size > capacity {
            return Err(ConfigError::WindowSize);
        }
        if self.cycle_interval_ms == 0 {
            return Err(ConfigError::CycleInterval);
        }
        if self.retry_limit == 0 {
            return Err(ConfigError::RetryLimit);
        }
        if !(self.ema_alpha > 0.0 && self.ema_alpha <= 1.0) {
            return Err(ConfigError::EmaAlpha);
        }
        Ok(())
    }
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            smoothing_window_size: 5,
            cycle_interval_ms: 1000,
            retry_limit: 5,
            retry_backoff_ms: 50,
            ema_alpha: 0.3,
            thresholds: ThresholdTable::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert_eq!(MeterConfig::default().validate(WINDOW_CAPACITY), Ok(()));
    }

    #[test]
    fn test_window_size_range() {
        let mut config = MeterConfig {
            smoothing_window_size: 0,
            ..MeterConfig::default()
        };
        assert_eq!(config.validate(8), Err(ConfigError::WindowSize));
        config.smoothing_window_size = 9;
        assert_eq!(config.validate(8), Err(ConfigError::WindowSize));
        config.smoothing_window_size = 8;
        assert_eq!(config.validate(8), Ok(()));
    }

    #[test]
    fn test_invalid_fields() {
        let config = MeterConfig {
            cycle_interval_ms: 0,
            ..MeterConfig::default()
        };
        assert_eq!(config.validate(8), Err(ConfigError::CycleInterval));

        let config = MeterConfig {
            retry_limit: 0,
            ..MeterConfig::default()
        };
        assert_eq!(config.validate(8), Err(ConfigError::RetryLimit));

        let config = MeterConfig {
            ema_alpha: 0.0,
            ..MeterConfig::default()
        };
        assert_eq!(config.validate(8), Err(ConfigError::EmaAlpha));

        let config = MeterConfig {
            ema_alpha: f32::NAN,
            ..MeterConfig::default()
        };
        assert_eq!(config.validate(8), Err(ConfigError::EmaAlpha));
    }
}
