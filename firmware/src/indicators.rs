//! The three sky quality indicator LEDs.
//!
//! Exactly one indicator is lit once the first classification has been
//! applied. Before that, all of them are off.

use embedded_hal::digital::v2::OutputPin;
use ufmt::{uDisplay, uWrite, Formatter};

use crate::bortle::BortleTier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorState {
    /// Bortle 1 to 3 (green)
    Dark,
    /// Bortle 4 to 5 (yellow)
    Moderate,
    /// Bortle 6 to 9 (red)
    Bright,
}

impl IndicatorState {
    pub const ALL: [Self; 3] = [Self::Dark, Self::Moderate, Self::Bright];

    pub fn for_tier(tier: BortleTier) -> Self {
        match tier.get() {
            0..=3 => Self::Dark,
            4..=5 => Self::Moderate,
            _ => Self::Bright,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dark => "Dark",
            Self::Moderate => "Moderate",
            Self::Bright => "Bright",
        }
    }
}

impl uDisplay for IndicatorState {
    fn fmt<W>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        f.write_str(self.as_str())
    }
}

pub struct Indicators<P> {
    dark: P,
    moderate: P,
    bright: P,
    active: Option<IndicatorState>,
}

impl<P: OutputPin> Indicators<P> {
    /// The pins are expected to be low already.
    pub fn new(dark: P, moderate: P, bright: P) -> Self {
        Self {
            dark,
            moderate,
            bright,
            active: None,
        }
    }

    pub fn active(&self) -> Option<IndicatorState> {
        self.active
    }

    /// Show the indicator for `tier`.
    ///
    /// Returns `true` if the pins were written. When the state is already
    /// active, nothing is written at all. After a failed write the active
    /// state is forgotten, so the next call rewrites every pin.
    pub fn apply(&mut self, tier: BortleTier) -> Result<bool, P::Error> {
        let state = IndicatorState::for_tier(tier);
        if self.active == Some(state) {
            return Ok(false);
        }

        self.active = None;
        self.pin(state).set_high()?;
        for other in IndicatorState::ALL.into_iter().filter(|&s| s != state) {
            self.pin(other).set_low()?;
        }
        self.active = Some(state);
        Ok(true)
    }

    fn pin(&mut self, state: IndicatorState) -> &mut P {
        match state {
            IndicatorState::Dark => &mut self.dark,
            IndicatorState::Moderate => &mut self.moderate,
            IndicatorState::Bright => &mut self.bright,
        }
    }

    #[cfg(test)]
    pub(crate) fn pin_ref(&self, state: IndicatorState) -> &P {
        match state {
            IndicatorState::Dark => &self.dark,
            IndicatorState::Moderate => &self.moderate,
            IndicatorState::Bright => &self.bright,
        }
    }

    /// Give the pins back.
    pub fn release(self) -> (P, P, P) {
        (self.dark, self.moderate, self.bright)
    }
}
