//! Serial log lines.
//!
//! Every line starts with `:: ` and ends with CRLF. The observer service
//! parses these, so keep both sides in sync when changing the format.

use ufmt::{uDisplay, uWrite, uwrite, Formatter};

use crate::{control::Snapshot, errors::Error, indicators::IndicatorState, states::State};

/// Optional non-negative quantity printed with three decimals, `-` if absent.
struct Fixed3(Option<f32>);

impl uDisplay for Fixed3 {
    fn fmt<W>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        let value = match self.0 {
            Some(value) if value.is_finite() => value.max(0.0),
            _ => return f.write_str("-"),
        };
        // Saturates at u32::MAX, far above the sensor range
        let milli = (value * 1000.0 + 0.5) as u32;
        let (int, frac) = (milli / 1000, milli % 1000);
        let pad = match frac {
            0..=9 => "00",
            10..=99 => "0",
            _ => "",
        };
        uwrite!(f, "{}.{}{}", int, pad, frac)
    }
}

struct OptionalState(Option<IndicatorState>);

impl uDisplay for OptionalState {
    fn fmt<W>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        match &self.0 {
            Some(state) => uDisplay::fmt(state, f),
            None => f.write_str("None"),
        }
    }
}

/// `:: <cycle> Update [Lux=.. Smoothed=.. Ema=.. Bortle=.. Indicator=.. Sensor=..]`
pub fn write_update<W: uWrite + ?Sized>(w: &mut W, snapshot: &Snapshot) -> Result<(), W::Error> {
    uwrite!(
        w,
        ":: {} Update [Lux={} Smoothed={} Ema={} Bortle=",
        snapshot.cycle,
        Fixed3(snapshot.raw_lux),
        Fixed3(snapshot.smoothed_lux),
        Fixed3(snapshot.ema_lux)
    )?;
    match snapshot.tier {
        Some(tier) => uwrite!(w, "{}", tier.get())?,
        None => w.write_str("-")?,
    }
    let sensor = if snapshot.sensor_healthy {
        "Healthy"
    } else {
        "Unavailable"
    };
    uwrite!(
        w,
        " Indicator={} Sensor={}]\r\n",
        OptionalState(snapshot.indicator),
        sensor
    )
}

/// `:: State transition: <from> -> <to>`
pub fn write_state_transition<W: uWrite + ?Sized>(
    w: &mut W,
    from: State,
    to: State,
) -> Result<(), W::Error> {
    uwrite!(w, ":: State transition: {} -> {}\r\n", from, to)
}

/// `:: Indicator transition: <from> -> <to>`
pub fn write_indicator_transition<W: uWrite + ?Sized>(
    w: &mut W,
    from: Option<IndicatorState>,
    to: IndicatorState,
) -> Result<(), W::Error> {
    uwrite!(
        w,
        ":: Indicator transition: {} -> {}\r\n",
        OptionalState(from),
        to
    )
}

/// `:: Error: <message>`
pub fn write_error<W: uWrite + ?Sized>(w: &mut W, error: &Error) -> Result<(), W::Error> {
    uwrite!(w, ":: Error: {}\r\n", error)
}

/// Write every line describing `snapshot`: transitions first, then the update.
pub fn write_snapshot<W: uWrite + ?Sized>(w: &mut W, snapshot: &Snapshot) -> Result<(), W::Error> {
    if let Some((from, to)) = snapshot.state_change {
        write_state_transition(w, from, to)?;
    }
    if let Some((from, to)) = snapshot.indicator_change {
        write_indicator_transition(w, from, to)?;
    }
    write_update(w, snapshot)
}
