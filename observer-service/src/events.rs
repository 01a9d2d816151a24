//! Parsing of the meter's serial log lines.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub cycle: u32,
    pub lux: Option<f64>,
    pub smoothed: Option<f64>,
    pub ema: Option<f64>,
    pub bortle: Option<u8>,
    pub indicator: String,
    pub sensor_healthy: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Update(Update),
    StateTransition { from: String, to: String },
    IndicatorTransition { from: String, to: String },
    Error { message: String },
}

/// Parse a line and return the event it describes, if any.
pub fn parse_line(line: &str) -> Option<Event> {
    // Patterns
    lazy_static! {
        static ref UPDATE_RE: Regex = Regex::new(concat!(
            r"^:: (?P<cycle>[0-9]+) Update \[",
            r"Lux=(?P<lux>[0-9.]+|-) ",
            r"Smoothed=(?P<smoothed>[0-9.]+|-) ",
            r"Ema=(?P<ema>[0-9.]+|-) ",
            r"Bortle=(?P<bortle>[1-9]|-) ",
            r"Indicator=(?P<indicator>[a-zA-Z]+) ",
            r"Sensor=(?P<sensor>[a-zA-Z]+)\]$",
        ))
        .unwrap();
        static ref STATE_RE: Regex =
            Regex::new("^:: State transition: (?P<from>[a-zA-Z]*) -> (?P<to>[a-zA-Z]*)$").unwrap();
        static ref INDICATOR_RE: Regex =
            Regex::new("^:: Indicator transition: (?P<from>[a-zA-Z]*) -> (?P<to>[a-zA-Z]*)$")
                .unwrap();
        static ref ERROR_RE: Regex = Regex::new("^:: Error: (?P<message>.*)$").unwrap();
    }

    // Check for matches
    if let Some(capture) = UPDATE_RE.captures(line) {
        return Some(Event::Update(Update {
            cycle: capture["cycle"].parse().ok()?,
            lux: number(&capture, "lux"),
            smoothed: number(&capture, "smoothed"),
            ema: number(&capture, "ema"),
            bortle: number(&capture, "bortle"),
            indicator: capture["indicator"].to_string(),
            sensor_healthy: &capture["sensor"] == "Healthy",
        }));
    }
    if let Some(capture) = STATE_RE.captures(line) {
        return Some(Event::StateTransition {
            from: capture["from"].to_string(),
            to: capture["to"].to_string(),
        });
    }
    if let Some(capture) = INDICATOR_RE.captures(line) {
        return Some(Event::IndicatorTransition {
            from: capture["from"].to_string(),
            to: capture["to"].to_string(),
        });
    }
    if let Some(capture) = ERROR_RE.captures(line) {
        return Some(Event::Error {
            message: capture["message"].to_string(),
        });
    }

    // No match
    None
}

/// A numeric field, `None` for `-` or garbage.
fn number<T: std::str::FromStr>(capture: &Captures, name: &str) -> Option<T> {
    capture.name(name)?.as_str().parse().ok()
}
