//! Decides which events are worth a notification.

use crate::{
    config::Notify,
    events::{Event, Update},
};

pub struct Monitor {
    notify: Notify,
    last_update: Option<Update>,
}

impl Monitor {
    pub fn new(notify: Notify) -> Self {
        Self {
            notify,
            last_update: None,
        }
    }

    /// Feed an event, return the notification text it warrants.
    pub fn handle(&mut self, event: &Event) -> Option<String> {
        match event {
            Event::Update(update) => {
                self.last_update = Some(update.clone());
                None
            }
            Event::IndicatorTransition { from, to } if self.notify.on_indicator_change => {
                Some(match from.as_str() {
                    "None" => format!("Sky quality meter started, sky is {}", describe(to)),
                    _ => format!("Sky changed from {} to {}", describe(from), describe(to)),
                })
            }
            Event::StateTransition { to, .. } if self.notify.on_sensor_fault => {
                match to.as_str() {
                    "SensorFault" => Some(format!(
                        "Light sensor unavailable, indicators frozen at {}",
                        self.last_known()
                    )),
                    "Running" => Some("Light sensor recovered".to_string()),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    fn last_known(&self) -> String {
        match &self.last_update {
            Some(Update {
                bortle: Some(bortle),
                ..
            }) => format!("Bortle {}", bortle),
            Some(update) => describe(&update.indicator).to_string(),
            None => "an unknown state".to_string(),
        }
    }
}

fn describe(indicator: &str) -> &str {
    match indicator {
        "Dark" => "dark (Bortle 1-3)",
        "Moderate" => "moderate (Bortle 4-5)",
        "Bright" => "bright (Bortle 6-9)",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::parse_line;

    fn handle(monitor: &mut Monitor, line: &str) -> Option<String> {
        monitor.handle(&parse_line(line).expect("line should parse"))
    }

    #[test]
    fn test_indicator_transitions() {
        let mut monitor = Monitor::new(Notify::default());
        assert_eq!(
            handle(&mut monitor, ":: Indicator transition: None -> Dark").as_deref(),
            Some("Sky quality meter started, sky is dark (Bortle 1-3)")
        );
        assert_eq!(
            handle(&mut monitor, ":: Indicator transition: Dark -> Bright").as_deref(),
            Some("Sky changed from dark (Bortle 1-3) to bright (Bortle 6-9)")
        );
    }

    #[test]
    fn test_sensor_fault() {
        let mut monitor = Monitor::new(Notify::default());
        assert_eq!(
            handle(
                &mut monitor,
                ":: 3 Update [Lux=2.000 Smoothed=2.000 Ema=2.000 Bortle=5 Indicator=Moderate Sensor=Healthy]"
            ),
            None
        );
        assert_eq!(
            handle(&mut monitor, ":: State transition: Running -> SensorFault").as_deref(),
            Some("Light sensor unavailable, indicators frozen at Bortle 5")
        );
        assert_eq!(
            handle(&mut monitor, ":: State transition: SensorFault -> Running").as_deref(),
            Some("Light sensor recovered")
        );
    }

    #[test]
    fn test_disabled_notifications() {
        let mut monitor = Monitor::new(Notify {
            on_indicator_change: false,
            on_sensor_fault: false,
        });
        assert_eq!(
            handle(&mut monitor, ":: Indicator transition: Dark -> Moderate"),
            None
        );
        assert_eq!(
            handle(&mut monitor, ":: State transition: Running -> SensorFault"),
            None
        );
        assert_eq!(handle(&mut monitor, ":: Error: Sensor: No open device handle"), None);
    }
}
