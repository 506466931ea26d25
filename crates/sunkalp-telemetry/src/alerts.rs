//! ---
//! ems_section: "02-telemetry-processing"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Threshold evaluation against the newest reading."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fmt;

use serde::{Deserialize, Serialize};
use sunkalp_common::config::AlertConfig;

use crate::reading::Reading;

/// Alert category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlertKind {
    Overheat,
    LowBattery,
}

impl AlertKind {
    /// Headline used for system notifications.
    pub fn notification_title(&self) -> &'static str {
        match self {
            AlertKind::Overheat => "Overheating!",
            AlertKind::LowBattery => "Battery Low!",
        }
    }
}

/// A threshold breach on the newest sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    /// Literal value that tripped the rule.
    pub value: f64,
}

impl Alert {
    /// Banner text, e.g. `High Temp: 55°C`.
    pub fn message(&self) -> String {
        match self.kind {
            AlertKind::Overheat => format!("High Temp: {}°C", self.value),
            AlertKind::LowBattery => format!("Low Battery: {}%", self.value),
        }
    }

    /// Notification body, e.g. `Temp is 55°C`.
    pub fn notification_body(&self) -> String {
        match self.kind {
            AlertKind::Overheat => format!("Temp is {}°C", self.value),
            AlertKind::LowBattery => format!("Level at {}%", self.value),
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Rule limits; see [`evaluate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertThresholds {
    pub overheat_celsius: f64,
    pub low_battery_percent: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self::from(&AlertConfig::default())
    }
}

impl From<&AlertConfig> for AlertThresholds {
    fn from(config: &AlertConfig) -> Self {
        Self {
            overheat_celsius: config.overheat_celsius,
            low_battery_percent: config.low_battery_percent,
        }
    }
}

/// Evaluate both rules against a single reading.
///
/// Overheat fires when the temperature is strictly above the limit. Low
/// battery fires when the charge is strictly between zero and the limit; a
/// zero charge is treated as "no data" rather than an empty battery.
pub fn evaluate(reading: &Reading, thresholds: &AlertThresholds) -> Vec<Alert> {
    let mut alerts = Vec::new();
    if reading.temperature > thresholds.overheat_celsius {
        alerts.push(Alert {
            kind: AlertKind::Overheat,
            value: reading.temperature,
        });
    }
    if reading.state_of_charge > 0.0 && reading.state_of_charge < thresholds.low_battery_percent {
        alerts.push(Alert {
            kind: AlertKind::LowBattery,
            value: reading.state_of_charge,
        });
    }
    alerts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(temperature: f64, state_of_charge: f64) -> Reading {
        Reading {
            time: "10:00".into(),
            captured_at: None,
            voltage: 48.0,
            current: 2.0,
            state_of_charge,
            load_power: 96.0,
            temperature,
        }
    }

    #[test]
    fn overheat_only() {
        let alerts = evaluate(&reading(55.0, 50.0), &AlertThresholds::default());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::Overheat);
        assert!(alerts[0].message().contains("55"));
        assert_eq!(alerts[0].message(), "High Temp: 55°C");
    }

    #[test]
    fn low_battery_only() {
        let alerts = evaluate(&reading(30.0, 15.0), &AlertThresholds::default());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::LowBattery);
        assert_eq!(alerts[0].message(), "Low Battery: 15%");
        assert_eq!(alerts[0].notification_body(), "Level at 15%");
    }

    #[test]
    fn zero_charge_is_not_low_battery() {
        assert!(evaluate(&reading(30.0, 0.0), &AlertThresholds::default()).is_empty());
    }

    #[test]
    fn boundaries_are_exclusive() {
        assert!(evaluate(&reading(50.0, 20.0), &AlertThresholds::default()).is_empty());
        let both = evaluate(&reading(50.5, 19.5), &AlertThresholds::default());
        assert_eq!(
            both.iter().map(|a| a.kind).collect::<Vec<_>>(),
            vec![AlertKind::Overheat, AlertKind::LowBattery]
        );
        assert_eq!(both[0].to_string(), "High Temp: 50.5°C");
    }

    #[test]
    fn thresholds_follow_config() {
        let thresholds = AlertThresholds::from(&AlertConfig {
            overheat_celsius: 40.0,
            low_battery_percent: 30.0,
        });
        let alerts = evaluate(&reading(41.0, 25.0), &thresholds);
        assert_eq!(alerts.len(), 2);
    }
}
