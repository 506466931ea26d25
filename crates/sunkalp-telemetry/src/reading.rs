//! ---
//! ems_section: "02-telemetry-processing"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Normalized telemetry readings and the rolling display window."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sunkalp_common::time::{format_local_clock, parse_feed_timestamp, UNKNOWN_TIME};

use crate::feed::FeedRecord;

/// One normalized sample. Numeric fields are zero when the feed omitted
/// them or sent something non-numeric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Display time (`HH:MM`, local).
    pub time: String,
    /// Parsed sample instant, when the feed timestamp was valid.
    pub captured_at: Option<DateTime<Utc>>,
    pub voltage: f64,
    pub current: f64,
    /// Battery state of charge in percent.
    pub state_of_charge: f64,
    pub load_power: f64,
    pub temperature: f64,
}

impl Reading {
    /// Normalize a raw feed record (field1..field5 mapping).
    pub fn from_record(record: &FeedRecord) -> Self {
        let captured_at = record.created_at.as_deref().and_then(parse_feed_timestamp);
        let time = captured_at
            .as_ref()
            .map(format_local_clock)
            .unwrap_or_else(|| UNKNOWN_TIME.to_owned());
        Self {
            time,
            captured_at,
            voltage: normalize_field(record.field1.as_ref()),
            current: normalize_field(record.field2.as_ref()),
            state_of_charge: normalize_field(record.field3.as_ref()),
            load_power: normalize_field(record.field4.as_ref()),
            temperature: normalize_field(record.field5.as_ref()),
        }
    }

    /// Value of the given metric.
    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Voltage => self.voltage,
            Metric::Current => self.current,
            Metric::StateOfCharge => self.state_of_charge,
            Metric::LoadPower => self.load_power,
            Metric::Temperature => self.temperature,
        }
    }
}

/// Coerce a feed field to a number.
///
/// Numbers pass through; strings are trimmed and parsed, with the empty
/// string meaning zero. Anything else, including NaN and infinities, is zero.
pub fn normalize_field(raw: Option<&Value>) -> f64 {
    let parsed = match raw {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                Some(0.0)
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
        _ => None,
    };
    parsed.filter(|value| value.is_finite()).unwrap_or(0.0)
}

/// Channels displayed by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Voltage,
    Current,
    StateOfCharge,
    LoadPower,
    Temperature,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::Voltage,
        Metric::Current,
        Metric::StateOfCharge,
        Metric::LoadPower,
        Metric::Temperature,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Metric::Voltage => "Voltage",
            Metric::Current => "Current",
            Metric::StateOfCharge => "Battery SOC",
            Metric::LoadPower => "Load Power",
            Metric::Temperature => "Temperature",
        }
    }

    /// Title of the history chart for this metric.
    pub fn chart_title(&self) -> &'static str {
        match self {
            Metric::Voltage => "Bus Voltage History",
            Metric::Current => "Load Current Trend",
            Metric::StateOfCharge => "Battery Charge Level",
            Metric::LoadPower => "Power Consumption",
            Metric::Temperature => "Temperature Trend",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Metric::Voltage => "V",
            Metric::Current => "A",
            Metric::StateOfCharge => "%",
            Metric::LoadPower => "W",
            Metric::Temperature => "°C",
        }
    }

    /// Stat-card rendering: rounded to a whole number.
    pub fn format_value(&self, value: f64) -> String {
        format!("{:.0}", value)
    }
}

/// The most recent samples, oldest first, bounded to `capacity`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReadingWindow {
    readings: Vec<Reading>,
}

impl ReadingWindow {
    /// Build a window keeping at most the last `capacity` readings.
    pub fn from_readings(mut readings: Vec<Reading>, capacity: usize) -> Self {
        if readings.len() > capacity {
            readings.drain(..readings.len() - capacity);
        }
        Self { readings }
    }

    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    /// Most recent sample.
    pub fn latest(&self) -> Option<&Reading> {
        self.readings.last()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn clear(&mut self) {
        self.readings.clear();
    }

    /// `(index, value)` points for charting a metric.
    pub fn series(&self, metric: Metric) -> Vec<(f64, f64)> {
        self.readings
            .iter()
            .enumerate()
            .map(|(idx, reading)| (idx as f64, reading.value(metric)))
            .collect()
    }

    /// Minimum and maximum of a metric across the window.
    pub fn bounds(&self, metric: Metric) -> Option<(f64, f64)> {
        self.readings.iter().map(|r| r.value(metric)).fold(None, |acc, v| {
            Some(match acc {
                None => (v, v),
                Some((lo, hi)) => (lo.min(v), hi.max(v)),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> FeedRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn maps_fields_in_order() {
        let reading = Reading::from_record(&record(json!({
            "created_at": "2023-10-27T10:00:00Z",
            "entry_id": 1,
            "field1": "230.5",
            "field2": "99.9",
            "field3": "45",
            "field4": 100,
            "field5": "25",
        })));
        assert_eq!(reading.voltage, 230.5);
        assert_eq!(reading.current, 99.9);
        assert_eq!(reading.state_of_charge, 45.0);
        assert_eq!(reading.load_power, 100.0);
        assert_eq!(reading.temperature, 25.0);
        assert!(reading.captured_at.is_some());
        assert_eq!(reading.time.len(), 5);
    }

    #[test]
    fn missing_or_garbage_fields_are_zero() {
        let reading = Reading::from_record(&record(json!({
            "created_at": "not a date",
            "field1": null,
            "field2": "abc",
            "field3": "",
            "field4": true,
        })));
        for metric in Metric::ALL {
            assert_eq!(reading.value(metric), 0.0, "{metric:?}");
        }
        assert_eq!(reading.time, UNKNOWN_TIME);
        assert!(reading.captured_at.is_none());
    }

    #[test]
    fn normalize_handles_edge_values() {
        assert_eq!(normalize_field(Some(&json!(" 12.5 "))), 12.5);
        assert_eq!(normalize_field(Some(&json!("-3"))), -3.0);
        assert_eq!(normalize_field(Some(&json!("1e2"))), 100.0);
        assert_eq!(normalize_field(Some(&json!("NaN"))), 0.0);
        assert_eq!(normalize_field(Some(&json!("inf"))), 0.0);
        assert_eq!(normalize_field(Some(&json!([1]))), 0.0);
        assert_eq!(normalize_field(None), 0.0);
    }

    #[test]
    fn stat_cards_round_to_whole_numbers() {
        assert_eq!(Metric::Current.format_value(99.9), "100");
        assert_eq!(Metric::Voltage.format_value(230.4), "230");
    }

    #[test]
    fn window_keeps_most_recent() {
        let readings: Vec<Reading> = (0..20)
            .map(|i| Reading::from_record(&record(json!({ "field1": i }))))
            .collect();
        let window = ReadingWindow::from_readings(readings, 15);
        assert_eq!(window.len(), 15);
        assert_eq!(window.readings()[0].voltage, 5.0);
        assert_eq!(window.latest().unwrap().voltage, 19.0);
        assert_eq!(window.bounds(Metric::Voltage), Some((5.0, 19.0)));
        assert_eq!(window.series(Metric::Voltage)[14], (14.0, 19.0));
    }
}
