use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single decoded reading taken from the vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveSample {
    /// Metric name (e.g., "engine_rpm", "coolant_temp", "battery_voltage").
    pub name: String,
    /// OBD-II PID the reading came from. `None` for adapter-level reads.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u8>,
    /// Decoded numeric value.
    pub value: f64,
    /// Unit of measurement.
    pub unit: String,
    /// When the reading was decoded.
    pub timestamp: DateTime<Utc>,
    /// Data bytes the value was decoded from (echo header stripped).
    #[serde(with = "crate::hex", default)]
    pub raw_bytes: Vec<u8>,
}

/// Aggregate of one metric over a monitoring window.
///
/// `min`, `max` and `avg` are `None` when no reading succeeded during the
/// window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorResult {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u8>,
    pub unit: String,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub avg: Option<f64>,
    pub count: usize,
    pub samples: Vec<LiveSample>,
}

impl MonitorResult {
    /// Reduce an ordered sample sequence into min / max / mean / count.
    pub fn from_samples(
        name: impl Into<String>,
        pid: Option<u8>,
        unit: impl Into<String>,
        samples: Vec<LiveSample>,
    ) -> Self {
        let count = samples.len();
        let (min, max, avg) = if count == 0 {
            (None, None, None)
        } else {
            let mut min = f64::INFINITY;
            let mut max = f64::NEG_INFINITY;
            let mut sum = 0.0;
            for s in &samples {
                min = min.min(s.value);
                max = max.max(s.value);
                sum += s.value;
            }
            (Some(min), Some(max), Some(sum / count as f64))
        };

        Self {
            name: name.into(),
            pid,
            unit: unit.into(),
            min,
            max,
            avg,
            count,
            samples,
        }
    }
}
