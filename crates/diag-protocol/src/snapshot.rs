use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dtc::Dtc;
use crate::telemetry::LiveSample;

/// Combined one-pass view of the vehicle: codes, pending codes and the
/// common live PIDs.
///
/// Sub-reads that failed are listed in `failures`; everything else is
/// whatever succeeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticSnapshot {
    pub taken_at: DateTime<Utc>,
    /// Stored DTCs (Mode 03). `None` if the read failed.
    pub dtcs: Option<Vec<Dtc>>,
    /// Pending DTCs (Mode 07). `None` if the read failed.
    pub pending_dtcs: Option<Vec<Dtc>>,
    /// Successful live readings, in request order.
    pub readings: Vec<LiveSample>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_voltage: Option<f64>,
    pub failures: Vec<ReadFailure>,
}

/// One sub-read of a composite operation that did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadFailure {
    /// Which read failed (e.g., "dtcs", "engine_rpm").
    pub read: String,
    /// Display form of the error.
    pub error: String,
}

impl DiagnosticSnapshot {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Look up a reading by metric name.
    pub fn reading(&self, name: &str) -> Option<&LiveSample> {
        self.readings.iter().find(|s| s.name == name)
    }
}
