//! PID registry: Mode 01 sensor PIDs with their decode formulas.
//!
//! The table is static and read-only. `A`, `B` in the formula comments are
//! the first and second data bytes after the `41 <pid>` echo header.

use std::collections::HashMap;
use std::sync::LazyLock;

use tracing::{debug, warn};

use crate::error::{ObdError, ObdResult};
use crate::response;
use crate::types::{MODE_CURRENT_DATA, RESPONSE_SID_OFFSET, RawResponse};

/// One Mode 01 PID: how many data bytes it carries and how to read them.
#[derive(Debug, Clone, Copy)]
pub struct PidDescriptor {
    pub pid: u8,
    /// Stable snake_case name used for samples and lookups.
    pub name: &'static str,
    /// Human-readable label.
    pub label: &'static str,
    /// Exact data byte count after the echo header.
    pub bytes: usize,
    pub decode: fn(&[u8]) -> f64,
    pub unit: &'static str,
    pub min: f64,
    pub max: f64,
}

impl PidDescriptor {
    /// Adapter command for this PID, e.g. `010C`.
    pub fn command(&self) -> String {
        format!("{MODE_CURRENT_DATA:02X}{:02X}", self.pid)
    }

    pub fn in_range(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }

    /// Decode exactly [`bytes`](Self::bytes) data bytes.
    pub fn decode_data(&self, data: &[u8]) -> ObdResult<f64> {
        if data.len() != self.bytes {
            return Err(ObdError::InvalidResponse(format!(
                "PID 0x{:02X}: expected {} data bytes, got {}",
                self.pid,
                self.bytes,
                data.len()
            )));
        }
        let value = (self.decode)(data);
        if !self.in_range(value) {
            warn!(
                pid = self.pid,
                name = self.name,
                value,
                min = self.min,
                max = self.max,
                "Decoded value outside valid range"
            );
        }
        Ok(value)
    }
}

fn word(d: &[u8]) -> u16 {
    (u16::from(d[0]) << 8) | u16::from(d[1])
}

fn percent(d: &[u8]) -> f64 {
    f64::from(d[0]) * 100.0 / 255.0
}

fn temperature(d: &[u8]) -> f64 {
    f64::from(d[0]) - 40.0
}

fn raw(d: &[u8]) -> f64 {
    f64::from(d[0])
}

fn fuel_trim(d: &[u8]) -> f64 {
    (f64::from(d[0]) - 128.0) * 100.0 / 128.0
}

/// Every supported PID.
pub static PIDS: &[PidDescriptor] = &[
    // (A*256+B)/4, truncated to whole rpm.
    PidDescriptor {
        pid: 0x0C,
        name: "engine_rpm",
        label: "Engine RPM",
        bytes: 2,
        decode: |d| f64::from(word(d) / 4),
        unit: "rpm",
        min: 0.0,
        max: 16383.75,
    },
    PidDescriptor {
        pid: 0x0D,
        name: "vehicle_speed",
        label: "Vehicle Speed",
        bytes: 1,
        decode: raw,
        unit: "km/h",
        min: 0.0,
        max: 255.0,
    },
    PidDescriptor {
        pid: 0x05,
        name: "coolant_temp",
        label: "Coolant Temperature",
        bytes: 1,
        decode: temperature,
        unit: "°C",
        min: -40.0,
        max: 215.0,
    },
    PidDescriptor {
        pid: 0x04,
        name: "engine_load",
        label: "Engine Load",
        bytes: 1,
        decode: percent,
        unit: "%",
        min: 0.0,
        max: 100.0,
    },
    PidDescriptor {
        pid: 0x11,
        name: "throttle_position",
        label: "Throttle Position",
        bytes: 1,
        decode: percent,
        unit: "%",
        min: 0.0,
        max: 100.0,
    },
    PidDescriptor {
        pid: 0x0F,
        name: "intake_air_temp",
        label: "Intake Air Temperature",
        bytes: 1,
        decode: temperature,
        unit: "°C",
        min: -40.0,
        max: 215.0,
    },
    PidDescriptor {
        pid: 0x10,
        name: "maf_rate",
        label: "Mass Air Flow",
        bytes: 2,
        decode: |d| f64::from(word(d)) / 100.0,
        unit: "g/s",
        min: 0.0,
        max: 655.35,
    },
    PidDescriptor {
        pid: 0x2F,
        name: "fuel_level",
        label: "Fuel Tank Level",
        bytes: 1,
        decode: percent,
        unit: "%",
        min: 0.0,
        max: 100.0,
    },
    PidDescriptor {
        pid: 0x06,
        name: "short_fuel_trim",
        label: "Short Term Fuel Trim B1",
        bytes: 1,
        decode: fuel_trim,
        unit: "%",
        min: -100.0,
        max: 99.21875,
    },
    PidDescriptor {
        pid: 0x07,
        name: "long_fuel_trim",
        label: "Long Term Fuel Trim B1",
        bytes: 1,
        decode: fuel_trim,
        unit: "%",
        min: -100.0,
        max: 99.21875,
    },
    PidDescriptor {
        pid: 0x0B,
        name: "intake_map",
        label: "Intake Manifold Pressure",
        bytes: 1,
        decode: raw,
        unit: "kPa",
        min: 0.0,
        max: 255.0,
    },
    // A/2 - 64
    PidDescriptor {
        pid: 0x0E,
        name: "timing_advance",
        label: "Timing Advance",
        bytes: 1,
        decode: |d| f64::from(d[0]) / 2.0 - 64.0,
        unit: "°",
        min: -64.0,
        max: 63.5,
    },
    PidDescriptor {
        pid: 0x1F,
        name: "run_time",
        label: "Run Time Since Start",
        bytes: 2,
        decode: |d| f64::from(word(d)),
        unit: "s",
        min: 0.0,
        max: 65535.0,
    },
    PidDescriptor {
        pid: 0x33,
        name: "barometric_pressure",
        label: "Barometric Pressure",
        bytes: 1,
        decode: raw,
        unit: "kPa",
        min: 0.0,
        max: 255.0,
    },
    PidDescriptor {
        pid: 0x42,
        name: "control_module_voltage",
        label: "Control Module Voltage",
        bytes: 2,
        decode: |d| f64::from(word(d)) / 1000.0,
        unit: "V",
        min: 0.0,
        max: 65.535,
    },
    PidDescriptor {
        pid: 0x46,
        name: "ambient_air_temp",
        label: "Ambient Air Temperature",
        bytes: 1,
        decode: temperature,
        unit: "°C",
        min: -40.0,
        max: 215.0,
    },
];

/// The PIDs a diagnostic snapshot reads, in order.
pub const COMMON_PIDS: [u8; 8] = [0x0C, 0x0D, 0x05, 0x04, 0x11, 0x0F, 0x10, 0x2F];

static BY_PID: LazyLock<HashMap<u8, &'static PidDescriptor>> =
    LazyLock::new(|| PIDS.iter().map(|d| (d.pid, d)).collect());

static BY_NAME: LazyLock<HashMap<&'static str, &'static PidDescriptor>> =
    LazyLock::new(|| PIDS.iter().map(|d| (d.name, d)).collect());

/// Look up a PID by number.
pub fn lookup(pid: u8) -> ObdResult<&'static PidDescriptor> {
    BY_PID.get(&pid).copied().ok_or(ObdError::UnknownPid { pid })
}

/// Look up a PID by its snake_case name.
pub fn by_name(name: &str) -> Option<&'static PidDescriptor> {
    BY_NAME.get(name.trim().to_ascii_lowercase().as_str()).copied()
}

/// Resolve user input: a name (`engine_rpm`) or a hex number (`0C`, `0x0C`).
pub fn resolve(query: &str) -> ObdResult<&'static PidDescriptor> {
    if let Some(desc) = by_name(query) {
        return Ok(desc);
    }
    let trimmed = query.trim();
    let hex = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    match u8::from_str_radix(hex, 16) {
        Ok(pid) => lookup(pid),
        Err(_) => Err(ObdError::InvalidArgument(format!("unknown PID '{query}'"))),
    }
}

/// Extract and decode the data bytes for `desc` from a Mode 01 reply.
///
/// Returns the value and the data bytes it was decoded from. Lines echoing a
/// different PID are ignored; when several ECUs answer, the first matching
/// line wins.
pub fn decode_response(
    desc: &PidDescriptor,
    response: &RawResponse,
) -> ObdResult<(f64, Vec<u8>)> {
    let echo = [MODE_CURRENT_DATA + RESPONSE_SID_OFFSET, desc.pid];

    for line in response::payload_lines(response)? {
        let bytes = match response::parse_hex(line) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(line, error = %e, "Skipping unparsable line");
                continue;
            }
        };
        let Some(data) = bytes.strip_prefix(&echo[..]) else {
            continue;
        };
        let value = desc.decode_data(data)?;
        return Ok((value, data.to_vec()));
    }

    Err(ObdError::InvalidResponse(format!(
        "no reply for PID 0x{:02X} in '{}'",
        desc.pid, response.text
    )))
}

/// Parse an `ATRV` reply such as `12.6V`. Unparsable input reads as `0.0`.
pub fn parse_voltage(text: &str) -> f64 {
    response::lines(text, crate::types::VOLTAGE_COMMAND)
        .first()
        .map(|line| line.trim_end_matches(['V', 'v']).trim())
        .and_then(|number| number.parse::<f64>().ok())
        .unwrap_or(0.0)
}
