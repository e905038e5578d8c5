use std::fmt;

use serde::{Deserialize, Serialize};

/// OBD-II Diagnostic Trouble Code as reported by the vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dtc {
    /// Standard DTC string (e.g., "P0171", "U0100").
    pub code: String,
    /// DTC category derived from the first character.
    pub category: DtcCategory,
    /// The two bytes the code was decoded from.
    #[serde(with = "crate::hex::pair")]
    pub raw_bytes: [u8; 2],
}

/// DTC category based on first character of code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DtcCategory {
    /// P: Powertrain (engine, transmission).
    Powertrain,
    /// C: Chassis (ABS, steering).
    Chassis,
    /// B: Body (airbags, AC, lighting).
    Body,
    /// U: Network/Communication (CAN bus errors).
    Network,
}

impl DtcCategory {
    /// Category for the two most significant bits of the first DTC byte.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => DtcCategory::Powertrain,
            1 => DtcCategory::Chassis,
            2 => DtcCategory::Body,
            _ => DtcCategory::Network,
        }
    }

    /// Inverse of [`DtcCategory::from_bits`].
    pub fn bits(self) -> u8 {
        match self {
            DtcCategory::Powertrain => 0,
            DtcCategory::Chassis => 1,
            DtcCategory::Body => 2,
            DtcCategory::Network => 3,
        }
    }

    pub fn letter(self) -> char {
        match self {
            DtcCategory::Powertrain => 'P',
            DtcCategory::Chassis => 'C',
            DtcCategory::Body => 'B',
            DtcCategory::Network => 'U',
        }
    }

    /// Parse a category letter. Accepts lowercase.
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'P' => Some(DtcCategory::Powertrain),
            'C' => Some(DtcCategory::Chassis),
            'B' => Some(DtcCategory::Body),
            'U' => Some(DtcCategory::Network),
            _ => None,
        }
    }
}

impl Dtc {
    /// True for the all-zero "no code" padding pair (`P0000`).
    pub fn is_no_code(&self) -> bool {
        self.raw_bytes == [0x00, 0x00]
    }
}

impl fmt::Display for Dtc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code)
    }
}
