//! Serde helpers that render raw adapter bytes as lowercase hex strings.

use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S, B>(bytes: B, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    B: AsRef<[u8]>,
{
    let hex_string: String = bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect();
    serializer.serialize_str(&hex_string)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    if s.len() % 2 != 0 || !s.is_ascii() {
        return Err(serde::de::Error::custom(format!("odd-length hex string: {s}")));
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).map_err(serde::de::Error::custom))
        .collect()
}

/// Fixed two-byte variant used for DTC raw bytes.
pub mod pair {
    use serde::{Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8; 2], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        super::serialize(bytes, serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 2], D::Error>
    where
        D: Deserializer<'de>,
    {
        let bytes = super::deserialize(deserializer)?;
        <[u8; 2]>::try_from(bytes.as_slice()).map_err(|_| {
            serde::de::Error::custom(format!("expected 2 bytes, got {}", bytes.len()))
        })
    }
}
