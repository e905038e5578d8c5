//! DTC codec: two-byte trouble codes to and from their `P0171` text form.
//!
//! Byte layout (SAE J2012):
//!
//! ```text
//! byte0: [cat:2][d1:2][d2:4]   byte1: [d3:4][d4:4]
//! ```
//!
//! `cat` picks the letter (P, C, B, U), `d1` is a decimal digit 0-3, and
//! `d2 d3 d4` are printed as uppercase hex.

use diag_protocol::{Dtc, DtcCategory};
use tracing::debug;

use crate::error::{ObdError, ObdResult};
use crate::response;
use crate::types::{RESPONSE_SID_OFFSET, RawResponse};

/// Decode two raw bytes into a DTC. `[0x00, 0x00]` decodes to `P0000`, the
/// "no code" padding marker; list decoding drops it.
pub fn decode(b0: u8, b1: u8) -> Dtc {
    let category = DtcCategory::from_bits(b0 >> 6);
    let d1 = (b0 >> 4) & 0x03;
    let d2 = b0 & 0x0F;
    let d3 = b1 >> 4;
    let d4 = b1 & 0x0F;

    Dtc {
        code: format!("{}{d1}{d2:X}{d3:X}{d4:X}", category.letter()),
        category,
        raw_bytes: [b0, b1],
    }
}

/// Encode a five-character code back into its two bytes.
///
/// Accepts lowercase. Rejects anything not shaped `[PCBU][0-3][0-9A-F]{3}`.
pub fn encode(code: &str) -> ObdResult<[u8; 2]> {
    let invalid = || ObdError::InvalidArgument(format!("malformed DTC '{code}'"));

    let chars: Vec<char> = code.trim().chars().collect();
    let [letter, d1, d2, d3, d4] = chars[..] else {
        return Err(invalid());
    };

    let category = DtcCategory::from_letter(letter).ok_or_else(invalid)?;
    let d1 = d1.to_digit(10).filter(|d| *d <= 3).ok_or_else(invalid)? as u8;
    let nibble = |c: char| c.to_digit(16).map(|d| d as u8).ok_or_else(invalid);
    let (d2, d3, d4) = (nibble(d2)?, nibble(d3)?, nibble(d4)?);

    Ok([(category.bits() << 6) | (d1 << 4) | d2, (d3 << 4) | d4])
}

/// Parse text into a [`Dtc`], normalizing case.
pub fn parse(code: &str) -> ObdResult<Dtc> {
    let [b0, b1] = encode(code)?;
    Ok(decode(b0, b1))
}

/// Decode a Mode 03 / 07 reply into its DTC list.
///
/// Each message (a line, or a joined CAN multi-frame group) starts with the
/// mode echo byte (`0x43` / `0x47`). When the bytes after it are odd in
/// number the first is a CAN-style code count and is skipped. Remaining
/// bytes pair up in arrival order; `00 00` pairs are padding. `NO DATA`
/// means no codes.
pub fn decode_list(response: &RawResponse, mode: u8) -> ObdResult<Vec<Dtc>> {
    let lines = match response::payload_lines(response) {
        Ok(lines) => lines,
        Err(ObdError::NoData { .. }) => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let echo = mode + RESPONSE_SID_OFFSET;
    let mut dtcs = Vec::new();
    let mut matched = false;

    for message in response::messages(&lines) {
        let bytes = message.bytes?;
        let Some((&first, rest)) = bytes.split_first() else {
            continue;
        };
        if first != echo {
            debug!(line = message.source, echo, "Skipping message without mode echo");
            continue;
        }
        matched = true;

        let pairs = if rest.len() % 2 == 1 { &rest[1..] } else { rest };
        dtcs.extend(
            pairs
                .chunks_exact(2)
                .map(|pair| decode(pair[0], pair[1]))
                .filter(|dtc| !dtc.is_no_code()),
        );
    }

    if !matched && !lines.is_empty() {
        return Err(ObdError::InvalidResponse(format!(
            "no line with echo 0x{echo:02X} in '{}'",
            response.text
        )));
    }
    Ok(dtcs)
}
