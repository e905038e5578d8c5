//! VIN reassembly from a multi-line Mode 09 PID 02 reply.
//!
//! Every message opens with a 3-byte header (`49 02 <n>`) that is discarded.
//! Legacy buses send one message per line, each with its own header; CAN
//! sends one multi-frame message with a single header. Payload bytes are
//! joined in the order they arrived; the embedded sequence byte is not used
//! to reorder them.

use tracing::debug;

use crate::error::ObdResult;
use crate::response;
use crate::types::RawResponse;

const HEADER_LEN: usize = 3;

/// Join message payloads into the VIN text.
///
/// Zero padding is removed. Anything non-ASCII yields an empty string.
pub fn reassemble_lines(lines: &[&str]) -> String {
    let mut payload = Vec::new();
    for message in response::messages(lines) {
        match message.bytes {
            Ok(bytes) => payload.extend(bytes.into_iter().skip(HEADER_LEN)),
            Err(e) => {
                debug!(line = message.source, error = %e, "Skipping undecodable VIN message");
            }
        }
    }

    payload.retain(|&b| b != 0x00);
    if payload.is_ascii() {
        String::from_utf8(payload).unwrap_or_default()
    } else {
        String::new()
    }
}

/// Reassemble the VIN from a finalized `0902` reply.
pub fn reassemble(response: &RawResponse) -> ObdResult<String> {
    let lines = response::payload_lines(response)?;
    Ok(reassemble_lines(&lines))
}
