//! Mode guard: only the diagnostic modes this engine issues reach the adapter.
//!
//! Allowed OBD-II modes:
//! - 0x01: current data (live PIDs)
//! - 0x03: stored DTCs
//! - 0x04: clear DTCs and stored values
//! - 0x07: pending DTCs
//! - 0x09: vehicle information (VIN)
//!
//! Everything else is refused, in particular 0x08 (on-board actuator
//! control). Adapter `AT` commands are not OBD requests and bypass the guard.

use crate::error::{ObdError, ObdResult};

/// OBD-II modes the session may send.
pub const ALLOWED_MODES: &[u8] = &[0x01, 0x03, 0x04, 0x07, 0x09];

/// Validates that an OBD-II mode is allowed under the safety policy.
pub fn is_mode_allowed(mode: u8) -> bool {
    ALLOWED_MODES.contains(&mode)
}

/// Check an outgoing command. `AT` commands pass; OBD requests must parse
/// to an allowed mode.
pub fn check_command(command: &str) -> ObdResult<()> {
    let command = command.trim();
    if command.get(..2).is_some_and(|p| p.eq_ignore_ascii_case("AT")) {
        return Ok(());
    }
    let mode = command
        .get(..2)
        .and_then(|m| u8::from_str_radix(m, 16).ok())
        .ok_or_else(|| ObdError::InvalidArgument(format!("not an OBD request: '{command}'")))?;
    if is_mode_allowed(mode) {
        Ok(())
    } else {
        Err(ObdError::SafetyViolation { mode })
    }
}
