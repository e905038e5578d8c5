//! Named JSON tools over the diagnostic session.
//!
//! Argument problems and adapter-reported failures come back as
//! `ToolResult::failure`; losing the link itself is returned as an error.

pub mod clear_dtcs;
pub mod diagnostic_snapshot;
pub mod monitor_pids;
pub mod read_dtcs;
pub mod read_pid;
pub mod read_vin;
pub mod read_voltage;
pub mod wait_for_condition;

use std::time::Duration;

use serde_json::Value;

use crate::error::{ObdError, ObdResult};
use crate::pid::{self, PidDescriptor};
use crate::types::{DiagTool, ToolResult};

/// Every tool, in a stable order.
pub fn all_tools() -> Vec<Box<dyn DiagTool>> {
    vec![
        Box::new(read_dtcs::ReadDtcs),
        Box::new(clear_dtcs::ClearDtcs),
        Box::new(read_pid::ReadPid),
        Box::new(read_vin::ReadVin),
        Box::new(read_voltage::ReadVoltage),
        Box::new(monitor_pids::MonitorPids),
        Box::new(wait_for_condition::WaitForCondition),
        Box::new(diagnostic_snapshot::DiagnosticSnapshotTool),
    ]
}

/// Map a session error to a tool outcome: link failures propagate, the rest
/// become a failed result.
pub(crate) fn fail(tool: &str, err: ObdError) -> ObdResult<ToolResult> {
    match err {
        ObdError::NotConnected | ObdError::Transport(_) => Err(err),
        other => Ok(ToolResult::failure(tool, other.to_string())),
    }
}

/// Longest polling interval a tool accepts.
pub(crate) const MAX_INTERVAL_MS: u64 = 60_000;

/// Optional `interval_ms` argument, bounded to `1..=MAX_INTERVAL_MS`.
pub(crate) fn interval_arg(args: &Value) -> ObdResult<Option<Duration>> {
    let Some(raw) = args.get("interval_ms") else {
        return Ok(None);
    };
    raw.as_u64()
        .filter(|ms| (1..=MAX_INTERVAL_MS).contains(ms))
        .map(|ms| Some(Duration::from_millis(ms)))
        .ok_or_else(|| {
            ObdError::InvalidArgument(format!("interval_ms must be in 1..={MAX_INTERVAL_MS}"))
        })
}

/// Resolve a PID argument given as a number (`12`) or a string (`"engine_rpm"`,
/// `"0C"`, `"0x0C"`).
pub(crate) fn pid_arg(value: &Value) -> ObdResult<&'static PidDescriptor> {
    match value {
        Value::Number(n) => {
            let pid = n
                .as_u64()
                .and_then(|n| u8::try_from(n).ok())
                .ok_or_else(|| ObdError::InvalidArgument(format!("PID out of range: {n}")))?;
            pid::lookup(pid)
        }
        Value::String(s) => pid::resolve(s),
        other => Err(ObdError::InvalidArgument(format!(
            "PID must be a number or a name, got {other}"
        ))),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use crate::config::SessionConfig;
    use crate::diagnostics::DiagnosticSession;
    use crate::mock::MockAdapter;

    pub fn session() -> (Arc<MockAdapter>, DiagnosticSession) {
        let (mock, rx) = MockAdapter::elm327();
        let session = DiagnosticSession::new(mock.clone(), rx, SessionConfig::default());
        (mock, session)
    }
}
