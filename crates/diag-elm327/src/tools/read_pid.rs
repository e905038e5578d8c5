//! Tool: Read OBD-II PID (Mode 0x01, current data).

use async_trait::async_trait;

use crate::diagnostics::DiagnosticSession;
use crate::error::ObdResult;
use crate::types::{DiagTool, ToolResult};

/// Reads a live OBD-II PID and returns the decoded sensor value.
pub struct ReadPid;

#[async_trait]
impl DiagTool for ReadPid {
    fn name(&self) -> &str {
        "read_pid"
    }

    fn description(&self) -> &str {
        "Read a live OBD-II PID (Mode 0x01) and return the decoded sensor value"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "pid": {
                    "type": ["integer", "string"],
                    "description": "PID number (0x00-0xFF) or name, e.g. \"engine_rpm\" or \"0C\""
                }
            },
            "required": ["pid"]
        })
    }

    async fn execute(
        &self,
        args: serde_json::Value,
        session: &DiagnosticSession,
    ) -> ObdResult<ToolResult> {
        let Some(raw) = args.get("pid") else {
            return Ok(ToolResult::failure(
                self.name(),
                "Missing required argument: pid",
            ));
        };
        let desc = match super::pid_arg(raw) {
            Ok(desc) => desc,
            Err(e) => return super::fail(self.name(), e),
        };

        match session.read_pid(desc.pid).await {
            Ok(sample) => {
                let summary = format!("{}: {} {}", desc.label, sample.value, sample.unit);
                let data = serde_json::to_value(&sample).unwrap_or_default();
                Ok(ToolResult::success(self.name(), data, summary))
            }
            Err(e) => super::fail(self.name(), e),
        }
    }
}
