//! Tool: Read stored (Mode 0x03) or pending (Mode 0x07) DTCs.

use async_trait::async_trait;

use crate::diagnostics::DiagnosticSession;
use crate::error::ObdResult;
use crate::types::{DiagTool, ToolResult};

/// Reads Diagnostic Trouble Codes from the vehicle ECUs.
pub struct ReadDtcs;

#[async_trait]
impl DiagTool for ReadDtcs {
    fn name(&self) -> &str {
        "read_dtcs"
    }

    fn description(&self) -> &str {
        "Read stored (Mode 0x03) or pending (Mode 0x07) Diagnostic Trouble Codes"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "pending": { "type": "boolean", "description": "Read pending instead of stored codes", "default": false }
            }
        })
    }

    async fn execute(
        &self,
        args: serde_json::Value,
        session: &DiagnosticSession,
    ) -> ObdResult<ToolResult> {
        let pending = args
            .get("pending")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        let read = if pending {
            session.read_pending_dtcs().await
        } else {
            session.read_dtcs().await
        };
        let dtcs = match read {
            Ok(dtcs) => dtcs,
            Err(e) => return super::fail(self.name(), e),
        };

        let kind = if pending { "pending" } else { "stored" };
        let summary = if dtcs.is_empty() {
            format!("No {kind} DTCs found")
        } else {
            let codes: Vec<&str> = dtcs.iter().map(|d| d.code.as_str()).collect();
            format!("Found {} {kind} DTC(s): {}", dtcs.len(), codes.join(", "))
        };

        let data = serde_json::json!({
            "pending": pending,
            "count": dtcs.len(),
            "dtcs": dtcs,
        });
        Ok(ToolResult::success(self.name(), data, summary))
    }
}
