//! Tool: Clear DTCs and stored freeze data (Mode 0x04).
//!
//! Clearing also resets readiness monitors, so the tool refuses to run
//! without an explicit `confirm: true`.

use async_trait::async_trait;

use crate::diagnostics::DiagnosticSession;
use crate::error::ObdResult;
use crate::types::{DiagTool, ToolResult};

/// Clears stored trouble codes.
pub struct ClearDtcs;

#[async_trait]
impl DiagTool for ClearDtcs {
    fn name(&self) -> &str {
        "clear_dtcs"
    }

    fn description(&self) -> &str {
        "Clear stored DTCs and freeze frame data (Mode 0x04). Requires confirm=true"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "confirm": { "type": "boolean", "description": "Must be true to clear codes" }
            },
            "required": ["confirm"]
        })
    }

    async fn execute(
        &self,
        args: serde_json::Value,
        session: &DiagnosticSession,
    ) -> ObdResult<ToolResult> {
        let confirmed = args
            .get("confirm")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        if !confirmed {
            return Ok(ToolResult::failure(
                self.name(),
                "Refusing to clear DTCs without confirm=true",
            ));
        }

        match session.clear_dtcs().await {
            Ok(()) => Ok(ToolResult::success(
                self.name(),
                serde_json::json!({ "cleared": true }),
                "DTCs cleared",
            )),
            Err(e) => super::fail(self.name(), e),
        }
    }
}
