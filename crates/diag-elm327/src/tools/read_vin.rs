//! Tool: Read Vehicle Identification Number (Mode 0x09, PID 0x02).
//!
//! The VIN spans several reply lines; the session joins them in arrival
//! order.

use async_trait::async_trait;

use crate::diagnostics::DiagnosticSession;
use crate::error::ObdResult;
use crate::types::{DiagTool, ToolResult};

/// Standard VIN length.
const VIN_LEN: usize = 17;

/// Reads the VIN via OBD-II Mode 0x09 PID 0x02.
pub struct ReadVin;

#[async_trait]
impl DiagTool for ReadVin {
    fn name(&self) -> &str {
        "read_vin"
    }

    fn description(&self) -> &str {
        "Read the Vehicle Identification Number (VIN) via Mode 0x09 PID 0x02"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(
        &self,
        _args: serde_json::Value,
        session: &DiagnosticSession,
    ) -> ObdResult<ToolResult> {
        let vin = match session.read_vin().await {
            Ok(vin) => vin,
            Err(e) => return super::fail(self.name(), e),
        };

        if vin.is_empty() {
            return Ok(ToolResult::failure(self.name(), "VIN reply was not ASCII"));
        }

        let summary = if vin.len() == VIN_LEN {
            format!("VIN: {vin}")
        } else {
            format!("VIN: {vin} (unexpected length {})", vin.len())
        };
        let data = serde_json::json!({ "vin": vin, "valid_length": vin.len() == VIN_LEN });
        Ok(ToolResult::success(self.name(), data, summary))
    }
}
