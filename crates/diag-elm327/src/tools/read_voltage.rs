//! Tool: Read battery voltage at the adapter (`ATRV`).

use async_trait::async_trait;

use crate::diagnostics::DiagnosticSession;
use crate::error::ObdResult;
use crate::types::{DiagTool, ToolResult};

pub struct ReadVoltage;

#[async_trait]
impl DiagTool for ReadVoltage {
    fn name(&self) -> &str {
        "read_voltage"
    }

    fn description(&self) -> &str {
        "Read the vehicle battery voltage measured by the adapter"
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
        match session.read_battery_voltage().await {
            Ok(voltage) => Ok(ToolResult::success(
                self.name(),
                serde_json::json!({ "voltage": voltage, "unit": "V" }),
                format!("Battery voltage: {voltage:.1} V"),
            )),
            Err(e) => super::fail(self.name(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::session;

    #[tokio::test(start_paused = true)]
    async fn reads_voltage() {
        let (mock, s) = session();
        mock.reply("ATRV", "12.6V");

        let result = ReadVoltage
            .execute(serde_json::json!({}), &s)
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.data.unwrap()["voltage"], 12.6);
        assert_eq!(result.summary.unwrap(), "Battery voltage: 12.6 V");
    }

    #[tokio::test(start_paused = true)]
    async fn unparsable_reads_zero() {
        let (mock, s) = session();
        mock.reply("ATRV", "LV RESET");

        let result = ReadVoltage
            .execute(serde_json::json!({}), &s)
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.data.unwrap()["voltage"], 0.0);
    }
}
