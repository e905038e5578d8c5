//! Tool: One-pass vehicle snapshot (codes, common PIDs, battery voltage).

use async_trait::async_trait;

use crate::diagnostics::DiagnosticSession;
use crate::error::ObdResult;
use crate::types::{DiagTool, ToolResult};

pub struct DiagnosticSnapshotTool;

#[async_trait]
impl DiagTool for DiagnosticSnapshotTool {
    fn name(&self) -> &str {
        "diagnostic_snapshot"
    }

    fn description(&self) -> &str {
        "Read stored and pending DTCs, the common live PIDs and battery voltage in one pass"
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
        let snapshot = match session.diagnostic_snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => return super::fail(self.name(), e),
        };

        let dtc_count = snapshot.dtcs.as_ref().map_or(0, Vec::len);
        let mut summary = format!(
            "{} stored DTC(s), {} reading(s)",
            dtc_count,
            snapshot.readings.len()
        );
        if !snapshot.failures.is_empty() {
            let failed: Vec<&str> = snapshot.failures.iter().map(|f| f.read.as_str()).collect();
            summary.push_str(&format!(", failed: {}", failed.join(", ")));
        }

        let data = serde_json::to_value(&snapshot).unwrap_or_default();
        Ok(ToolResult::success(self.name(), data, summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::session;

    #[tokio::test(start_paused = true)]
    async fn partial_snapshot_still_succeeds() {
        let (mock, s) = session();
        mock.reply("03", "43 01 71 00 00 00 00");
        mock.reply("07", "NO DATA");
        mock.reply("010C", "41 0C 1A F8");
        mock.reply("ATRV", "12.6V");

        let result = DiagnosticSnapshotTool
            .execute(serde_json::json!({}), &s)
            .await
            .unwrap();

        assert!(result.success);
        let summary = result.summary.unwrap();
        assert!(summary.starts_with("1 stored DTC(s), 1 reading(s)"));
        assert!(summary.contains("vehicle_speed"));

        let data = result.data.unwrap();
        assert_eq!(data["dtcs"][0]["code"], "P0171");
        assert_eq!(data["pending_dtcs"], serde_json::json!([]));
        assert_eq!(data["readings"][0]["name"], "engine_rpm");
        assert_eq!(data["battery_voltage"], 12.6);
        assert_eq!(data["failures"].as_array().unwrap().len(), 7);
    }
}
