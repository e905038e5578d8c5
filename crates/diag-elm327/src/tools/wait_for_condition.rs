//! Tool: Poll a PID until a threshold condition holds.

use std::time::Duration;

use async_trait::async_trait;

use crate::diagnostics::{Comparison, DiagnosticSession};
use crate::error::{ObdError, ObdResult};
use crate::types::{DiagTool, ToolResult};

/// Longest wait the tool accepts.
const MAX_TIMEOUT_SECS: f64 = 3600.0;

pub struct WaitForCondition;

#[async_trait]
impl DiagTool for WaitForCondition {
    fn name(&self) -> &str {
        "wait_for_condition"
    }

    fn description(&self) -> &str {
        "Poll a live PID until it satisfies a comparison (>, <, >=, <=, ==) or the timeout expires"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "pid": { "type": ["integer", "string"], "description": "PID number or name" },
                "operator": { "type": "string", "enum": [">", "<", ">=", "<=", "==", "equals"] },
                "value": { "type": "number", "description": "Target value" },
                "timeout_secs": { "type": "number", "description": "Give up after this many seconds" },
                "tolerance": { "type": "number", "description": "Allowed difference for ==", "default": 0 },
                "interval_ms": { "type": "integer", "description": "Polling interval; defaults to the session poll interval" }
            },
            "required": ["pid", "operator", "value", "timeout_secs"]
        })
    }

    async fn execute(
        &self,
        args: serde_json::Value,
        session: &DiagnosticSession,
    ) -> ObdResult<ToolResult> {
        let parsed = (|| -> ObdResult<_> {
            let pid = args
                .get("pid")
                .ok_or_else(|| ObdError::InvalidArgument("missing pid".into()))
                .and_then(super::pid_arg)?;
            let op: Comparison = args
                .get("operator")
                .and_then(|v| v.as_str())
                .ok_or_else(|| ObdError::InvalidArgument("missing operator".into()))?
                .parse()?;
            let value = args
                .get("value")
                .and_then(|v| v.as_f64())
                .ok_or_else(|| ObdError::InvalidArgument("missing value".into()))?;
            let timeout = args
                .get("timeout_secs")
                .and_then(|v| v.as_f64())
                .filter(|t| *t > 0.0 && *t <= MAX_TIMEOUT_SECS)
                .map(Duration::from_secs_f64)
                .ok_or_else(|| {
                    ObdError::InvalidArgument(format!(
                        "timeout_secs must be in (0, {MAX_TIMEOUT_SECS}]"
                    ))
                })?;
            let tolerance = args.get("tolerance").and_then(|v| v.as_f64()).unwrap_or(0.0);
            let interval = super::interval_arg(&args)?;
            Ok((pid, op, value, timeout, tolerance, interval))
        })();

        let (desc, op, target, timeout, tolerance, interval) = match parsed {
            Ok(parsed) => parsed,
            Err(e) => return super::fail(self.name(), e),
        };

        match session
            .wait_for_condition(desc.pid, op, target, timeout, tolerance, interval)
            .await
        {
            Ok(sample) => {
                let summary = format!(
                    "{} reached {} {} ({op} {target})",
                    desc.label, sample.value, sample.unit
                );
                let data = serde_json::json!({ "met": true, "sample": sample });
                Ok(ToolResult::success(self.name(), data, summary))
            }
            Err(e) => {
                let ObdError::WaitTimeout { last_value, .. } = e else {
                    return super::fail(self.name(), e);
                };
                Ok(ToolResult {
                    data: Some(serde_json::json!({ "met": false, "last_value": last_value })),
                    ..ToolResult::failure(self.name(), e.to_string())
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::session;

    #[tokio::test(start_paused = true)]
    async fn condition_met() {
        let (mock, s) = session();
        mock.reply_sequence("0105", &["41 05 46", "41 05 82"]);

        let args = serde_json::json!({
            "pid": "coolant_temp",
            "operator": ">=",
            "value": 90,
            "timeout_secs": 10
        });
        let result = WaitForCondition.execute(args, &s).await.unwrap();

        assert!(result.success);
        let data = result.data.unwrap();
        assert_eq!(data["met"], true);
        assert_eq!(data["sample"]["value"], 90.0);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_reports_last_value() {
        let (mock, s) = session();
        mock.reply("010C", "41 0C 1C 20");

        let args = serde_json::json!({
            "pid": 12,
            "operator": ">",
            "value": 3000,
            "timeout_secs": 5
        });
        let result = WaitForCondition.execute(args, &s).await.unwrap();

        assert!(!result.success);
        let data = result.data.unwrap();
        assert_eq!(data["met"], false);
        assert_eq!(data["last_value"], 1800.0);
        assert!(result.error.unwrap().contains("1800"));
    }

    #[tokio::test(start_paused = true)]
    async fn bad_operator() {
        let (mock, s) = session();
        let args = serde_json::json!({
            "pid": 12,
            "operator": "~",
            "value": 3000,
            "timeout_secs": 5
        });
        let result = WaitForCondition.execute(args, &s).await.unwrap();

        assert!(!result.success);
        assert!(result.error.unwrap().contains("operator"));
        assert!(mock.commands().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn out_of_range_timings_are_rejected() {
        let (mock, s) = session();

        for (timeout_secs, interval_ms) in [
            (serde_json::json!(1e30), serde_json::json!(100)),
            (serde_json::json!(f64::MAX), serde_json::json!(100)),
            (serde_json::json!(-1), serde_json::json!(100)),
            (serde_json::json!(3601), serde_json::json!(100)),
            (serde_json::json!(5), serde_json::json!(0)),
            (serde_json::json!(5), serde_json::json!(u64::MAX)),
        ] {
            let args = serde_json::json!({
                "pid": 12,
                "operator": ">",
                "value": 3000,
                "timeout_secs": timeout_secs,
                "interval_ms": interval_ms
            });
            let result = WaitForCondition.execute(args.clone(), &s).await.unwrap();
            assert!(!result.success, "{args}");
        }
        assert!(mock.commands().is_empty());
    }
}
