//! Tool: Sample several PIDs over a time window and aggregate them.

use std::time::Duration;

use async_trait::async_trait;

use crate::diagnostics::DiagnosticSession;
use crate::error::ObdResult;
use crate::types::{DiagTool, ToolResult};

/// Longest window the tool accepts.
const MAX_DURATION_SECS: f64 = 600.0;

pub struct MonitorPids;

#[async_trait]
impl DiagTool for MonitorPids {
    fn name(&self) -> &str {
        "monitor_pids"
    }

    fn description(&self) -> &str {
        "Poll live PIDs at a fixed interval for a duration and return min/max/avg per PID"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "pids": {
                    "type": "array",
                    "items": { "type": ["integer", "string"] },
                    "description": "PIDs to sample, by number or name"
                },
                "duration_secs": { "type": "number", "description": "Window length in seconds" },
                "interval_ms": { "type": "integer", "description": "Sampling interval; defaults to the session poll interval" }
            },
            "required": ["pids", "duration_secs"]
        })
    }

    async fn execute(
        &self,
        args: serde_json::Value,
        session: &DiagnosticSession,
    ) -> ObdResult<ToolResult> {
        let Some(list) = args.get("pids").and_then(|v| v.as_array()) else {
            return Ok(ToolResult::failure(
                self.name(),
                "Missing required argument: pids (array)",
            ));
        };
        if list.is_empty() {
            return Ok(ToolResult::failure(self.name(), "pids must not be empty"));
        }

        let mut pids = Vec::with_capacity(list.len());
        for raw in list {
            match super::pid_arg(raw) {
                Ok(desc) => pids.push(desc.pid),
                Err(e) => return super::fail(self.name(), e),
            }
        }

        let duration_secs = match args.get("duration_secs").and_then(|v| v.as_f64()) {
            Some(d) if d > 0.0 && d <= MAX_DURATION_SECS => d,
            _ => {
                return Ok(ToolResult::failure(
                    self.name(),
                    format!("duration_secs must be in (0, {MAX_DURATION_SECS}]"),
                ));
            }
        };
        let interval = match super::interval_arg(&args) {
            Ok(interval) => interval.unwrap_or_else(|| session.config().poll_interval()),
            Err(e) => return super::fail(self.name(), e),
        };

        let results = match session
            .monitor_pids(&pids, Duration::from_secs_f64(duration_secs), interval)
            .await
        {
            Ok(results) => results,
            Err(e) => return super::fail(self.name(), e),
        };

        let parts: Vec<String> = results
            .iter()
            .map(|r| match (r.min, r.max, r.avg) {
                (Some(min), Some(max), Some(avg)) => format!(
                    "{} min {min:.1} max {max:.1} avg {avg:.1} {} ({} samples)",
                    r.name, r.unit, r.count
                ),
                _ => format!("{} no samples", r.name),
            })
            .collect();
        let summary = parts.join("; ");
        let data = serde_json::to_value(&results).unwrap_or_default();
        Ok(ToolResult::success(self.name(), data, summary))
    }
}
