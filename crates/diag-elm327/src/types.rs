//! Core OBD-II constants, session state, and the DiagTool trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::diagnostics::DiagnosticSession;
use crate::error::ObdResult;

// ── Wire framing ────────────────────────────────────────────────

/// Prompt character the adapter prints when it is ready for the next command.
pub const PROMPT: u8 = b'>';

/// Terminator appended to every command.
pub const COMMAND_TERMINATOR: &str = "\r";

// ── OBD-II Modes ────────────────────────────────────────────────

/// Mode 01: Show current data (live PIDs).
pub const MODE_CURRENT_DATA: u8 = 0x01;

/// Mode 03: Show stored DTCs.
pub const MODE_STORED_DTCS: u8 = 0x03;

/// Mode 04: Clear DTCs and stored values.
pub const MODE_CLEAR_DTCS: u8 = 0x04;

/// Mode 07: Show pending DTCs (current or last driving cycle).
pub const MODE_PENDING_DTCS: u8 = 0x07;

/// Mode 09: Request vehicle information (VIN, etc.).
pub const MODE_VEHICLE_INFO: u8 = 0x09;

/// Mode 09 info type for the VIN.
pub const INFO_TYPE_VIN: u8 = 0x02;

/// Offset added to request mode to get response SID.
pub const RESPONSE_SID_OFFSET: u8 = 0x40;

/// Adapter-level battery voltage query (not an OBD-II PID).
pub const VOLTAGE_COMMAND: &str = "ATRV";

// ── Session state ───────────────────────────────────────────────

/// Lifecycle of a command session. Only the session mutates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Disconnected,
    Initializing,
    Ready,
    AwaitingResponse,
}

/// Finalized reply to one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// Command text as sent, without the terminator.
    pub command: String,
    /// Reply text with the prompt and surrounding whitespace removed.
    pub text: String,
    /// `false` when the prompt never arrived and this is the partial buffer
    /// collected before the timeout.
    pub complete: bool,
}

// ── Tool Result ─────────────────────────────────────────────────

/// Result of executing a diagnostic tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Tool name that produced this result.
    pub tool_name: String,
    /// Whether the tool execution succeeded.
    pub success: bool,
    /// Structured result data (JSON).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Human-readable summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Error message if success is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn success(
        tool_name: impl Into<String>,
        data: serde_json::Value,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: true,
            data: Some(data),
            summary: Some(summary.into()),
            error: None,
        }
    }

    pub fn failure(tool_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: false,
            data: None,
            summary: None,
            error: Some(error.into()),
        }
    }
}

// ── DiagTool Trait ──────────────────────────────────────────────

/// A named diagnostic operation callable with JSON arguments.
///
/// This is the surface the diagnosis layer and the agent use; each tool is a
/// thin wrapper over one [`DiagnosticSession`] operation.
#[async_trait]
pub trait DiagTool: Send + Sync {
    /// Tool name (e.g., "read_dtcs").
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// JSON Schema describing accepted arguments.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with JSON arguments against a diagnostic session.
    async fn execute(
        &self,
        args: serde_json::Value,
        session: &DiagnosticSession,
    ) -> ObdResult<ToolResult>;
}
