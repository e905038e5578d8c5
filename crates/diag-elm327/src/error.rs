//! Diagnostic session error types.

use thiserror::Error;

/// Errors that can occur while talking to an OBD-II adapter.
#[derive(Debug, Error)]
pub enum ObdError {
    #[error("adapter not connected")]
    NotConnected,

    #[error("no response to '{command}' after {timeout_ms}ms")]
    Timeout { command: String, timeout_ms: u64 },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("no data for '{command}'")]
    NoData { command: String },

    #[error("a command is already awaiting a response")]
    Busy,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unknown PID 0x{pid:02X}")]
    UnknownPid { pid: u8 },

    #[error("Safety violation: mode 0x{mode:02X} is not allowed")]
    SafetyViolation { mode: u8 },

    #[error("adapter error: {0}")]
    Adapter(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("initialization failed at '{step}': {source}")]
    InitFailed {
        step: &'static str,
        #[source]
        source: Box<ObdError>,
    },

    #[error("{name} condition not met within {timeout_ms}ms (last value: {})", fmt_last(.last_value))]
    WaitTimeout {
        name: String,
        last_value: Option<f64>,
        timeout_ms: u64,
    },
}

fn fmt_last(value: &Option<f64>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "none".to_string(),
    }
}

impl ObdError {
    /// True for both a silent command and an unmet wait condition.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ObdError::Timeout { .. } | ObdError::WaitTimeout { .. })
    }
}

impl From<std::io::Error> for ObdError {
    fn from(err: std::io::Error) -> Self {
        ObdError::Transport(err.to_string())
    }
}

/// Convenience alias for diagnostic results.
pub type ObdResult<T> = Result<T, ObdError>;
