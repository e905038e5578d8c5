//! Session timing configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timeouts and delays for one diagnostic session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Timeout for OBD requests (DTC, PID, VIN, voltage).
    #[serde(default = "default_command_timeout")]
    pub command_timeout_ms: u64,
    /// Timeout for each initialization step after the reset.
    #[serde(default = "default_init_timeout")]
    pub init_timeout_ms: u64,
    /// Timeout for the `ATZ` reset itself.
    #[serde(default = "default_reset_timeout")]
    pub reset_timeout_ms: u64,
    /// Pause after `ATZ` while the adapter reboots.
    #[serde(default = "default_reset_delay")]
    pub reset_delay_ms: u64,
    /// Default tick for `monitor_pids` / `wait_for_condition`.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

fn default_command_timeout() -> u64 {
    2000
}

fn default_init_timeout() -> u64 {
    1000
}

fn default_reset_timeout() -> u64 {
    3000
}

fn default_reset_delay() -> u64 {
    1000
}

fn default_poll_interval() -> u64 {
    1000
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            command_timeout_ms: default_command_timeout(),
            init_timeout_ms: default_init_timeout(),
            reset_timeout_ms: default_reset_timeout(),
            reset_delay_ms: default_reset_delay(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

impl SessionConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    pub fn init_timeout(&self) -> Duration {
        Duration::from_millis(self.init_timeout_ms)
    }

    pub fn reset_timeout(&self) -> Duration {
        Duration::from_millis(self.reset_timeout_ms)
    }

    pub fn reset_delay(&self) -> Duration {
        Duration::from_millis(self.reset_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
