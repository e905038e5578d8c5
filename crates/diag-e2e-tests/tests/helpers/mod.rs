//! Shared test harness for E2E tests.
//!
//! Wires the agent's tool registry to a real `DiagnosticSession` over a
//! scripted `MockAdapter`, so every call crosses the same crate boundaries
//! the binary does.

#![allow(dead_code)]

use std::sync::Arc;

use diag_agent::registry::{DispatchError, ToolRegistry};
use diag_elm327::{DiagnosticSession, Inbound, MockAdapter, SessionConfig, ToolResult};

/// RPM 1726, speed 60 km/h, coolant 30 °C, load ~50 %, throttle ~20 %,
/// IAT 25 °C, MAF 12.5 g/s, fuel 75 %.
pub const RUNNING_ENGINE: &[(&str, &str)] = &[
    ("010C", "41 0C 1A F8"),
    ("010D", "41 0D 3C"),
    ("0105", "41 05 46"),
    ("0104", "41 04 80"),
    ("0111", "41 11 33"),
    ("010F", "41 0F 41"),
    ("0110", "41 10 04 E2"),
    ("012F", "41 2F BF"),
    ("ATRV", "12.6V"),
];

/// Agent-side harness over a mock ELM327.
pub struct TestHarness {
    pub mock: Arc<MockAdapter>,
    pub session: DiagnosticSession,
    pub registry: ToolRegistry,
}

impl TestHarness {
    /// Adapter that answers the init sequence like an ELM327 v1.5.
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    pub fn with_config(config: SessionConfig) -> Self {
        Self::build(MockAdapter::elm327(), config)
    }

    /// Adapter with nothing scripted, not even the init sequence.
    pub fn blank() -> Self {
        Self::build(MockAdapter::new(), SessionConfig::default())
    }

    fn build((mock, inbound): (Arc<MockAdapter>, Inbound), config: SessionConfig) -> Self {
        let session = DiagnosticSession::new(mock.clone(), inbound, config);
        Self {
            mock,
            session,
            registry: ToolRegistry::with_defaults(),
        }
    }

    /// Harness with every common PID and the battery voltage scripted.
    pub fn running_engine() -> Self {
        let h = Self::new();
        for (command, reply) in RUNNING_ENGINE {
            h.mock.reply(command, reply);
        }
        h
    }

    /// Initialize the adapter and return its identity string.
    pub async fn ready(&self) -> String {
        self.session
            .initialize()
            .await
            .expect("adapter initialization failed")
    }

    /// Dispatch a tool the way the agent binary does.
    pub async fn run(
        &self,
        tool: &str,
        args: serde_json::Value,
    ) -> Result<ToolResult, DispatchError> {
        self.registry.dispatch(tool, args, &self.session).await
    }

    /// OBD commands written after initialization (AT setup filtered out).
    pub fn obd_commands(&self) -> Vec<String> {
        self.mock
            .commands()
            .into_iter()
            .filter(|c| !c.starts_with("AT") || c == "ATRV")
            .collect()
    }
}
