//! Diagnostic agent: library half of the `diag-agent` binary.
//!
//! Exposes the config loader, the TCP / serial stream transport and the
//! tool registry so `diag-e2e-tests` can drive them without the binary.

pub mod config;
pub mod registry;
pub mod stream;

pub use config::{AdapterConfig, AgentConfig};
pub use registry::{DispatchError, ToolRegistry};
pub use stream::StreamTransport;
