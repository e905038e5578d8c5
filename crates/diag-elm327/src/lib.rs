//! OBD-II diagnostic session engine for ELM327-style adapters.
//!
//! Layers, bottom up: a [`Transport`] the caller owns, the
//! [`ResponseFramer`] and [`CommandSession`] that turn its byte stream into
//! one reply per command, pure decoders ([`dtc`], [`pid`], [`vin`]), and the
//! [`DiagnosticSession`] façade with its JSON [`tools`].

pub mod config;
pub mod diagnostics;
pub mod dtc;
pub mod error;
pub mod framer;
pub mod init;
pub mod mock;
pub mod pid;
pub mod response;
pub mod safety;
pub mod session;
pub mod tools;
pub mod transport;
pub mod types;
pub mod vin;

pub use config::SessionConfig;
pub use diagnostics::{Comparison, DiagnosticSession};
pub use error::{ObdError, ObdResult};
pub use framer::ResponseFramer;
pub use mock::MockAdapter;
pub use pid::PidDescriptor;
pub use session::CommandSession;
pub use transport::{Inbound, InboundSender, Transport, inbound_channel};
pub use types::{DiagTool, RawResponse, SessionState, ToolResult};
