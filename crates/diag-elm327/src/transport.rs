//! Adapter transport abstraction.
//!
//! The physical link (USB serial, Bluetooth SPP, Wi-Fi TCP) belongs to the
//! caller. The session only needs two things from it:
//! - `Transport::write` to push command bytes out
//! - an [`Inbound`] stream of byte chunks as they arrive, in any split
//!
//! Callback-style links can skip the channel and call
//! [`CommandSession::feed`](crate::session::CommandSession::feed) directly.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::ObdResult;

/// Inbound byte chunks from the adapter, in arrival order.
pub type Inbound = mpsc::UnboundedReceiver<Vec<u8>>;

/// Sending half handed to whatever reads the physical link.
pub type InboundSender = mpsc::UnboundedSender<Vec<u8>>;

/// Create a connected inbound pair.
pub fn inbound_channel() -> (InboundSender, Inbound) {
    mpsc::unbounded_channel()
}

/// Trait for adapter link implementations.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Write raw bytes to the adapter.
    async fn write(&self, bytes: &[u8]) -> ObdResult<()>;

    /// Whether the link is currently usable.
    fn is_connected(&self) -> bool {
        true
    }
}
