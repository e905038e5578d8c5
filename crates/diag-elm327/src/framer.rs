//! Response framing: accumulate inbound chunks until the adapter prompt.
//!
//! The adapter gives no length prefix; a reply is everything received
//! between the command write and the `>` prompt, split across however many
//! chunks the link happened to deliver.

use crate::types::PROMPT;

/// Accumulation buffer for exactly one outstanding command.
#[derive(Debug, Default)]
pub struct ResponseFramer {
    buf: Vec<u8>,
}

impl ResponseFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk. Returns the finalized reply once the prompt shows up.
    ///
    /// The reply is the text before the prompt, trimmed. Anything after the
    /// prompt in the same chunk is dropped, and the buffer is left empty.
    /// NUL bytes (emitted by some clones before the prompt) are ignored.
    pub fn push(&mut self, chunk: &[u8]) -> Option<String> {
        self.buf.extend(chunk.iter().copied().filter(|&b| b != 0x00));

        let pos = self.buf.iter().position(|&b| b == PROMPT)?;
        let text = String::from_utf8_lossy(&self.buf[..pos]).trim().to_string();
        self.buf.clear();
        Some(text)
    }

    /// Best-effort text collected so far, if any non-whitespace arrived.
    pub fn partial(&self) -> Option<String> {
        let text = String::from_utf8_lossy(&self.buf).trim().to_string();
        if text.is_empty() { None } else { Some(text) }
    }
}
