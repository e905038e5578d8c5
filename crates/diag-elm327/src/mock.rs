//! Mock ELM327 adapter for testing.
//!
//! Supports scripted per-command replies and write recording. All tests use
//! this instead of a real adapter so the suite runs in CI on any machine.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{ObdError, ObdResult};
use crate::transport::{Inbound, InboundSender, Transport, inbound_channel};

/// How the mock answers one command.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Reply text; `\r\r>` is appended like a real adapter does.
    Text(String),
    /// Exact byte chunks, delivered as-is (no prompt added).
    Chunks(Vec<Vec<u8>>),
    /// Never answer.
    Silent,
}

/// Mock adapter with scripted replies and write recording.
///
/// Replies are queued per command text. The last queued reply for a
/// command is sticky: it keeps being returned once the queue is down to it.
/// Unscripted commands get `?`, the adapter's "unknown command" reply.
pub struct MockAdapter {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    /// Every write, verbatim (terminator included).
    written: Mutex<Vec<String>>,
    inbound: Mutex<Option<InboundSender>>,
    connected: AtomicBool,
    fail_writes: AtomicBool,
    /// Split text replies into chunks of this many bytes (0 = one chunk).
    chunk_size: AtomicUsize,
}

impl MockAdapter {
    /// Create a new mock with no scripted replies.
    pub fn new() -> (Arc<Self>, Inbound) {
        let (tx, rx) = inbound_channel();
        let mock = Self {
            replies: Mutex::new(HashMap::new()),
            written: Mutex::new(Vec::new()),
            inbound: Mutex::new(Some(tx)),
            connected: AtomicBool::new(true),
            fail_writes: AtomicBool::new(false),
            chunk_size: AtomicUsize::new(0),
        };
        (Arc::new(mock), rx)
    }

    /// Create a mock pre-loaded with the replies an ELM327 v1.5 gives to the
    /// initialization sequence.
    pub fn elm327() -> (Arc<Self>, Inbound) {
        let (mock, rx) = Self::new();
        mock.reply("ATZ", "ELM327 v1.5");
        for cmd in ["ATE0", "ATL0", "ATH0", "ATS0", "ATSP0", "ATAT1"] {
            mock.reply(cmd, "OK");
        }
        (mock, rx)
    }

    fn enqueue(&self, command: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .entry(command.to_string())
            .or_default()
            .push_back(reply);
    }

    /// Queue a text reply for `command`.
    pub fn reply(&self, command: &str, text: &str) {
        self.enqueue(command, Reply::Text(text.to_string()));
    }

    /// Queue several text replies for `command`, returned in order.
    pub fn reply_sequence(&self, command: &str, texts: &[&str]) {
        for text in texts {
            self.reply(command, text);
        }
    }

    /// Queue an exact chunk sequence for `command`.
    pub fn reply_chunks(&self, command: &str, chunks: Vec<Vec<u8>>) {
        self.enqueue(command, Reply::Chunks(chunks));
    }

    /// Never answer `command`.
    pub fn silent(&self, command: &str) {
        self.enqueue(command, Reply::Silent);
    }

    /// Deliver text replies in chunks of `n` bytes.
    pub fn split_replies(&self, n: usize) {
        self.chunk_size.store(n, Ordering::SeqCst);
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Make every subsequent write fail with a transport error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Push bytes that were not asked for (late or stray data).
    pub fn push_unsolicited(&self, bytes: &[u8]) {
        if let Some(tx) = self.inbound.lock().unwrap().as_ref() {
            let _ = tx.send(bytes.to_vec());
        }
    }

    /// End the inbound stream, as if the link dropped.
    pub fn close(&self) {
        self.inbound.lock().unwrap().take();
    }

    /// Commands written so far, terminator stripped.
    pub fn commands(&self) -> Vec<String> {
        self.written
            .lock()
            .unwrap()
            .iter()
            .map(|w| w.trim_end_matches('\r').to_string())
            .collect()
    }

    /// Raw writes, terminator included.
    pub fn raw_writes(&self) -> Vec<String> {
        self.written.lock().unwrap().clone()
    }

    /// How many times `command` was written.
    pub fn count(&self, command: &str) -> usize {
        self.commands().iter().filter(|c| c.as_str() == command).count()
    }

    fn next_reply(&self, command: &str) -> Reply {
        let mut replies = self.replies.lock().unwrap();
        match replies.get_mut(command) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(Reply::Silent),
            Some(queue) => queue.front().cloned().unwrap_or(Reply::Silent),
            None => Reply::Text("?".to_string()),
        }
    }

    fn chunks_for(&self, reply: Reply) -> Vec<Vec<u8>> {
        match reply {
            Reply::Text(text) => {
                let bytes = format!("{text}\r\r>").into_bytes();
                match self.chunk_size.load(Ordering::SeqCst) {
                    0 => vec![bytes],
                    n => bytes.chunks(n).map(<[u8]>::to_vec).collect(),
                }
            }
            Reply::Chunks(chunks) => chunks,
            Reply::Silent => Vec::new(),
        }
    }
}

#[async_trait]
impl Transport for MockAdapter {
    async fn write(&self, bytes: &[u8]) -> ObdResult<()> {
        if !self.is_connected() {
            return Err(ObdError::NotConnected);
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ObdError::Transport("mock write failure".into()));
        }

        let raw = String::from_utf8_lossy(bytes).to_string();
        let command = raw.trim_end_matches('\r').to_string();
        self.written.lock().unwrap().push(raw);

        let chunks = self.chunks_for(self.next_reply(&command));
        if let Some(tx) = self.inbound.lock().unwrap().as_ref() {
            for chunk in chunks {
                let _ = tx.send(chunk);
            }
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut Inbound) -> Vec<u8> {
        let mut out = Vec::new();
        while let Ok(chunk) = rx.try_recv() {
            out.extend(chunk);
        }
        out
    }

    #[tokio::test]
    async fn records_writes() {
        let (mock, _rx) = MockAdapter::new();
        mock.write(b"ATE0\r").await.unwrap();

        assert_eq!(mock.commands(), vec!["ATE0"]);
        assert_eq!(mock.raw_writes(), vec!["ATE0\r"]);
        assert_eq!(mock.count("ATE0"), 1);
    }

    #[tokio::test]
    async fn answers_with_prompt() {
        let (mock, mut rx) = MockAdapter::new();
        mock.reply("010D", "41 0D 3C");
        mock.write(b"010D\r").await.unwrap();

        assert_eq!(drain(&mut rx), b"41 0D 3C\r\r>");
    }

    #[tokio::test]
    async fn last_reply_is_sticky() {
        let (mock, mut rx) = MockAdapter::new();
        mock.reply_sequence("0105", &["41 05 6E", "41 05 70"]);

        for _ in 0..3 {
            mock.write(b"0105\r").await.unwrap();
        }
        let all = String::from_utf8(drain(&mut rx)).unwrap();
        assert_eq!(all.matches("41 05 6E").count(), 1);
        assert_eq!(all.matches("41 05 70").count(), 2);
    }

    #[tokio::test]
    async fn unscripted_command_gets_question_mark() {
        let (mock, mut rx) = MockAdapter::new();
        mock.write(b"ATXYZ\r").await.unwrap();
        assert_eq!(drain(&mut rx), b"?\r\r>");
    }

    #[tokio::test]
    async fn splits_text_replies() {
        let (mock, mut rx) = MockAdapter::new();
        mock.split_replies(2);
        mock.reply("ATE0", "OK");
        mock.write(b"ATE0\r").await.unwrap();

        let mut chunks = Vec::new();
        while let Ok(chunk) = rx.try_recv() {
            chunks.push(chunk);
        }
        assert_eq!(chunks, vec![b"OK".to_vec(), b"\r\r".to_vec(), b">".to_vec()]);
    }

    #[tokio::test]
    async fn disconnected_rejects_writes() {
        let (mock, _rx) = MockAdapter::new();
        mock.set_connected(false);
        let result = mock.write(b"ATZ\r").await;
        assert!(matches!(result, Err(ObdError::NotConnected)));
        assert!(mock.commands().is_empty());
    }

    #[tokio::test]
    async fn close_ends_inbound() {
        let (mock, mut rx) = MockAdapter::new();
        mock.close();
        assert!(rx.recv().await.is_none());
    }
}
