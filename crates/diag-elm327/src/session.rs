//! Command session: one outstanding command at a time over a shared link.
//!
//! A send installs a [`PendingCommand`] holding its own framing buffer and a
//! one-shot reply slot. Three things can resolve it: the prompt arriving, the
//! timer firing, or the link going away. Whichever takes the pending command
//! out of the slot first wins; the others find the slot empty and do nothing.
//!
//! The timer runs as its own task, so a caller that stops awaiting does not
//! leave the session stuck in `AwaitingResponse`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::error::{ObdError, ObdResult};
use crate::framer::ResponseFramer;
use crate::transport::{Inbound, Transport};
use crate::types::{COMMAND_TERMINATOR, RawResponse, SessionState};

/// Serialized command/response channel to one adapter.
pub struct CommandSession {
    transport: Arc<dyn Transport>,
    shared: Arc<Shared>,
    reader: JoinHandle<()>,
}

struct Shared {
    slot: Mutex<Slot>,
    state: watch::Sender<SessionState>,
}

struct Slot {
    next_id: u64,
    /// State to return to once the outstanding command resolves.
    idle: SessionState,
    closed: bool,
    pending: Option<PendingCommand>,
}

struct PendingCommand {
    id: u64,
    command: String,
    framer: ResponseFramer,
    reply: oneshot::Sender<ObdResult<RawResponse>>,
    timer: Option<JoinHandle<()>>,
}

impl CommandSession {
    /// Wrap a transport and its inbound chunk stream.
    ///
    /// Spawns the task that drains `inbound`, so this must be called from
    /// within a tokio runtime.
    pub fn new(transport: Arc<dyn Transport>, inbound: Inbound) -> Self {
        let (state, _) = watch::channel(SessionState::Ready);
        let shared = Arc::new(Shared {
            slot: Mutex::new(Slot {
                next_id: 0,
                idle: SessionState::Ready,
                closed: false,
                pending: None,
            }),
            state,
        });
        let reader = tokio::spawn(read_loop(Arc::clone(&shared), inbound));
        Self {
            transport,
            shared,
            reader,
        }
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        if !self.transport.is_connected() {
            return SessionState::Disconnected;
        }
        *self.shared.state.borrow()
    }

    /// Send one command and wait for its reply.
    ///
    /// Fails with `Busy` if another command is outstanding. On timeout, any
    /// text collected so far is returned with `complete == false`; with
    /// nothing collected the result is `Timeout`.
    pub async fn send(&self, command: &str, timeout: Duration) -> ObdResult<RawResponse> {
        if !self.transport.is_connected() {
            return Err(ObdError::NotConnected);
        }

        let (tx, rx) = oneshot::channel();
        let id = {
            let mut slot = self.shared.lock();
            if slot.closed {
                return Err(ObdError::NotConnected);
            }
            if slot.pending.is_some() {
                return Err(ObdError::Busy);
            }

            let id = slot.next_id;
            slot.next_id += 1;

            let shared = Arc::clone(&self.shared);
            let timer = tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                shared.on_timeout(id, timeout);
            });

            slot.pending = Some(PendingCommand {
                id,
                command: command.to_string(),
                framer: ResponseFramer::new(),
                reply: tx,
                timer: Some(timer),
            });
            self.shared.state.send_replace(SessionState::AwaitingResponse);
            id
        };

        let started = Instant::now();
        let line = format!("{command}{COMMAND_TERMINATOR}");
        if let Err(e) = self.transport.write(line.as_bytes()).await {
            warn!(command, error = %e, "Failed to write command");
            self.shared.resolve(id, Err(e));
        }

        let result = rx.await.unwrap_or(Err(ObdError::NotConnected));
        debug!(
            command,
            elapsed_ms = started.elapsed().as_millis() as u64,
            ok = result.is_ok(),
            "Command round trip"
        );
        result
    }

    /// Suspend until no command is outstanding.
    pub async fn wait_ready(&self) -> ObdResult<()> {
        let mut rx = self.shared.state.subscribe();
        loop {
            let state = *rx.borrow_and_update();
            match state {
                SessionState::Disconnected => return Err(ObdError::NotConnected),
                SessionState::AwaitingResponse => {}
                SessionState::Ready | SessionState::Initializing => return Ok(()),
            }
            if rx.changed().await.is_err() {
                return Err(ObdError::NotConnected);
            }
        }
    }

    /// Hand an inbound chunk to the session directly.
    ///
    /// For callback-style links that do not use the [`Inbound`] channel.
    pub fn feed(&self, chunk: &[u8]) {
        self.shared.on_chunk(chunk);
    }

    /// Idle state used between commands (`Initializing` during init).
    pub(crate) fn set_idle_state(&self, state: SessionState) {
        let mut slot = self.shared.lock();
        slot.idle = state;
        if slot.pending.is_none() && !slot.closed {
            self.shared.state.send_replace(state);
        }
    }
}

impl Drop for CommandSession {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn on_chunk(&self, chunk: &[u8]) {
        let mut slot = self.lock();
        let Some(pending) = slot.pending.as_mut() else {
            trace!(len = chunk.len(), "Discarding bytes with no command outstanding");
            return;
        };
        let Some(text) = pending.framer.push(chunk) else {
            return;
        };
        if let Some(mut pending) = slot.pending.take() {
            if let Some(timer) = pending.timer.take() {
                timer.abort();
            }
            let response = RawResponse {
                command: std::mem::take(&mut pending.command),
                text,
                complete: true,
            };
            self.finish(&slot, pending, Ok(response));
        }
    }

    fn on_timeout(&self, id: u64, timeout: Duration) {
        let mut slot = self.lock();
        if slot.pending.as_ref().is_none_or(|p| p.id != id) {
            return;
        }
        let Some(mut pending) = slot.pending.take() else {
            return;
        };
        // Running inside the timer task itself; nothing to abort.
        pending.timer = None;

        let result = match pending.framer.partial() {
            Some(text) => {
                warn!(command = %pending.command, partial = %text, "Prompt never arrived, returning partial reply");
                Ok(RawResponse {
                    command: pending.command.clone(),
                    text,
                    complete: false,
                })
            }
            None => Err(ObdError::Timeout {
                command: pending.command.clone(),
                timeout_ms: timeout.as_millis() as u64,
            }),
        };
        self.finish(&slot, pending, result);
    }

    fn on_closed(&self) {
        let mut slot = self.lock();
        slot.closed = true;
        match slot.pending.take() {
            Some(mut pending) => {
                if let Some(timer) = pending.timer.take() {
                    timer.abort();
                }
                self.finish(&slot, pending, Err(ObdError::NotConnected));
            }
            None => {
                self.state.send_replace(SessionState::Disconnected);
            }
        }
    }

    /// Resolve the pending command `id` with `result`, if it is still pending.
    fn resolve(&self, id: u64, result: ObdResult<RawResponse>) {
        let mut slot = self.lock();
        if slot.pending.as_ref().is_none_or(|p| p.id != id) {
            return;
        }
        if let Some(mut pending) = slot.pending.take() {
            if let Some(timer) = pending.timer.take() {
                timer.abort();
            }
            self.finish(&slot, pending, result);
        }
    }

    fn finish(&self, slot: &Slot, pending: PendingCommand, result: ObdResult<RawResponse>) {
        let next = if slot.closed {
            SessionState::Disconnected
        } else {
            slot.idle
        };
        self.state.send_replace(next);
        // The caller may have gone away; the session is released either way.
        let _ = pending.reply.send(result);
    }
}

async fn read_loop(shared: Arc<Shared>, mut inbound: Inbound) {
    while let Some(chunk) = inbound.recv().await {
        shared.on_chunk(&chunk);
    }
    debug!("Adapter inbound stream ended");
    shared.on_closed();
}
