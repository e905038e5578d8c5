//! Adapter initialization sequence.
//!
//! Brings an ELM327-style adapter to a known state: reset, then echo,
//! linefeeds, headers and spaces off, automatic protocol, adaptive timing.
//! Every step waits for the previous one to resolve. Running the sequence on
//! an adapter that is already initialized leaves it in the same state.

use tracing::{debug, info};

use crate::config::SessionConfig;
use crate::error::{ObdError, ObdResult};
use crate::response;
use crate::session::CommandSession;
use crate::types::SessionState;

/// One administrative command of the sequence.
#[derive(Debug, Clone, Copy)]
pub struct InitStep {
    pub command: &'static str,
    pub purpose: &'static str,
}

const RESET: &str = "ATZ";

/// The sequence, in the order it is sent.
pub const INIT_SEQUENCE: &[InitStep] = &[
    InitStep {
        command: RESET,
        purpose: "reset adapter",
    },
    InitStep {
        command: "ATE0",
        purpose: "echo off",
    },
    InitStep {
        command: "ATL0",
        purpose: "linefeeds off",
    },
    InitStep {
        command: "ATH0",
        purpose: "headers off",
    },
    InitStep {
        command: "ATS0",
        purpose: "spaces off",
    },
    InitStep {
        command: "ATSP0",
        purpose: "automatic protocol",
    },
    InitStep {
        command: "ATAT1",
        purpose: "adaptive timing",
    },
];

/// Restores the `Ready` idle state when dropped, so a sequence that fails or
/// whose future is dropped mid-step never leaves the session `Initializing`.
struct IdleGuard<'a>(&'a CommandSession);

impl Drop for IdleGuard<'_> {
    fn drop(&mut self) {
        self.0.set_idle_state(SessionState::Ready);
    }
}

/// Run the full sequence.
///
/// Returns the adapter identification printed on reset (e.g. `ELM327 v1.5`).
/// The session reports `Initializing` while this runs and `Ready` afterwards,
/// including after a failed step or a cancelled call.
pub async fn initialize(session: &CommandSession, config: &SessionConfig) -> ObdResult<String> {
    session.set_idle_state(SessionState::Initializing);
    let guard = IdleGuard(session);
    let result = run_sequence(session, config).await;
    drop(guard);

    if let Ok(identity) = &result {
        info!(adapter = %identity, "Adapter initialized");
    }
    result
}

async fn run_sequence(session: &CommandSession, config: &SessionConfig) -> ObdResult<String> {
    let mut identity = String::new();

    for step in INIT_SEQUENCE {
        let timeout = if step.command == RESET {
            config.reset_timeout()
        } else {
            config.init_timeout()
        };

        let reply = run_step(session, step, timeout)
            .await
            .map_err(|source| ObdError::InitFailed {
                step: step.command,
                source: Box::new(source),
            })?;

        if step.command == RESET {
            identity = reply;
            tokio::time::sleep(config.reset_delay()).await;
        }
    }

    Ok(identity)
}

async fn run_step(
    session: &CommandSession,
    step: &InitStep,
    timeout: std::time::Duration,
) -> ObdResult<String> {
    let response = session.send(step.command, timeout).await?;
    let lines = response::lines(&response.text, step.command);
    if lines.iter().any(|line| *line == "?") {
        return Err(ObdError::InvalidResponse(format!(
            "adapter rejected '{}'",
            step.command
        )));
    }

    let reply = lines.join(" ");
    debug!(command = step.command, purpose = step.purpose, reply = %reply, "Init step done");
    Ok(reply)
}
