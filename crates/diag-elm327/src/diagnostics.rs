//! Diagnostic session: the read / monitor / wait surface over one adapter.
//!
//! Every operation takes the dispatch gate and then waits for the command
//! session to be free, so concurrent callers queue up behind each other
//! instead of tripping over `Busy`. Outgoing OBD requests pass the safety
//! guard before anything is written.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use diag_protocol::{DiagnosticSnapshot, Dtc, LiveSample, MonitorResult, ReadFailure};
use tokio::sync::Mutex;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::dtc;
use crate::error::{ObdError, ObdResult};
use crate::init;
use crate::pid::{self, COMMON_PIDS};
use crate::response;
use crate::safety;
use crate::session::CommandSession;
use crate::transport::{Inbound, Transport};
use crate::types::{
    INFO_TYPE_VIN, MODE_CLEAR_DTCS, MODE_PENDING_DTCS, MODE_STORED_DTCS, MODE_VEHICLE_INFO,
    RESPONSE_SID_OFFSET, RawResponse, SessionState, VOLTAGE_COMMAND,
};

/// Comparison used by [`DiagnosticSession::wait_for_condition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Greater,
    Less,
    GreaterOrEqual,
    LessOrEqual,
    /// `|reading - target| <= tolerance`
    Equal,
}

impl Comparison {
    pub fn holds(self, reading: f64, target: f64, tolerance: f64) -> bool {
        match self {
            Comparison::Greater => reading > target,
            Comparison::Less => reading < target,
            Comparison::GreaterOrEqual => reading >= target,
            Comparison::LessOrEqual => reading <= target,
            Comparison::Equal => (reading - target).abs() <= tolerance.abs(),
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Comparison::Greater => ">",
            Comparison::Less => "<",
            Comparison::GreaterOrEqual => ">=",
            Comparison::LessOrEqual => "<=",
            Comparison::Equal => "==",
        }
    }
}

impl FromStr for Comparison {
    type Err = ObdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            ">" | "gt" => Ok(Comparison::Greater),
            "<" | "lt" => Ok(Comparison::Less),
            ">=" | "gte" => Ok(Comparison::GreaterOrEqual),
            "<=" | "lte" => Ok(Comparison::LessOrEqual),
            "==" | "=" | "eq" | "equals" => Ok(Comparison::Equal),
            other => Err(ObdError::InvalidArgument(format!(
                "unknown operator '{other}'"
            ))),
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// High-level diagnostic operations on one adapter.
pub struct DiagnosticSession {
    session: CommandSession,
    gate: Mutex<()>,
    config: SessionConfig,
}

impl DiagnosticSession {
    /// Must be called from within a tokio runtime.
    pub fn new(transport: Arc<dyn Transport>, inbound: Inbound, config: SessionConfig) -> Self {
        Self {
            session: CommandSession::new(transport, inbound),
            gate: Mutex::new(()),
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// The underlying command session, for callback-style links that push
    /// bytes with [`CommandSession::feed`].
    pub fn command_session(&self) -> &CommandSession {
        &self.session
    }

    /// Run the adapter initialization sequence. Returns the adapter
    /// identification.
    pub async fn initialize(&self) -> ObdResult<String> {
        let _gate = self.gate.lock().await;
        self.session.wait_ready().await?;
        init::initialize(&self.session, &self.config).await
    }

    async fn request(&self, command: &str) -> ObdResult<RawResponse> {
        safety::check_command(command)?;
        let _gate = self.gate.lock().await;
        self.session.wait_ready().await?;
        self.session
            .send(command, self.config.command_timeout())
            .await
    }

    // ── DTCs ────────────────────────────────────────────────────

    /// Stored trouble codes (Mode 03).
    pub async fn read_dtcs(&self) -> ObdResult<Vec<Dtc>> {
        self.read_dtc_mode(MODE_STORED_DTCS).await
    }

    /// Pending trouble codes (Mode 07).
    pub async fn read_pending_dtcs(&self) -> ObdResult<Vec<Dtc>> {
        self.read_dtc_mode(MODE_PENDING_DTCS).await
    }

    async fn read_dtc_mode(&self, mode: u8) -> ObdResult<Vec<Dtc>> {
        let response = self.request(&format!("{mode:02X}")).await?;
        let dtcs = dtc::decode_list(&response, mode)?;
        debug!(mode, count = dtcs.len(), "Read DTCs");
        Ok(dtcs)
    }

    /// Clear stored codes and freeze data (Mode 04). The adapter answers `44`.
    pub async fn clear_dtcs(&self) -> ObdResult<()> {
        let response = self.request(&format!("{MODE_CLEAR_DTCS:02X}")).await?;
        let ack = MODE_CLEAR_DTCS + RESPONSE_SID_OFFSET;
        let acknowledged = response::payload_lines(&response)?
            .iter()
            .filter_map(|line| response::parse_hex(line).ok())
            .any(|bytes| bytes.first() == Some(&ack));
        if !acknowledged {
            return Err(ObdError::InvalidResponse(format!(
                "clear not acknowledged: '{}'",
                response.text
            )));
        }
        info!("Cleared DTCs");
        Ok(())
    }

    // ── Live data ───────────────────────────────────────────────

    /// Read and decode one Mode 01 PID.
    pub async fn read_pid(&self, pid: u8) -> ObdResult<LiveSample> {
        let desc = pid::lookup(pid)?;
        let response = self.request(&desc.command()).await?;
        let (value, raw_bytes) = pid::decode_response(desc, &response)?;
        Ok(LiveSample {
            name: desc.name.to_string(),
            pid: Some(pid),
            value,
            unit: desc.unit.to_string(),
            timestamp: Utc::now(),
            raw_bytes,
        })
    }

    /// Vehicle identification number (Mode 09 PID 02).
    pub async fn read_vin(&self) -> ObdResult<String> {
        let response = self
            .request(&format!("{MODE_VEHICLE_INFO:02X}{INFO_TYPE_VIN:02X}"))
            .await?;
        crate::vin::reassemble(&response)
    }

    /// Battery voltage at the adapter (`ATRV`). Unparsable replies read as `0.0`.
    pub async fn read_battery_voltage(&self) -> ObdResult<f64> {
        let response = self.request(VOLTAGE_COMMAND).await?;
        Ok(pid::parse_voltage(&response.text))
    }

    // ── Monitoring ──────────────────────────────────────────────

    /// Read every PID in `pids` once per `interval` until `duration` has
    /// elapsed, then reduce each PID's samples.
    ///
    /// Failed reads are left out of that tick. Results follow request order.
    /// If the adapter disconnects the window ends early with what was
    /// collected.
    pub async fn monitor_pids(
        &self,
        pids: &[u8],
        duration: Duration,
        interval: Duration,
    ) -> ObdResult<Vec<MonitorResult>> {
        if interval.is_zero() {
            return Err(ObdError::InvalidArgument("interval must be non-zero".into()));
        }
        let descriptors = pids
            .iter()
            .map(|&p| pid::lookup(p))
            .collect::<ObdResult<Vec<_>>>()?;
        let mut samples: Vec<Vec<LiveSample>> = vec![Vec::new(); descriptors.len()];

        let started = Instant::now();
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        'window: loop {
            ticker.tick().await;
            if started.elapsed() >= duration {
                break;
            }
            for (desc, bucket) in descriptors.iter().zip(samples.iter_mut()) {
                match self.read_pid(desc.pid).await {
                    Ok(sample) => bucket.push(sample),
                    Err(ObdError::NotConnected) => {
                        warn!("Adapter disconnected, ending monitor window early");
                        break 'window;
                    }
                    Err(e) => warn!(pid = desc.pid, error = %e, "Monitor read failed"),
                }
            }
        }

        Ok(descriptors
            .iter()
            .zip(samples)
            .map(|(desc, samples)| {
                MonitorResult::from_samples(desc.name, Some(desc.pid), desc.unit, samples)
            })
            .collect())
    }

    /// Poll `pid` until `reading <op> target` holds or `timeout` elapses.
    ///
    /// Polls every `interval`, or the configured poll interval when `None`.
    /// On timeout the error carries the last value seen, if any.
    pub async fn wait_for_condition(
        &self,
        pid: u8,
        op: Comparison,
        target: f64,
        timeout: Duration,
        tolerance: f64,
        interval: Option<Duration>,
    ) -> ObdResult<LiveSample> {
        let desc = pid::lookup(pid)?;
        let interval = interval.unwrap_or_else(|| self.config.poll_interval());
        if interval.is_zero() {
            return Err(ObdError::InvalidArgument("interval must be non-zero".into()));
        }

        let mut last_value = None;
        let poll = async {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                match self.read_pid(pid).await {
                    Ok(sample) => {
                        last_value = Some(sample.value);
                        if op.holds(sample.value, target, tolerance) {
                            return Ok(sample);
                        }
                    }
                    Err(ObdError::NotConnected) => return Err(ObdError::NotConnected),
                    Err(e) => debug!(pid, error = %e, "Condition read failed"),
                }
            }
        };

        let outcome = tokio::time::timeout(timeout, poll).await;
        match outcome {
            Ok(result) => result,
            Err(_) => Err(ObdError::WaitTimeout {
                name: format!("{} {op} {target}", desc.name),
                last_value,
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }

    // ── Snapshot ────────────────────────────────────────────────

    /// Stored and pending codes, the common PIDs and battery voltage in one
    /// pass. Individual failures are recorded in the snapshot, never raised.
    pub async fn diagnostic_snapshot(&self) -> ObdResult<DiagnosticSnapshot> {
        if self.state() == SessionState::Disconnected {
            return Err(ObdError::NotConnected);
        }

        let mut failures = Vec::new();
        let mut record = |read: &str, e: ObdError| {
            warn!(read, error = %e, "Snapshot read failed");
            failures.push(ReadFailure {
                read: read.to_string(),
                error: e.to_string(),
            });
        };

        let dtcs = self
            .read_dtcs()
            .await
            .map_err(|e| record("dtcs", e))
            .ok();
        let pending_dtcs = self
            .read_pending_dtcs()
            .await
            .map_err(|e| record("pending_dtcs", e))
            .ok();

        let mut readings = Vec::with_capacity(COMMON_PIDS.len());
        for pid in COMMON_PIDS {
            match self.read_pid(pid).await {
                Ok(sample) => readings.push(sample),
                Err(e) => {
                    let name = pid::lookup(pid).map(|d| d.name).unwrap_or("pid");
                    record(name, e);
                }
            }
        }

        let battery_voltage = self
            .read_battery_voltage()
            .await
            .map_err(|e| record("battery_voltage", e))
            .ok();

        Ok(DiagnosticSnapshot {
            taken_at: Utc::now(),
            dtcs,
            pending_dtcs,
            readings,
            battery_voltage,
            failures,
        })
    }
}
