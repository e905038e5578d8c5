//! Byte-stream transport for real adapters.
//!
//! Wi-Fi ELM327 clones expose a raw TCP socket; USB and Bluetooth SPP
//! clones show up as a serial device. Both are plain duplex byte streams,
//! so one [`StreamTransport`] covers them: the write half sits behind an
//! async mutex and a spawned task pumps the read half into the session's
//! inbound channel.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use diag_elm327::{Inbound, InboundSender, ObdError, ObdResult, Transport, inbound_channel};

use crate::config::AdapterConfig;

/// Default TCP connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

const READ_BUF_SIZE: usize = 512;

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// [`Transport`] over any duplex byte stream.
pub struct StreamTransport {
    writer: Mutex<BoxedWriter>,
    connected: Arc<AtomicBool>,
    reader: JoinHandle<()>,
    endpoint: String,
}

impl StreamTransport {
    /// Split `stream` and start pumping its read half. Must be called from
    /// within a tokio runtime.
    pub fn from_stream<S>(stream: S, endpoint: impl Into<String>) -> (Arc<Self>, Inbound)
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let endpoint = endpoint.into();
        let (read_half, write_half) = tokio::io::split(stream);
        let (tx, rx) = inbound_channel();
        let connected = Arc::new(AtomicBool::new(true));

        let reader = tokio::spawn(pump(
            read_half,
            tx,
            Arc::clone(&connected),
            endpoint.clone(),
        ));

        let transport = Arc::new(Self {
            writer: Mutex::new(Box::new(write_half)),
            connected,
            reader,
            endpoint,
        });
        (transport, rx)
    }

    /// Connect to a Wi-Fi adapter at `host:port`.
    pub async fn connect_tcp(addr: &str, timeout: Duration) -> ObdResult<(Arc<Self>, Inbound)> {
        debug!(addr = %addr, timeout_ms = timeout.as_millis() as u64, "Connecting to adapter");

        let stream = tokio::time::timeout(timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| ObdError::Transport(format!("connect to {addr} timed out")))?
            .map_err(|e| ObdError::Transport(format!("connect to {addr}: {e}")))?;

        // Commands are a handful of bytes; don't let Nagle hold them back.
        if let Err(e) = stream.set_nodelay(true) {
            warn!(addr = %addr, error = %e, "Failed to set TCP_NODELAY");
        }

        info!(addr = %addr, "Adapter link established");
        Ok(Self::from_stream(stream, format!("tcp://{addr}")))
    }

    /// Open a USB or Bluetooth SPP adapter at `path`.
    pub fn open_serial(path: &str, baud_rate: u32) -> ObdResult<(Arc<Self>, Inbound)> {
        let port = tokio_serial::new(path, baud_rate)
            .open_native_async()
            .map_err(|e| ObdError::Transport(format!("open {path}: {e}")))?;

        info!(path = %path, baud_rate, "Serial adapter opened");
        Ok(Self::from_stream(port, format!("{path}@{baud_rate}")))
    }

    /// Open whichever link `config` describes.
    pub async fn open(config: &AdapterConfig) -> ObdResult<(Arc<Self>, Inbound)> {
        match config {
            AdapterConfig::Tcp { address } => {
                Self::connect_tcp(address, DEFAULT_CONNECT_TIMEOUT).await
            }
            AdapterConfig::Serial { path, baud_rate } => Self::open_serial(path, *baud_rate),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for StreamTransport {
    async fn write(&self, bytes: &[u8]) -> ObdResult<()> {
        if !self.is_connected() {
            return Err(ObdError::NotConnected);
        }
        let mut writer = self.writer.lock().await;
        writer.write_all(bytes).await?;
        writer.flush().await?;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

impl Drop for StreamTransport {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// Forward read chunks until EOF or error, then mark the link down. The
/// sender drops on return, which the session sees as a closed link.
async fn pump<R>(mut reader: R, tx: InboundSender, connected: Arc<AtomicBool>, endpoint: String)
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; READ_BUF_SIZE];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => {
                info!(endpoint = %endpoint, "Adapter closed the link");
                break;
            }
            Ok(n) => {
                if tx.send(buf[..n].to_vec()).is_err() {
                    debug!(endpoint = %endpoint, "Session gone, stopping reader");
                    break;
                }
            }
            Err(e) => {
                warn!(endpoint = %endpoint, error = %e, "Adapter read failed");
                break;
            }
        }
    }
    connected.store(false, Ordering::Release);
}

#[cfg(test)]
mod tests {
    use super::*;
    use diag_elm327::{DiagnosticSession, SessionConfig, SessionState};
    use tokio::io::DuplexStream;

    /// Minimal adapter on the far end of a duplex: answers each
    /// `\r`-terminated command from `replies`, `?` otherwise.
    fn spawn_adapter(mut far: DuplexStream, replies: Vec<(&'static str, &'static str)>) {
        tokio::spawn(async move {
            let mut line = Vec::new();
            let mut buf = [0u8; 64];
            loop {
                let n = match far.read(&mut buf).await {
                    Ok(0) | Err(_) => return,
                    Ok(n) => n,
                };
                for &b in &buf[..n] {
                    if b != b'\r' {
                        line.push(b);
                        continue;
                    }
                    let command = String::from_utf8_lossy(&line).to_string();
                    line.clear();
                    let reply = replies
                        .iter()
                        .find(|(c, _)| *c == command)
                        .map_or("?", |(_, r)| *r);
                    let framed = format!("{reply}\r\r>");
                    if far.write_all(framed.as_bytes()).await.is_err() {
                        return;
                    }
                }
            }
        });
    }

    #[tokio::test]
    async fn writes_reach_the_far_end() {
        let (near, mut far) = tokio::io::duplex(64);
        let (transport, _inbound) = StreamTransport::from_stream(near, "duplex");

        transport.write(b"ATZ\r").await.unwrap();

        let mut buf = [0u8; 4];
        far.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ATZ\r");
        assert_eq!(transport.endpoint(), "duplex");
    }

    #[tokio::test]
    async fn reads_are_forwarded() {
        let (near, mut far) = tokio::io::duplex(64);
        let (_transport, mut inbound) = StreamTransport::from_stream(near, "duplex");

        far.write_all(b"ELM327 v1.5\r\r>").await.unwrap();

        let mut got = Vec::new();
        while !got.ends_with(b">") {
            got.extend(inbound.recv().await.unwrap());
        }
        assert_eq!(got, b"ELM327 v1.5\r\r>");
    }

    #[tokio::test]
    async fn eof_marks_disconnected() {
        let (near, far) = tokio::io::duplex(64);
        let (transport, mut inbound) = StreamTransport::from_stream(near, "duplex");
        assert!(transport.is_connected());

        drop(far);

        assert!(inbound.recv().await.is_none());
        assert!(!transport.is_connected());
        assert!(matches!(
            transport.write(b"0100\r").await,
            Err(ObdError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn session_over_stream() {
        let (near, far) = tokio::io::duplex(256);
        spawn_adapter(
            far,
            vec![
                ("010C", "41 0C 1A F8"),
                ("03", "43 01 71 00 00 00 00"),
            ],
        );
        let (transport, inbound) = StreamTransport::from_stream(near, "duplex");
        let session = DiagnosticSession::new(transport, inbound, SessionConfig::default());

        let rpm = session.read_pid(0x0C).await.unwrap();
        assert_eq!(rpm.value, 1726.0);

        let dtcs = session.read_dtcs().await.unwrap();
        assert_eq!(dtcs.len(), 1);
        assert_eq!(dtcs[0].code, "P0171");
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn session_sees_dropped_link() {
        let (near, far) = tokio::io::duplex(64);
        let (transport, inbound) = StreamTransport::from_stream(near, "duplex");
        let link = Arc::clone(&transport);
        let session = DiagnosticSession::new(transport, inbound, SessionConfig::default());

        drop(far);
        while link.is_connected() {
            tokio::task::yield_now().await;
        }
        assert_eq!(session.state(), SessionState::Disconnected);

        assert!(matches!(
            session.read_pid(0x0C).await,
            Err(ObdError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn connect_refused_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let result = StreamTransport::connect_tcp(&addr, Duration::from_secs(1)).await;
        assert!(matches!(result, Err(ObdError::Transport(_))));
    }

    #[tokio::test]
    async fn open_from_config() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let config = AdapterConfig::Tcp {
            address: address.clone(),
        };

        let (transport, _inbound) = StreamTransport::open(&config).await.unwrap();
        assert_eq!(transport.endpoint(), config.endpoint());
        assert!(listener.accept().await.is_ok());
    }

    #[tokio::test]
    async fn connect_tcp_round_trip() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 5];
            sock.read_exact(&mut buf).await.unwrap();
            sock.write_all(b"12.4V\r\r>").await.unwrap();
        });

        let (transport, inbound) = StreamTransport::connect_tcp(&addr, DEFAULT_CONNECT_TIMEOUT)
            .await
            .unwrap();
        assert_eq!(transport.endpoint(), format!("tcp://{addr}"));

        let session = DiagnosticSession::new(transport, inbound, SessionConfig::default());
        let volts = session.read_battery_voltage().await.unwrap();
        assert!((volts - 12.4).abs() < 1e-9);
    }

    #[tokio::test]
    async fn open_missing_serial_port_fails() {
        let result = StreamTransport::open_serial("/dev/does-not-exist-obd", 38400);
        assert!(matches!(result, Err(ObdError::Transport(_))));
    }
}
