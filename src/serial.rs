//! The wand's serial link.

use std::{
    fmt,
    io::{self, ErrorKind},
    path::PathBuf,
    time::{Duration, Instant},
};

use log::{info, warn};
use serial2::SerialPort;

use crate::collaborators::TelemetrySource;
use crate::config::SerialConfig;
use crate::error::PipelineError;

const CHUNK: usize = 1024;

/// A [`TelemetrySource`] backed by a real serial port.
pub struct SerialTelemetry {
    port: SerialPort,
    timeout: Duration,
}

impl SerialTelemetry {
    /// Opens and configures the port. Any failure is
    /// [`PipelineError::PortUnavailable`]; there is no retry.
    pub fn open(config: &SerialConfig) -> Result<Self, PipelineError> {
        let unavailable = |source| PipelineError::PortUnavailable {
            port: config.port.clone(),
            source,
        };

        let mut port = SerialPort::open(&config.port, config.baud_rate).map_err(unavailable)?;
        port.set_read_timeout(config.read_timeout())
            .map_err(unavailable)?;

        info!(
            "opened {} at {} baud, {}ms read timeout",
            config.port, config.baud_rate, config.read_timeout_ms
        );

        Ok(Self {
            port,
            timeout: config.read_timeout(),
        })
    }

    /// The ports the operating system knows about.
    pub fn available_ports() -> Result<Vec<PathBuf>, PipelineError> {
        Ok(SerialPort::available_ports()?)
    }
}

impl fmt::Debug for SerialTelemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialTelemetry")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl TelemetrySource for SerialTelemetry {
    /// Reads until the port goes quiet or the timeout is spent, whichever
    /// comes first. A timeout with nothing read is an empty string.
    fn read_available(&mut self) -> io::Result<String> {
        read_until_quiet(&mut self.port, self.timeout).map(decode_text)
    }
}

/// The parts of a serial port the read loop needs.
trait TimedPort {
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize>;
    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()>;
}

impl TimedPort for SerialPort {
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read(buf)
    }

    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.set_read_timeout(timeout)
    }
}

/// Drains `port` within `timeout`. The port's timeout is shortened while
/// chunks keep arriving full and is always put back to `timeout` before
/// returning, error or not.
fn read_until_quiet<P: TimedPort>(port: &mut P, timeout: Duration) -> io::Result<Vec<u8>> {
    let mut shortened = false;
    let res = drain(port, timeout, &mut shortened);
    let restored = if shortened {
        port.set_timeout(timeout)
    } else {
        Ok(())
    };
    let bytes = res?;
    restored?;
    Ok(bytes)
}

fn drain<P: TimedPort>(port: &mut P, timeout: Duration, shortened: &mut bool) -> io::Result<Vec<u8>> {
    let deadline = Instant::now() + timeout;
    let mut buffer = [0; CHUNK];
    let mut read_buf = Vec::new();

    loop {
        match port.read_chunk(&mut buffer) {
            Ok(0) => break,
            Ok(n) => {
                read_buf.extend_from_slice(&buffer[..n]);
                if n < buffer.len() {
                    break;
                }
            }
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => break,
            Err(e) => return Err(e),
        }

        // The chunk filled up, so there may be more waiting.
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        *shortened = true;
        port.set_timeout(remaining)?;
    }

    Ok(read_buf)
}

/// Often the start of a transmission still has garbage from the hardware
/// buffer in it; it is replaced rather than failing the whole read.
fn decode_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            warn!("Failed to decode utf-8: {:?}", e.utf8_error());
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    }
}
