//! Transport Adapter
//!
//! Byte-oriented duplex stream with a non-blocking availability check and
//! an elapsed-time clock. The protocol engine only ever talks to the radio
//! through this trait.

use crate::error::Result;
use serialport::SerialPort;
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Duplex byte stream connected to the radio module
pub trait Transport {
    /// Write every byte of `bytes` to the module
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Number of bytes that can be read right now without blocking
    fn bytes_available(&mut self) -> io::Result<usize>;

    /// Read a single byte, `None` if nothing is buffered
    fn read_byte(&mut self) -> io::Result<Option<u8>>;

    /// Monotonic time since the transport was created
    fn elapsed(&self) -> Duration;
}

/// Cooperative cancellation handle for the poll loops.
///
/// Clones share the same flag, so a handle can be moved to another thread
/// and used to interrupt a session blocked in a timed read.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Re-arm the token after a cancellation has been handled
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Transport backed by a real serial port.
///
/// The port is expected to already run at the baud rate configured in the
/// module firmware; this adapter never changes it.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    epoch: Instant,
}

impl SerialTransport {
    /// Open a serial port
    pub fn open(port_name: &str, baud_rate: u32) -> Result<Self> {
        info!("Opening serial port {} at {} baud", port_name, baud_rate);
        let port = serialport::new(port_name, baud_rate)
            .timeout(Duration::from_millis(10))
            .open()?;
        Ok(Self::from_port(port))
    }

    /// Wrap an already opened port
    pub fn from_port(port: Box<dyn SerialPort>) -> Self {
        Self {
            port,
            epoch: Instant::now(),
        }
    }
}

impl Transport for SerialTransport {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        debug!("Serial write: {:?}", String::from_utf8_lossy(bytes));
        self.port.write_all(bytes)?;
        self.port.flush()
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        let pending = self.port.bytes_to_read().map_err(io::Error::from)?;
        Ok(pending as usize)
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut buf = [0u8; 1];
        match self.port.read(&mut buf) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(buf[0])),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn elapsed(&self) -> Duration {
        self.epoch.elapsed()
    }
}
