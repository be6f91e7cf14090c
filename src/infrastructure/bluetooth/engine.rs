//! Protocol Engine
//!
//! Primitive send / timed receive / validate operations. Reads are
//! poll-based: every byte that arrives inside the timeout window is
//! accumulated, and the window always runs to its end because the module's
//! text protocol has no terminator shared by every response class.

use crate::error::{RadioError, Result};
use crate::infrastructure::bluetooth::transport::{CancelToken, Transport};
use std::time::Duration;
use tracing::{debug, trace};

/// Owns the transport and performs command exchanges
pub struct ProtocolEngine<T: Transport> {
    transport: T,
    last_response: String,
    cancel: CancelToken,
}

impl<T: Transport> ProtocolEngine<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            last_response: String::new(),
            cancel: CancelToken::new(),
        }
    }

    /// Most recent raw text received from the module
    pub fn last_response(&self) -> &str {
        &self.last_response
    }

    /// Handle that interrupts any running or future read until reset
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Write raw bytes without reading anything back
    pub fn write(&mut self, bytes: &[u8]) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(RadioError::Cancelled);
        }
        trace!("TX {:?}", String::from_utf8_lossy(bytes));
        self.transport.write_all(bytes)?;
        Ok(())
    }

    /// Write `command`, then collect everything received within `timeout`
    pub fn send_receive(&mut self, command: &[u8], timeout: Duration) -> Result<String> {
        self.write(command)?;
        self.read_with_timeout(timeout)
    }

    /// `send_receive`, then check that `expected` occurs anywhere in the response
    pub fn send_receive_validate(
        &mut self,
        command: &[u8],
        expected: &str,
        timeout: Duration,
    ) -> Result<bool> {
        let response = self.send_receive(command, timeout)?;
        let ok = response.contains(expected);
        debug!(
            "{:?} -> {:?} (expected {:?}: {})",
            String::from_utf8_lossy(command),
            response,
            expected,
            if ok { "ok" } else { "missing" }
        );
        Ok(ok)
    }

    /// Drain available bytes until `timeout` elapses.
    ///
    /// Whatever arrived before a cancellation or transport error is still
    /// kept as the last response.
    pub fn read_with_timeout(&mut self, timeout: Duration) -> Result<String> {
        let mut bytes = Vec::new();
        let outcome = self.drain_into(&mut bytes, timeout);

        self.last_response = String::from_utf8_lossy(&bytes).into_owned();
        outcome?;

        trace!("RX {:?}", self.last_response);
        Ok(self.last_response.clone())
    }

    fn drain_into(&mut self, bytes: &mut Vec<u8>, timeout: Duration) -> Result<()> {
        let start = self.transport.elapsed();

        while self.transport.elapsed().saturating_sub(start) < timeout {
            if self.cancel.is_cancelled() {
                return Err(RadioError::Cancelled);
            }

            while self.transport.bytes_available()? > 0 {
                match self.transport.read_byte()? {
                    Some(byte) => bytes.push(byte),
                    None => break,
                }
            }
            std::hint::spin_loop();
        }
        Ok(())
    }
}
