//! Diagnostic Sink
//!
//! Optional human-readable output for warnings and errors raised while
//! driving the radio. Attaching or detaching a sink never changes protocol
//! behavior.

use crate::domain::models::StatusMessage;
use std::io::Write;
use std::sync::{Arc, Mutex};

/// Receives one line per warning/error branch of the session
pub trait DiagnosticSink {
    fn line(&mut self, message: &StatusMessage);
}

/// Sink writing `Severity: message` lines to any writer (stdout, a log file, a second UART)
pub struct WriterSink<W: Write> {
    writer: W,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> DiagnosticSink for WriterSink<W> {
    fn line(&mut self, message: &StatusMessage) {
        // Output failures on a diagnostic channel are not worth surfacing
        let _ = writeln!(self.writer, "{}", message);
    }
}

/// Sink collecting messages in memory; clones share the same buffer
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    messages: Arc<Mutex<Vec<StatusMessage>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<StatusMessage> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut m) = self.messages.lock() {
            m.clear();
        }
    }
}

impl DiagnosticSink for MemorySink {
    fn line(&mut self, message: &StatusMessage) {
        if let Ok(mut m) = self.messages.lock() {
            m.push(message.clone());
        }
    }
}
