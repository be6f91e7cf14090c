//! Scripted RN-42 simulator for deterministic testing.
//!
//! [`SimulatedModule`] implements [`Transport`] against a virtual clock and a
//! script of expected exchanges:
//!
//! | Script entry        | Behavior                                              |
//! |---------------------|-------------------------------------------------------|
//! | `expect(cmd, reply)`| When `cmd` is written, `reply` becomes readable at once |
//! | `expect_then(...)`  | Replies are released after per-reply delays           |
//! | `expect_silent(cmd)`| `cmd` is consumed but nothing is answered             |
//! | `emit_after(ms, s)` | Unsolicited bytes (status frames, payload)            |
//!
//! Writes are matched against the head of the script only. A write that does
//! not match is recorded and answered with silence, which is what a real
//! module does with bytes it does not understand in data mode.
//!
//! The virtual clock advances by one tick every time [`Transport::elapsed`]
//! is read, so a timed read of N milliseconds costs N / tick loop iterations
//! and no wall-clock time.

use crate::infrastructure::bluetooth::transport::Transport;
use std::cell::Cell;
use std::collections::VecDeque;
use std::io;
use std::time::Duration;

#[derive(Debug, Clone)]
struct Exchange {
    expect: Vec<u8>,
    replies: Vec<(Duration, Vec<u8>)>,
}

/// A scripted stand-in for a serial-attached RN-42
#[derive(Debug)]
pub struct SimulatedModule {
    now: Cell<Duration>,
    tick: Duration,
    script: VecDeque<Exchange>,
    pending: Vec<(Duration, Vec<u8>)>,
    rx: VecDeque<u8>,
    written: Vec<Vec<u8>>,
    unmatched: Vec<Vec<u8>>,
}

impl Default for SimulatedModule {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedModule {
    /// Create a simulator with an empty script and a 1 ms tick
    pub fn new() -> Self {
        Self {
            now: Cell::new(Duration::ZERO),
            tick: Duration::from_millis(1),
            script: VecDeque::new(),
            pending: Vec::new(),
            rx: VecDeque::new(),
            written: Vec::new(),
            unmatched: Vec::new(),
        }
    }

    /// Change how far the virtual clock moves per reading
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick.max(Duration::from_micros(1));
        self
    }

    /// Answer `command` immediately with `reply`
    pub fn expect(self, command: &str, reply: &str) -> Self {
        self.expect_then(command, &[(0, reply)])
    }

    /// Consume `command` without answering
    pub fn expect_silent(self, command: &str) -> Self {
        self.expect_then(command, &[])
    }

    /// Answer `command` with replies released `delay_ms` after the write
    pub fn expect_then(mut self, command: &str, replies: &[(u64, &str)]) -> Self {
        self.script.push_back(Exchange {
            expect: command.as_bytes().to_vec(),
            replies: replies
                .iter()
                .map(|(delay, text)| (Duration::from_millis(*delay), text.as_bytes().to_vec()))
                .collect(),
        });
        self
    }

    /// Make `text` readable `delay_ms` after the current virtual time
    pub fn emit_after(mut self, delay_ms: u64, text: &str) -> Self {
        let due = self.now.get() + Duration::from_millis(delay_ms);
        self.schedule(due, text.as_bytes().to_vec());
        self
    }

    /// Every write so far, decoded lossily
    pub fn written(&self) -> Vec<String> {
        self.written
            .iter()
            .map(|w| String::from_utf8_lossy(w).into_owned())
            .collect()
    }

    /// Writes that did not match the script head
    pub fn unmatched(&self) -> Vec<String> {
        self.unmatched
            .iter()
            .map(|w| String::from_utf8_lossy(w).into_owned())
            .collect()
    }

    /// Number of scripted exchanges not yet consumed
    pub fn remaining(&self) -> usize {
        self.script.len()
    }

    /// Current virtual time
    pub fn now(&self) -> Duration {
        self.now.get()
    }

    fn schedule(&mut self, due: Duration, bytes: Vec<u8>) {
        let at = self
            .pending
            .iter()
            .position(|(t, _)| *t > due)
            .unwrap_or(self.pending.len());
        self.pending.insert(at, (due, bytes));
    }

    fn release_due(&mut self) {
        let now = self.now.get();
        while let Some((due, _)) = self.pending.first() {
            if *due > now {
                break;
            }
            let (_, bytes) = self.pending.remove(0);
            self.rx.extend(bytes);
        }
    }
}

impl Transport for SimulatedModule {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.written.push(bytes.to_vec());

        let matches = self
            .script
            .front()
            .map(|exchange| exchange.expect == bytes)
            .unwrap_or(false);

        if !matches {
            self.unmatched.push(bytes.to_vec());
            return Ok(());
        }

        if let Some(exchange) = self.script.pop_front() {
            let now = self.now.get();
            for (delay, reply) in exchange.replies {
                self.schedule(now + delay, reply);
            }
        }
        Ok(())
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        self.release_due();
        Ok(self.rx.len())
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        self.release_due();
        Ok(self.rx.pop_front())
    }

    fn elapsed(&self) -> Duration {
        let next = self.now.get() + self.tick;
        self.now.set(next);
        next
    }
}
