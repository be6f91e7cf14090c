//! Radio Session
//!
//! Mode and connection state machine on top of the [`ProtocolEngine`].
//!
//! The session's [`Mode`] is a belief, not a fact: the module can fall back
//! to command mode on a disconnect, or already be in command mode when
//! `$$$` is sent. Every transition is therefore an optimistic attempt
//! followed by at most one check-and-retry.

use crate::domain::models::{MessageSeverity, Mode, StatusMessage};
use crate::error::Result;
use crate::infrastructure::bluetooth::engine::ProtocolEngine;
use crate::infrastructure::bluetooth::protocol::{
    self, Command, StatusFrame, CONNECT_FAILED, DEFAULT_ESCAPE_SEQUENCE, UNDEFINED_STATUS_STRING,
};
use crate::infrastructure::bluetooth::transport::{CancelToken, Transport};
use crate::infrastructure::diagnostics::DiagnosticSink;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Timing and defaults for a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadioConfig {
    /// Read window for every command exchange
    pub command_timeout: Duration,
    /// Length of one poll window while waiting for a connect outcome
    pub connect_poll_interval: Duration,
    /// Poll windows before a connect attempt is reported as failed
    pub connect_poll_attempts: u32,
    /// Escape sequence written to the module when it has none
    pub default_escape_sequence: String,
    /// Wait after a reboot issued by `init`
    pub boot_delay: Duration,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            command_timeout: Duration::from_millis(protocol::COMMAND_TIMEOUT_MS),
            connect_poll_interval: Duration::from_millis(protocol::CONNECT_POLL_INTERVAL_MS),
            connect_poll_attempts: protocol::CONNECT_POLL_ATTEMPTS,
            default_escape_sequence: DEFAULT_ESCAPE_SEQUENCE.to_string(),
            boot_delay: Duration::from_millis(protocol::BOOT_DELAY_MS),
        }
    }
}

/// Stateful driver for one RN-42 module
pub struct RadioSession<T: Transport> {
    engine: ProtocolEngine<T>,
    mode: Mode,
    escape_sequence: String,
    disconnect_seen: bool,
    rebooting: bool,
    config: RadioConfig,
    console: Option<Box<dyn DiagnosticSink>>,
}

impl<T: Transport> RadioSession<T> {
    /// Bind a session to a transport with default timing
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, RadioConfig::default())
    }

    pub fn with_config(transport: T, mut config: RadioConfig) -> Self {
        if config.default_escape_sequence.is_empty() {
            config.default_escape_sequence = DEFAULT_ESCAPE_SEQUENCE.to_string();
        }

        Self {
            engine: ProtocolEngine::new(transport),
            // assume the module powered up in data mode
            mode: Mode::Data,
            escape_sequence: config.default_escape_sequence.clone(),
            disconnect_seen: false,
            rebooting: false,
            config,
            console: None,
        }
    }

    /// Send warning/error lines to `sink` in addition to `tracing`
    pub fn attach_console(&mut self, sink: impl DiagnosticSink + 'static) {
        self.console = Some(Box::new(sink));
    }

    pub fn detach_console(&mut self) {
        self.console = None;
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_command_mode(&self) -> bool {
        self.mode == Mode::Command
    }

    pub fn escape_sequence(&self) -> &str {
        &self.escape_sequence
    }

    /// Status frame the module emits when the remote device drops the link
    pub fn disconnect_frame(&self) -> String {
        protocol::disconnect_marker(&self.escape_sequence)
    }

    /// Whether the last `receive` saw the disconnect frame
    pub fn disconnect_seen(&self) -> bool {
        self.disconnect_seen
    }

    pub fn last_response(&self) -> &str {
        self.engine.last_response()
    }

    /// Whether `init` rebooted the module and [`RadioSession::wait_for_boot`]
    /// has not run since
    pub fn awaiting_boot(&self) -> bool {
        self.rebooting
    }

    pub fn config(&self) -> &RadioConfig {
        &self.config
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.engine.cancel_token()
    }

    pub fn transport(&self) -> &T {
        self.engine.transport()
    }

    pub fn into_transport(self) -> T {
        self.engine.into_transport()
    }

    /// Configure the firmware for the functionality this driver relies on.
    ///
    /// Status frames need an escape sequence. If the module has none, the
    /// default is written, verified and the module rebooted, after which it
    /// comes back up in data mode. A non-default value is adopted as is.
    /// Returns `Ok(false)` on any unexpected response; the session must not
    /// be used after that.
    ///
    /// After a reboot the module ignores `$$$` until it has booted, so call
    /// [`RadioSession::wait_for_boot`] before the next command.
    pub fn init(&mut self) -> Result<bool> {
        self.mode = Mode::Data;
        self.rebooting = false;

        if !self.enter_command_mode()? {
            return Ok(false);
        }

        let status = self.query_extended_status()?;
        let default = self.config.default_escape_sequence.clone();

        if status == UNDEFINED_STATUS_STRING {
            self.report(
                MessageSeverity::Warning,
                "extended status string undefined.  Setting to default value.",
            );

            if !self.validate(&Command::SetExtendedStatus(default.clone()))? {
                self.report(
                    MessageSeverity::Error,
                    "setting extended status string failed?",
                );
                return Ok(false);
            }

            if self.query_extended_status()? != default {
                self.report(
                    MessageSeverity::Error,
                    "querying extended status string failed",
                );
                return Ok(false);
            }

            if self.validate(&Command::Reboot)? {
                self.escape_sequence = default;
                self.mode = Mode::Data;
                self.rebooting = true;
                info!("Extended status string set, module rebooting into data mode");
                return Ok(true);
            }

            self.report(
                MessageSeverity::Error,
                "module did not acknowledge reboot after setting extended status string",
            );
            return Ok(false);
        }

        if status.is_empty() {
            self.report(
                MessageSeverity::Error,
                "no response to extended status string query",
            );
            return Ok(false);
        }

        if status != default {
            self.report(
                MessageSeverity::Warning,
                "extended status string using non-default value.",
            );
            self.report(
                MessageSeverity::Warning,
                &format!("escape sequence changed to: {}", status),
            );
        }
        self.escape_sequence = status;

        Ok(true)
    }

    /// Block for the configured boot delay if `init` rebooted the module.
    ///
    /// Whatever the module prints while booting is discarded. Does nothing
    /// when no reboot is pending.
    pub fn wait_for_boot(&mut self) -> Result<()> {
        if !self.rebooting {
            return Ok(());
        }

        let delay = self.config.boot_delay;
        info!("Waiting {} ms for module reboot", delay.as_millis());
        let banner = self.engine.read_with_timeout(delay)?;
        if !banner.is_empty() {
            debug!("Boot output: {:?}", banner);
        }
        self.rebooting = false;
        Ok(())
    }

    /// Enter command mode unless the session already believes it is there.
    ///
    /// Unlike [`RadioSession::enter_command_mode`] this sends nothing and
    /// warns about nothing when the believed mode is already `Command`.
    pub fn ensure_command_mode(&mut self) -> Result<bool> {
        if self.mode == Mode::Command {
            return Ok(true);
        }
        self.enter_command_mode()
    }

    /// Enter data mode unless the session already believes it is there
    pub fn ensure_data_mode(&mut self) -> Result<bool> {
        if self.mode == Mode::Data {
            return Ok(true);
        }
        self.enter_data_mode()
    }

    /// Enter command mode, recovering if the module was already there.
    ///
    /// Returns `Ok(false)` only when neither `$$$` nor a bare newline is
    /// answered, which points at the serial link itself.
    pub fn enter_command_mode(&mut self) -> Result<bool> {
        if self.mode == Mode::Command {
            self.report(
                MessageSeverity::Warning,
                "entering command mode while device is in command mode.",
            );
        }

        if self.begin_command_mode()? {
            return Ok(true);
        }

        self.report(
            MessageSeverity::Error,
            "unsuccessful entering into command mode.  Maybe in command mode already?",
        );

        // A module already in command mode took "$$$" as the start of a
        // command; terminating it yields the unknown-command marker.
        if self.validate(&Command::BlankLine)? {
            self.mode = Mode::Command;
            info!("Recovered: module was already in command mode");
            return Ok(true);
        }

        self.report(
            MessageSeverity::Error,
            "unsuccessful entering into command mode.  Check baud rate and circuit wiring.",
        );
        Ok(false)
    }

    /// Leave command mode, recovering if the module was already in data mode
    pub fn enter_data_mode(&mut self) -> Result<bool> {
        if self.mode == Mode::Data {
            self.report(
                MessageSeverity::Warning,
                "exiting mode while device is not in command mode.",
            );
        }

        if self.begin_data_mode()? {
            return Ok(true);
        }

        self.report(
            MessageSeverity::Error,
            "unsuccessful entering into data mode.  Maybe in data mode already?",
        );

        if self.begin_command_mode()? {
            self.report(
                MessageSeverity::Info,
                "successful entering command mode.  Attempting to exit command mode",
            );
            return self.begin_data_mode();
        }

        Ok(false)
    }

    /// Check whether a remote device is connected.
    ///
    /// The module is left in command mode whenever it answered.
    pub fn is_connected(&mut self) -> Result<bool> {
        if self.mode == Mode::Data {
            self.report(
                MessageSeverity::Warning,
                "attempting to query connect status while not in command mode.",
            );
        }

        if self.validate(&Command::GetConnectionStatus)? {
            self.mode = Mode::Command;
            return Ok(true);
        }

        // Possibly in data mode after all
        if self.begin_command_mode()? {
            self.report(
                MessageSeverity::Info,
                "successful entering command mode.  Attempting to query connect status",
            );
            return self.validate(&Command::GetConnectionStatus);
        }

        Ok(false)
    }

    /// Connect to the last remote device the module paired with
    pub fn connect(&mut self) -> Result<bool> {
        self.warn_connect_outside_command_mode();
        self.connect_with(Command::ConnectLast)
    }

    /// Connect to the remote device with the given address.
    ///
    /// The address is validated before anything is written.
    pub fn connect_to_address(&mut self, address: &str) -> Result<bool> {
        let address = protocol::normalize_address(address)?;
        self.warn_connect_outside_command_mode();
        self.connect_with(Command::ConnectTo(address))
    }

    /// Send payload to the remote device
    pub fn send(&mut self, text: &str) -> Result<()> {
        if self.mode == Mode::Command {
            self.report(
                MessageSeverity::Warning,
                "attempting to send data while device is in command mode.",
            );
        }

        self.engine.write(text.as_bytes())
    }

    /// Receive whatever the remote device sends within `timeout`.
    ///
    /// A disconnect frame in the text is reported and flagged through
    /// [`RadioSession::disconnect_seen`]; the believed mode is left alone.
    pub fn receive(&mut self, timeout: Duration) -> Result<String> {
        if self.mode == Mode::Command {
            self.report(
                MessageSeverity::Warning,
                "attempting to receive data while device is in command mode.",
            );
        }

        self.disconnect_seen = false;
        let text = self.engine.read_with_timeout(timeout)?;

        if text.contains(&self.disconnect_frame()) {
            self.disconnect_seen = true;
            self.report(
                MessageSeverity::Error,
                "receive interrupted because remote device disconnected",
            );
        }

        Ok(text)
    }

    fn begin_command_mode(&mut self) -> Result<bool> {
        let ok = self.validate(&Command::EnterCommandMode)?;
        if ok {
            self.mode = Mode::Command;
        }
        Ok(ok)
    }

    fn begin_data_mode(&mut self) -> Result<bool> {
        let ok = self.validate(&Command::ExitCommandMode)?;
        if ok {
            self.mode = Mode::Data;
        }
        Ok(ok)
    }

    fn connect_with(&mut self, command: Command) -> Result<bool> {
        if !self.validate(&command)? {
            self.report(
                MessageSeverity::Error,
                "connect command not acknowledged",
            );
            return Ok(false);
        }

        let marker = protocol::connect_marker(&self.escape_sequence);
        let interval = self.config.connect_poll_interval;
        let mut seen = String::new();

        for _ in 0..self.config.connect_poll_attempts {
            let chunk = self.engine.read_with_timeout(interval)?;
            seen.push_str(&chunk);

            if seen.contains(CONNECT_FAILED) {
                self.mode = Mode::Command;
                self.report(MessageSeverity::Error, "remote device connect failed");
                return Ok(false);
            }

            if let Some(at) = seen.find(&marker) {
                self.mode = Mode::Data;
                if let Some(StatusFrame::Connect { address }) =
                    protocol::find_status_frame(&seen[at..], &self.escape_sequence)
                {
                    info!("Connected to remote device {}", address);
                }
                return Ok(true);
            }
        }

        // The module may still connect later; its real mode is unknown here
        self.report(
            MessageSeverity::Warning,
            &format!(
                "no connect outcome within {} ms, module state unknown",
                interval.as_millis() * self.config.connect_poll_attempts as u128
            ),
        );
        Ok(false)
    }

    fn warn_connect_outside_command_mode(&mut self) {
        if self.mode == Mode::Data {
            self.report(
                MessageSeverity::Warning,
                "attempting to connect while not in command mode.",
            );
        }
    }

    fn query_extended_status(&mut self) -> Result<String> {
        let timeout = self.config.command_timeout;
        let response = self
            .engine
            .send_receive(&Command::GetExtendedStatus.as_bytes(), timeout)?;
        Ok(response.trim().to_string())
    }

    fn validate(&mut self, command: &Command) -> Result<bool> {
        let expected = command.expected().unwrap_or_default();
        let timeout = self.config.command_timeout;
        self.engine
            .send_receive_validate(&command.as_bytes(), expected, timeout)
    }

    fn report(&mut self, severity: MessageSeverity, message: &str) {
        match severity {
            MessageSeverity::Info => info!("{}", message),
            MessageSeverity::Warning => warn!("{}", message),
            MessageSeverity::Error => error!("{}", message),
        }

        if let Some(console) = self.console.as_mut() {
            console.line(&StatusMessage {
                message: message.to_string(),
                severity,
            });
        }
    }
}
