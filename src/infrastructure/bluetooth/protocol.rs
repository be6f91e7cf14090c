//! RN-42 Command Protocol
//!
//! This module contains the text command vocabulary understood by the
//! RN-42 firmware, the acknowledgment each command is validated against,
//! and helpers for recognizing asynchronous status frames.

use crate::error::{RadioError, Result};

/// Default escape sequence prefixing status frames (`%CONNECT,...`, `%DISCONNECT`)
pub const DEFAULT_ESCAPE_SEQUENCE: &str = "%";

/// Value reported by `GO` when the extended status string is not defined
pub const UNDEFINED_STATUS_STRING: &str = "NULL";

/// Marker sent by the module when an outbound connection attempt failed
pub const CONNECT_FAILED: &str = "failed";

/// Status frame body announcing an established link (followed by the remote address)
pub const CONNECT_FRAME: &str = "CONNECT,";

/// Status frame body announcing a dropped link
pub const DISCONNECT_FRAME: &str = "DISCONNECT";

/// Default timeout for a single command exchange in milliseconds
pub const COMMAND_TIMEOUT_MS: u64 = 200;

/// Length of one poll window while waiting for a connect outcome
pub const CONNECT_POLL_INTERVAL_MS: u64 = 500;

/// Number of poll windows before a connect attempt is given up
pub const CONNECT_POLL_ATTEMPTS: u32 = 10;

/// Time the module needs after `R,1` before it accepts `$$$` again
pub const BOOT_DELAY_MS: u64 = 1500;

/// Commands issued to the module
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Enter command mode (`$$$`), no line terminator
    EnterCommandMode,
    /// Leave command mode and resume data relay
    ExitCommandMode,
    /// Bare newline; in command mode the module answers unknown input with `?`
    BlankLine,
    /// Read the extended status string (the escape sequence)
    GetExtendedStatus,
    /// Write the extended status string
    SetExtendedStatus(String),
    /// Save settings and reboot
    Reboot,
    /// Query connection status
    GetConnectionStatus,
    /// Connect to the last remote device stored in the module
    ConnectLast,
    /// Connect to a remote device by address (12 hex digits)
    ConnectTo(String),
}

impl Command {
    /// Get the raw bytes for this command
    pub fn as_bytes(&self) -> Vec<u8> {
        match self {
            Self::EnterCommandMode => b"$$$".to_vec(),
            Self::ExitCommandMode => b"---\n".to_vec(),
            Self::BlankLine => b"\n".to_vec(),
            Self::GetExtendedStatus => b"GO\n".to_vec(),
            Self::SetExtendedStatus(value) => format!("SO,{value}\n").into_bytes(),
            Self::Reboot => b"R,1\n".to_vec(),
            Self::GetConnectionStatus => b"GK\n".to_vec(),
            Self::ConnectLast => b"C\n".to_vec(),
            Self::ConnectTo(address) => format!("C,{address}\n").into_bytes(),
        }
    }

    /// Substring the response must contain for the command to count as acknowledged.
    ///
    /// `GetExtendedStatus` has no fixed acknowledgment; its raw value is compared
    /// by the caller instead.
    pub fn expected(&self) -> Option<&'static str> {
        match self {
            Self::EnterCommandMode => Some("CMD"),
            Self::ExitCommandMode => Some("END"),
            Self::BlankLine => Some("?"),
            Self::GetExtendedStatus => None,
            Self::SetExtendedStatus(_) => Some("AOK"),
            Self::Reboot => Some("Reboot!"),
            // one active link, no other conditions
            Self::GetConnectionStatus => Some("1,0,0"),
            Self::ConnectLast | Self::ConnectTo(_) => Some("TRYING"),
        }
    }
}

/// Asynchronous link lifecycle notification emitted by the module
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusFrame {
    /// `<esc>CONNECT,<address>` - the remote address is everything up to the next
    /// line break or escape sequence
    Connect { address: String },
    /// `<esc>DISCONNECT`
    Disconnect,
}

/// Build the `<esc>CONNECT,` marker for an escape sequence
pub fn connect_marker(escape_sequence: &str) -> String {
    format!("{escape_sequence}{CONNECT_FRAME}")
}

/// Build the `<esc>DISCONNECT` marker for an escape sequence
pub fn disconnect_marker(escape_sequence: &str) -> String {
    format!("{escape_sequence}{DISCONNECT_FRAME}")
}

/// Find the first status frame in `text`.
///
/// Matching is literal substring search, so any echo or payload around the
/// frame is ignored. Returns `None` for an empty escape sequence.
pub fn find_status_frame(text: &str, escape_sequence: &str) -> Option<StatusFrame> {
    if escape_sequence.is_empty() {
        return None;
    }

    let connect = connect_marker(escape_sequence);
    let disconnect = disconnect_marker(escape_sequence);

    let connect_at = text.find(&connect);
    let disconnect_at = text.find(&disconnect);

    match (connect_at, disconnect_at) {
        (Some(c), Some(d)) if d < c => Some(StatusFrame::Disconnect),
        (Some(c), _) => {
            let rest = &text[c + connect.len()..];
            let end = rest
                .find(|ch: char| ch == '\r' || ch == '\n')
                .unwrap_or(rest.len());
            let rest = &rest[..end];
            let end = rest.find(escape_sequence).unwrap_or(rest.len());
            Some(StatusFrame::Connect {
                address: rest[..end].trim().to_string(),
            })
        }
        (None, Some(_)) => Some(StatusFrame::Disconnect),
        (None, None) => None,
    }
}

/// Normalize a Bluetooth address into the 12 hex digit form the module expects.
///
/// Accepts `0006664F1A2B`, `00:06:66:4F:1A:2B` and `00-06-66-4F-1A-2B`.
pub fn normalize_address(address: &str) -> Result<String> {
    let trimmed = address.trim();
    let digits: String = trimmed.chars().filter(|c| *c != ':' && *c != '-').collect();

    let separated = digits.len() != trimmed.len();
    if separated {
        // Separators must split the address into byte pairs
        let groups: Vec<&str> = trimmed.split(|c: char| c == ':' || c == '-').collect();
        if groups.len() != 6 || groups.iter().any(|g| g.len() != 2) {
            return Err(RadioError::InvalidAddress(address.to_string()));
        }
    }

    if digits.len() != 12 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(RadioError::InvalidAddress(address.to_string()));
    }

    Ok(digits.to_ascii_uppercase())
}
