use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of the module's command/data duality the session believes it is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    /// Bytes are interpreted by the module as configuration commands
    Command,
    /// Bytes are relayed transparently over the wireless link
    Data,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Command => write!(f, "command"),
            Mode::Data => write!(f, "data"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub message: String,
    pub severity: MessageSeverity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSeverity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.severity {
            MessageSeverity::Info => "INFO",
            MessageSeverity::Warning => "Warning",
            MessageSeverity::Error => "ERROR",
        };
        write!(f, "{}: {}", prefix, self.message)
    }
}
