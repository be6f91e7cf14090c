//! Driver for serial-attached RN-42 Bluetooth modules.
//!
//! The module is toggled between command mode (text configuration
//! commands) and data mode (transparent payload relay). [`RadioSession`]
//! tracks which mode it believes the module is in and recovers when that
//! belief turns out to be wrong.

pub mod domain;
pub mod error;
pub mod infrastructure;

pub use domain::models::{MessageSeverity, Mode, StatusMessage};
pub use error::{RadioError, Result};
pub use infrastructure::bluetooth::protocol::StatusFrame;
pub use infrastructure::bluetooth::simulator::SimulatedModule;
pub use infrastructure::bluetooth::transport::{CancelToken, SerialTransport, Transport};
pub use infrastructure::bluetooth::{RadioConfig, RadioSession};
pub use infrastructure::diagnostics::{DiagnosticSink, MemorySink, WriterSink};
