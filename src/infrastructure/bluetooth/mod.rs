//! Bluetooth Module
//!
//! Drives an RN-42 class radio over a serial link.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                      RadioSession                        │
//! │  (Mode/connection state machine - public API)            │
//! └─────────────────────┬───────────────────────────────────┘
//!                       │
//!                       ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │                     ProtocolEngine                       │
//! │  - send / timed receive      - substring validation      │
//! └─────────────────────┬───────────────────────────────────┘
//!                       │
//!         ┌─────────────┴─────────────┐
//!         ▼                           ▼
//! ┌────────────────┐          ┌────────────────┐
//! │ SerialTransport│          │ SimulatedModule│
//! │ (serialport)   │          │ (tests)        │
//! └────────────────┘          └────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`protocol`] - Command vocabulary, acknowledgments, status frames
//! - [`transport`] - Transport trait, serial adapter, cancellation
//! - [`engine`] - Send/receive/validate primitives
//! - [`session`] - Mode state machine, connection handling, data relay
//! - [`simulator`] - Scripted module for deterministic tests

pub mod engine;
pub mod protocol;
pub mod session;
pub mod simulator;
pub mod transport;

// Re-export main session for convenience
pub use session::{RadioConfig, RadioSession};
