use thiserror::Error;

/// Errors raised by the radio driver.
///
/// Protocol-level mismatches (a missing acknowledgment, an ambiguous connect)
/// are not errors; operations report them as `Ok(false)`. This type covers the
/// conditions where an exchange could not be carried out at all.
#[derive(Debug, Error)]
pub enum RadioError {
    #[error("transport I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("operation cancelled")]
    Cancelled,

    #[error("invalid Bluetooth address: {0:?}")]
    InvalidAddress(String),
}

pub type Result<T> = std::result::Result<T, RadioError>;
