pub mod bluetooth;
pub mod diagnostics;
pub mod logging;
