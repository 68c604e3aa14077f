#[cfg(feature = "async-serial")]
pub mod r#async;
pub mod errors;
pub mod fake;
pub mod reader;
pub mod sync;

pub use errors::{classify_error, classify_io_error, SerialFailureKind};
pub use reader::{spawn_reader, ReaderHandle, SerialEvent, SerialOutcome};
pub use sync::SerialPort;

/// Baud rate the shoe firmware writes at.
pub const DEFAULT_BAUD: u32 = 115_200;
/// Read timeout; bounds how long a cancelled reader takes to notice.
pub const DEFAULT_SERIAL_TIMEOUT_MS: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialOptions {
    pub baud: u32,
    pub timeout_ms: u64,
}

impl Default for SerialOptions {
    fn default() -> Self {
        Self {
            baud: DEFAULT_BAUD,
            timeout_ms: DEFAULT_SERIAL_TIMEOUT_MS,
        }
    }
}
