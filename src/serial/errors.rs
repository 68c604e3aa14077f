use crate::Error;
use serde::Serialize;
use std::fmt;
use std::io::{self, ErrorKind};

/// Why the shoe's serial stream went away (or never came up).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SerialFailureKind {
    PermissionDenied,
    DeviceMissing,
    /// The device vanished mid-stream (cable pulled, shoe powered off).
    Disconnected,
    /// The reader hit EOF.
    EndOfStream,
    Busy,
    Unsupported,
    Config,
    Unknown,
}

impl SerialFailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "permission_denied",
            Self::DeviceMissing => "device_missing",
            Self::Disconnected => "disconnected",
            Self::EndOfStream => "end_of_stream",
            Self::Busy => "busy",
            Self::Unsupported => "unsupported",
            Self::Config => "config",
            Self::Unknown => "unknown",
        }
    }

    /// Short operator hint printed next to the failure.
    pub fn hint(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "add the user to the dialout group",
            Self::DeviceMissing => "check the device path and that the shoe is plugged in",
            Self::Disconnected | Self::EndOfStream => "reconnect the shoe, then `connect`",
            Self::Busy => "another program holds the port",
            Self::Unsupported => "no serial ports on this host",
            Self::Config => "check device and baud settings",
            Self::Unknown => "see the log for details",
        }
    }

    /// Linux errno values a serial read or open can surface.
    fn from_os_code(code: i32) -> Self {
        match code {
            // EIO: adapter unplugged while reading
            5 => Self::Disconnected,
            // ENXIO, ENODEV
            6 | 19 => Self::DeviceMissing,
            13 => Self::PermissionDenied,
            16 => Self::Busy,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for SerialFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a crate error from connect/open onto a failure reason.
pub fn classify_error(err: &Error) -> SerialFailureKind {
    match err {
        Error::Io(io_err) => classify_io_error(io_err),
        Error::InvalidArgs(_) => SerialFailureKind::Config,
        Error::Unsupported(_) => SerialFailureKind::Unsupported,
        Error::Parse(_) | Error::Http(_) => SerialFailureKind::Unknown,
    }
}

/// Map a fatal read/open error onto a failure reason. Timeouts never reach
/// here; the reader treats them as "no data yet".
pub fn classify_io_error(err: &io::Error) -> SerialFailureKind {
    match err.kind() {
        ErrorKind::PermissionDenied => SerialFailureKind::PermissionDenied,
        ErrorKind::NotFound => SerialFailureKind::DeviceMissing,
        ErrorKind::UnexpectedEof => SerialFailureKind::EndOfStream,
        ErrorKind::BrokenPipe | ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted => {
            SerialFailureKind::Disconnected
        }
        ErrorKind::InvalidInput => SerialFailureKind::Config,
        ErrorKind::Unsupported => SerialFailureKind::Unsupported,
        _ => err
            .raw_os_error()
            .map_or(SerialFailureKind::Unknown, SerialFailureKind::from_os_code),
    }
}
