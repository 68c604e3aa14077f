use crate::{Error, Result};
use serialport::{DataBits, FlowControl, Parity, StopBits};
use std::io::{self, Read};
use std::time::Duration;

use super::SerialOptions;

/// Blocking serial connection to the shoe (8N1, no flow control).
pub struct SerialPort {
    device: String,
    baud: u32,
    port: Box<dyn serialport::SerialPort>,
}

impl std::fmt::Debug for SerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPort")
            .field("device", &self.device)
            .field("baud", &self.baud)
            .finish()
    }
}

impl SerialPort {
    pub fn connect(device: &str, options: SerialOptions) -> Result<Self> {
        if device.is_empty() {
            return Err(Error::InvalidArgs(
                "device path cannot be empty".to_string(),
            ));
        }

        let port = serialport::new(device, options.baud)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(Duration::from_millis(options.timeout_ms.max(1)))
            .open()
            .map_err(map_serial_error)?;

        Ok(Self {
            device: device.to_string(),
            baud: options.baud,
            port,
        })
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn baud(&self) -> u32 {
        self.baud
    }
}

impl Read for SerialPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }
}

/// Fail with `Unsupported` when the host exposes no serial ports at all.
pub fn ensure_serial_available() -> Result<()> {
    match serialport::available_ports() {
        Ok(ports) if !ports.is_empty() => Ok(()),
        Ok(_) => Err(Error::Unsupported(
            "no serial ports found on this host".into(),
        )),
        Err(err) => Err(Error::Unsupported(format!(
            "serial enumeration unavailable: {err}"
        ))),
    }
}

fn map_serial_error(err: serialport::Error) -> Error {
    use serialport::ErrorKind;

    let kind = match err.kind() {
        ErrorKind::NoDevice => io::ErrorKind::NotFound,
        ErrorKind::InvalidInput => io::ErrorKind::InvalidInput,
        ErrorKind::Io(inner) => inner,
        ErrorKind::Unknown => io::ErrorKind::Other,
    };

    Error::Io(io::Error::new(kind, err))
}
