use crossbeam::channel::Sender;
use std::io::Read;

use crate::serial::{
    spawn_reader, sync::ensure_serial_available, ReaderHandle, SerialEvent, SerialOptions,
    SerialPort,
};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    Connected,
    AlreadyConnected,
}

/// The operator-controlled serial connection. No automatic reconnect: after a
/// disconnect or device loss a fresh `connect` is required.
///
/// Every attach and every teardown bumps the link generation. Events a reader
/// queued carry the generation it was started with, so anything still in the
/// channel after a teardown is recognisably stale.
pub struct SerialLink {
    device: String,
    options: SerialOptions,
    generation: u64,
    reader: Option<ReaderHandle>,
}

impl SerialLink {
    pub fn new(device: impl Into<String>, options: SerialOptions) -> Self {
        Self {
            device: device.into(),
            options,
            generation: 0,
            reader: None,
        }
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn is_connected(&self) -> bool {
        self.reader.is_some()
    }

    /// Generation of the running reader, if any.
    pub fn link(&self) -> Option<u64> {
        self.reader.as_ref().map(|_| self.generation)
    }

    /// Open the configured device and start the read loop. A host with no
    /// serial support at all yields `Error::Unsupported`.
    pub fn connect(&mut self, tx: Sender<SerialEvent>) -> Result<ConnectOutcome> {
        if self.is_connected() {
            return Ok(ConnectOutcome::AlreadyConnected);
        }
        let port = match SerialPort::connect(&self.device, self.options) {
            Ok(port) => port,
            Err(err) => {
                ensure_serial_available()?;
                return Err(err);
            }
        };
        self.attach(port, tx)
    }

    /// Start the read loop over an already-open byte source.
    pub fn attach<R>(&mut self, reader: R, tx: Sender<SerialEvent>) -> Result<ConnectOutcome>
    where
        R: Read + Send + 'static,
    {
        if self.is_connected() {
            return Ok(ConnectOutcome::AlreadyConnected);
        }
        let link = self.generation + 1;
        let handle = spawn_reader(reader, link, tx).map_err(Error::Io)?;
        self.generation = link;
        self.reader = Some(handle);
        Ok(ConnectOutcome::Connected)
    }

    /// Operator disconnect. Stops the reader and releases the device.
    /// Returns false when nothing was connected.
    pub fn disconnect(&mut self) -> bool {
        match self.reader.take() {
            Some(mut reader) => {
                reader.cancel();
                self.generation += 1;
                true
            }
            None => false,
        }
    }

    /// Drop the handle after the reader reported the stream gone.
    pub fn release(&mut self) {
        self.disconnect();
    }
}

impl Drop for SerialLink {
    fn drop(&mut self) {
        self.disconnect();
    }
}
