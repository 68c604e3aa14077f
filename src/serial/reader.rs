use bytes::BytesMut;
use crossbeam::channel::Sender;
use std::io::{self, Read};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::{self, JoinHandle};
use tokio_util::codec::Decoder;

use super::{classify_io_error, SerialFailureKind};
use crate::payload::{SensorLineCodec, SensorPayload};

const READ_CHUNK_BYTES: usize = 256;

/// What the reader saw on the line.
#[derive(Debug)]
pub enum SerialOutcome {
    Record(SensorPayload),
    /// A line that did not decode; informational only.
    Dropped(String),
    /// The stream ended or failed. The reader has already exited.
    Disconnected(SerialFailureKind, String),
}

/// Reports sent from the reader thread to the event loop, stamped with the
/// link (one per attach) that produced them.
#[derive(Debug)]
pub struct SerialEvent {
    pub link: u64,
    pub outcome: SerialOutcome,
}

/// Owns the reader thread. Cancelling (or dropping) stops the loop and waits
/// for the thread, which releases the device handle and the line buffer.
pub struct ReaderHandle {
    running: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl ReaderHandle {
    pub fn is_running(&self) -> bool {
        self.join.as_ref().is_some_and(|j| !j.is_finished())
    }

    /// Idempotent.
    pub fn cancel(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl Drop for ReaderHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Spawn the read loop over any byte source (a serial port or a test fake).
pub fn spawn_reader<R>(reader: R, link: u64, tx: Sender<SerialEvent>) -> io::Result<ReaderHandle>
where
    R: Read + Send + 'static,
{
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();
    let join = thread::Builder::new()
        .name(format!("kicksense-serial-{link}"))
        .spawn(move || run_reader(reader, link, &running_clone, &tx))?;
    Ok(ReaderHandle {
        running,
        join: Some(join),
    })
}

fn run_reader<R: Read>(mut reader: R, link: u64, running: &AtomicBool, tx: &Sender<SerialEvent>) {
    let send = |outcome: SerialOutcome| tx.send(SerialEvent { link, outcome }).is_ok();
    let mut codec = SensorLineCodec::new();
    let mut buffer = BytesMut::with_capacity(READ_CHUNK_BYTES * 4);
    let mut chunk = [0u8; READ_CHUNK_BYTES];

    while running.load(Ordering::SeqCst) {
        match reader.read(&mut chunk) {
            Ok(0) => {
                send(SerialOutcome::Disconnected(
                    SerialFailureKind::EndOfStream,
                    "device closed the stream".into(),
                ));
                return;
            }
            Ok(n) => {
                buffer.extend_from_slice(&chunk[..n]);
                loop {
                    let decoded = codec.decode(&mut buffer);
                    for line in codec.take_dropped() {
                        send(SerialOutcome::Dropped(line));
                    }
                    match decoded {
                        Ok(Some(payload)) => {
                            if !send(SerialOutcome::Record(payload)) {
                                return;
                            }
                        }
                        Ok(None) => break,
                        Err(_) => {
                            buffer.clear();
                            break;
                        }
                    }
                }
            }
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) =>
            {
                continue;
            }
            Err(e) => {
                send(SerialOutcome::Disconnected(classify_io_error(&e), e.to_string()));
                return;
            }
        }
    }
}
