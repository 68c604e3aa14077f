//! Optional async serial reader behind the `async-serial` feature.
//!
//! A building block for embedders that already run a tokio runtime. The
//! daemon's `SerialLink` always uses the threaded reader; callers of
//! [`stream_records`] pick their own link generation the same way.
#![cfg(feature = "async-serial")]

use crate::{
    payload::SensorLineCodec,
    serial::{classify_io_error, SerialEvent, SerialFailureKind, SerialOptions, SerialOutcome},
    Error, Result,
};
use crossbeam::channel::Sender;
use futures::StreamExt;
use std::{io, time::Duration};
use tokio::io::AsyncRead;
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, StopBits};
use tokio_util::{codec::FramedRead, sync::CancellationToken};

pub async fn connect(device: &str, options: SerialOptions) -> Result<tokio_serial::SerialStream> {
    if device.is_empty() {
        return Err(Error::InvalidArgs(
            "device path cannot be empty".to_string(),
        ));
    }

    tokio_serial::new(device, options.baud)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(Duration::from_millis(options.timeout_ms))
        .open_native_async()
        .map_err(|e| Error::Io(io::Error::from(e)))
}

/// Forward decoded records, stamped with `link`, until the stream ends, fails,
/// or `cancel` fires. A cancelled stream ends silently; every other ending
/// reports `SerialOutcome::Disconnected`.
pub async fn stream_records<S>(
    stream: S,
    link: u64,
    tx: Sender<SerialEvent>,
    cancel: CancellationToken,
) where
    S: AsyncRead + Unpin,
{
    let send = |outcome: SerialOutcome| tx.send(SerialEvent { link, outcome }).is_ok();
    let mut frames = FramedRead::new(stream, SensorLineCodec::new());
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            next = frames.next() => match next {
                Some(Ok(payload)) => {
                    for line in frames.decoder_mut().take_dropped() {
                        send(SerialOutcome::Dropped(line));
                    }
                    if !send(SerialOutcome::Record(payload)) {
                        return;
                    }
                }
                Some(Err(e)) => {
                    send(SerialOutcome::Disconnected(classify_io_error(&e), e.to_string()));
                    return;
                }
                None => {
                    for line in frames.decoder_mut().take_dropped() {
                        send(SerialOutcome::Dropped(line));
                    }
                    send(SerialOutcome::Disconnected(
                        SerialFailureKind::EndOfStream,
                        "device closed the stream".into(),
                    ));
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::Channel;
    use crossbeam::channel::unbounded;

    #[tokio::test]
    async fn streams_records_from_async_reader() {
        let input: &[u8] = b"noise{\"toe\":100}\nnot json at all\n{\"outside\":4}\n";
        let (tx, rx) = unbounded();
        stream_records(input, 5, tx, CancellationToken::new()).await;

        let events: Vec<_> = rx.try_iter().collect();
        assert!(events.iter().all(|e| e.link == 5));
        let records: Vec<_> = events
            .iter()
            .filter_map(|e| match &e.outcome {
                SerialOutcome::Record(p) => Some(p.reading),
                _ => None,
            })
            .collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get(Channel::Toe), 100.0);
        assert_eq!(records[1].get(Channel::Inside2), 4.0);
        assert!(matches!(
            events.last().map(|e| &e.outcome),
            Some(SerialOutcome::Disconnected(SerialFailureKind::EndOfStream, _))
        ));
    }

    #[tokio::test]
    async fn cancelled_stream_ends_quietly() {
        let input: &[u8] = b"{\"toe\":1}\n";
        let (tx, rx) = unbounded();
        let cancel = CancellationToken::new();
        cancel.cancel();
        stream_records(input, 1, tx, cancel).await;
        assert!(rx.try_recv().is_err());
    }
}
