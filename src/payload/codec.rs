use bytes::{Buf, BytesMut};
use std::io;
use tokio_util::codec::Decoder;

use super::SensorPayload;

/// Longest line kept while waiting for a terminator.
pub const MAX_LINE_BYTES: usize = 1024;

/// Newline-delimited JSON records from the shoe's microcontroller.
///
/// Each complete line is trimmed, cut down to its first-`{`..last-`}` span and
/// decoded. Lines that do not decode are counted and skipped; they never end
/// the stream.
#[derive(Debug, Default)]
pub struct SensorLineCodec {
    dropped: u64,
    pending_dropped: Vec<String>,
}

impl SensorLineCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total lines discarded so far (malformed or oversize).
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Discarded lines since the last call, oldest first, for diagnostics.
    pub fn take_dropped(&mut self) -> Vec<String> {
        std::mem::take(&mut self.pending_dropped)
    }

    fn drop_line(&mut self, line: String) {
        self.dropped += 1;
        self.pending_dropped.push(line);
    }
}

impl Decoder for SensorLineCodec {
    type Item = SensorPayload;
    type Error = io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let Some(idx) = buf.iter().position(|b| *b == b'\n') else {
                if buf.len() > MAX_LINE_BYTES {
                    let len = buf.len();
                    buf.advance(len);
                    self.drop_line(format!("<{len} bytes without newline>"));
                }
                return Ok(None);
            };

            let raw = buf.split_to(idx + 1);
            let text = String::from_utf8_lossy(&raw[..idx]);
            let line = text.trim();
            if line.is_empty() {
                continue;
            }
            match SensorPayload::from_line(line) {
                Ok(payload) => return Ok(Some(payload)),
                Err(_) => self.drop_line(line.to_string()),
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(payload) = self.decode(buf)? {
            return Ok(Some(payload));
        }
        // An unterminated tail is never a complete record.
        if !buf.is_empty() {
            let tail = String::from_utf8_lossy(buf).trim().to_string();
            buf.clear();
            if !tail.is_empty() {
                self.drop_line(tail);
            }
        }
        Ok(None)
    }
}
