use std::collections::VecDeque;
use std::io::{self, Read};

/// Scripted byte source standing in for a serial device in tests.
///
/// Each scripted chunk is returned by one `read` call. Once the script is
/// exhausted the fake either reports end-of-stream or keeps timing out, like
/// an idle but still attached device.
#[derive(Default)]
pub struct FakeSerialPort {
    script: VecDeque<io::Result<Vec<u8>>>,
    hold_open: bool,
}

impl FakeSerialPort {
    pub fn new(script: Vec<io::Result<Vec<u8>>>) -> Self {
        Self {
            script: script.into(),
            hold_open: false,
        }
    }

    /// Script made of text chunks only.
    pub fn from_chunks(chunks: &[&str]) -> Self {
        Self::new(
            chunks
                .iter()
                .map(|c| Ok(c.as_bytes().to_vec()))
                .collect(),
        )
    }

    /// Keep timing out instead of reporting EOF after the script ends.
    pub fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }
}

impl Read for FakeSerialPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.script.pop_front() {
            Some(Ok(mut chunk)) => {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                if n < chunk.len() {
                    self.script.push_front(Ok(chunk.split_off(n)));
                }
                Ok(n)
            }
            Some(Err(e)) => Err(e),
            None if self.hold_open => {
                std::thread::sleep(std::time::Duration::from_millis(5));
                Err(io::Error::new(io::ErrorKind::TimedOut, "no data"))
            }
            None => Ok(0),
        }
    }
}
