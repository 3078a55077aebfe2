//! Scripted in-memory transport.
//!
//! Replies are queued ahead of time and land in the receive buffer one per
//! `read_until`; a reply without the terminator behaves like a line that went
//! quiet and yields `Timeout` immediately instead of sleeping. Bytes pushed
//! with `push_stray` are already waiting in the buffer, as a reply that
//! arrived after its read timed out would be.

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::port::SerialConfig;
use crate::transport::{ConnectionState, Transport, require_open};

#[derive(Debug)]
enum Reply {
    Bytes(Vec<u8>),
    Fail(io::ErrorKind),
}

#[derive(Debug, Default)]
pub struct MockTransport {
    state: ConnectionState,
    read_timeout: Duration,
    replies: VecDeque<Reply>,
    input: Vec<u8>,
    written: Vec<Vec<u8>>,
    reads: usize,
    discards: usize,
    opens: usize,
    refuse_open: Option<String>,
    fail_write: Option<io::ErrorKind>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes the "device" sends back on the next read.
    pub fn push_reply(&mut self, bytes: &[u8]) -> &mut Self {
        self.replies.push_back(Reply::Bytes(bytes.to_vec()));
        self
    }

    /// Put bytes straight into the receive buffer, ahead of any reply.
    pub fn push_stray(&mut self, bytes: &[u8]) -> &mut Self {
        self.input.extend_from_slice(bytes);
        self
    }

    /// Make the next read fail with an I/O error of `kind`.
    pub fn push_read_error(&mut self, kind: io::ErrorKind) -> &mut Self {
        self.replies.push_back(Reply::Fail(kind));
        self
    }

    /// Make the next write fail with an I/O error of `kind`.
    pub fn fail_next_write(&mut self, kind: io::ErrorKind) -> &mut Self {
        self.fail_write = Some(kind);
        self
    }

    /// Make every `open` fail as if the port were missing.
    pub fn refuse_open(&mut self, reason: impl Into<String>) -> &mut Self {
        self.refuse_open = Some(reason.into());
        self
    }

    /// Every successful write, in order.
    pub fn written(&self) -> &[Vec<u8>] {
        &self.written
    }

    /// Number of `read_until` calls that reached the channel.
    pub fn reads(&self) -> usize {
        self.reads
    }

    /// Number of times the receive buffer was flushed.
    pub fn discards(&self) -> usize {
        self.discards
    }

    /// Number of successful opens.
    pub fn opens(&self) -> usize {
        self.opens
    }

    fn fault(&mut self, kind: io::ErrorKind) -> Error {
        self.state = ConnectionState::Faulted;
        Error::Io(io::Error::new(kind, "mock transport failure"))
    }
}

impl Transport for MockTransport {
    type Config = SerialConfig;

    fn open(&mut self, config: &SerialConfig) -> Result<()> {
        if self.state != ConnectionState::Closed {
            return Err(Error::InvalidState {
                expected: ConnectionState::Closed,
                actual: self.state,
            });
        }
        config.validate()?;
        if let Some(reason) = &self.refuse_open {
            return Err(Error::Connection {
                port: config.port.clone(),
                reason: reason.clone(),
            });
        }
        self.read_timeout = config.read_timeout;
        self.state = ConnectionState::Open;
        self.opens += 1;
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        require_open(self.state)?;
        if let Some(kind) = self.fail_write.take() {
            return Err(self.fault(kind));
        }
        self.written.push(bytes.to_vec());
        Ok(())
    }

    fn read_until(&mut self, terminator: &[u8], timeout: Duration) -> Result<Vec<u8>> {
        require_open(self.state)?;
        if terminator.is_empty() {
            return Err(Error::Encoding("empty terminator".into()));
        }
        self.reads += 1;
        match self.replies.pop_front() {
            None => {}
            Some(Reply::Fail(kind)) => return Err(self.fault(kind)),
            Some(Reply::Bytes(bytes)) => self.input.extend(bytes),
        }
        match self
            .input
            .windows(terminator.len())
            .position(|w| w == terminator)
        {
            Some(pos) => {
                let line = self.input.drain(..pos).collect();
                self.input.drain(..terminator.len());
                Ok(line)
            }
            None => Err(Error::Timeout {
                timeout,
                partial: std::mem::take(&mut self.input),
            }),
        }
    }

    fn discard_input(&mut self) -> Result<()> {
        require_open(self.state)?;
        self.discards += 1;
        self.input.clear();
        Ok(())
    }

    fn close(&mut self) {
        self.input.clear();
        self.state = ConnectionState::Closed;
    }

    fn state(&self) -> ConnectionState {
        self.state
    }

    fn read_timeout(&self) -> Duration {
        self.read_timeout
    }
}
