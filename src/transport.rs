//! Byte-level channel contract shared by every transport.

use std::fmt;
use std::io::{self, ErrorKind, Read};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

/// Lifecycle of a transport. Closed at construction, Open after a successful
/// `open`, Faulted after an I/O error. Only `close` leads back to Closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Closed,
    Open,
    Faulted,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConnectionState::Closed => "closed",
            ConnectionState::Open => "open",
            ConnectionState::Faulted => "faulted",
        })
    }
}

/// A blocking, exclusively owned byte channel.
///
/// One exchange at a time: callers sharing a transport across threads must
/// serialize access themselves.
pub trait Transport {
    type Config;

    /// Acquire the channel. Fails with `InvalidState` unless Closed.
    fn open(&mut self, config: &Self::Config) -> Result<()>;

    fn write(&mut self, bytes: &[u8]) -> Result<()>;

    /// Block until `terminator` is seen or `timeout` elapses. The returned
    /// bytes exclude the terminator.
    fn read_until(&mut self, terminator: &[u8], timeout: Duration) -> Result<Vec<u8>>;

    /// Drop whatever has been received but not read yet, e.g. a reply that
    /// showed up after its `read_until` gave up.
    fn discard_input(&mut self) -> Result<()>;

    /// Release the channel. Never fails; Closed afterwards.
    fn close(&mut self);

    fn state(&self) -> ConnectionState;

    /// Upper bound applied to reads when the caller has no better one.
    fn read_timeout(&self) -> Duration;
}

pub(crate) fn require_open(state: ConnectionState) -> Result<()> {
    if state == ConnectionState::Open {
        Ok(())
    } else {
        Err(Error::InvalidState {
            expected: ConnectionState::Open,
            actual: state,
        })
    }
}

/// Read one byte at a time until `terminator` or `timeout`.
///
/// `TimedOut`, `WouldBlock` and `Interrupted` mean "nothing yet". A
/// zero-length read is end of file (the other end is gone) and, like any
/// other error, is returned as `Error::Io`.
pub(crate) fn read_until_terminator<R: Read + ?Sized>(
    reader: &mut R,
    terminator: &[u8],
    timeout: Duration,
) -> Result<Vec<u8>> {
    if terminator.is_empty() {
        return Err(Error::Encoding("empty terminator".into()));
    }
    let start = Instant::now();
    let mut buf = Vec::with_capacity(32);
    let mut byte = [0u8; 1];

    loop {
        if buf.ends_with(terminator) {
            buf.truncate(buf.len() - terminator.len());
            return Ok(buf);
        }
        if start.elapsed() >= timeout {
            return Err(Error::Timeout {
                timeout,
                partial: buf,
            });
        }
        match reader.read(&mut byte) {
            Ok(0) => {
                return Err(Error::Io(io::Error::new(
                    ErrorKind::UnexpectedEof,
                    "serial line closed",
                )));
            }
            Ok(_) => buf.push(byte[0]),
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                ) =>
            {
                continue;
            }
            Err(e) => return Err(Error::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Hands out queued bytes, then behaves like a silent serial line.
    struct Trickle {
        data: VecDeque<u8>,
        fail_with: Option<ErrorKind>,
        eof: bool,
    }

    impl Trickle {
        fn new(data: &[u8]) -> Self {
            Self {
                data: data.iter().copied().collect(),
                fail_with: None,
                eof: false,
            }
        }
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.data.pop_front() {
                Some(b) => {
                    buf[0] = b;
                    Ok(1)
                }
                None if self.eof => Ok(0),
                None => match self.fail_with {
                    Some(kind) => Err(io::Error::new(kind, "line dropped")),
                    None => Err(io::Error::new(ErrorKind::TimedOut, "no data")),
                },
            }
        }
    }

    #[test]
    fn stops_at_terminator() {
        let mut r = Trickle::new(b"+1.2345E+00G\r\nLEFTOVER");
        let got = read_until_terminator(&mut r, b"\r\n", Duration::from_millis(200)).unwrap();
        assert_eq!(got, b"+1.2345E+00G");
        // nothing past the terminator was consumed
        assert_eq!(r.data.len(), b"LEFTOVER".len());
    }

    #[test]
    fn lone_cr_is_not_a_terminator() {
        let mut r = Trickle::new(b"A\rB\r\n");
        let got = read_until_terminator(&mut r, b"\r\n", Duration::from_millis(200)).unwrap();
        assert_eq!(got, b"A\rB");
    }

    #[test]
    fn silence_times_out_with_partial_bytes() {
        let mut r = Trickle::new(b"+1.23");
        let err = read_until_terminator(&mut r, b"\r\n", Duration::from_millis(20)).unwrap_err();
        match err {
            Error::Timeout { timeout, partial } => {
                assert_eq!(timeout, Duration::from_millis(20));
                assert_eq!(partial, b"+1.23");
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[test]
    fn hard_errors_surface_as_io() {
        let mut r = Trickle::new(b"+1");
        r.fail_with = Some(ErrorKind::BrokenPipe);
        let err = read_until_terminator(&mut r, b"\r\n", Duration::from_millis(200)).unwrap_err();
        assert!(matches!(err, Error::Io(ref e) if e.kind() == ErrorKind::BrokenPipe));
    }

    #[test]
    fn eof_is_io_not_timeout() {
        let mut r = Trickle::new(b"+1");
        r.eof = true;
        let err = read_until_terminator(&mut r, b"\r\n", Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, Error::Io(ref e) if e.kind() == ErrorKind::UnexpectedEof));
    }

    #[test]
    fn empty_terminator_is_rejected() {
        let mut r = Trickle::new(b"abc");
        let err = read_until_terminator(&mut r, b"", Duration::from_millis(10)).unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));
    }

    #[test]
    fn require_open_reports_actual_state() {
        assert!(require_open(ConnectionState::Open).is_ok());
        let err = require_open(ConnectionState::Closed).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidState {
                expected: ConnectionState::Open,
                actual: ConnectionState::Closed
            }
        ));
    }
}
