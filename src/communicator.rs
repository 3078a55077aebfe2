//! Command/response contract every instrument driver implements.

use std::fmt;

use crate::error::{Error, Result};
use crate::proto::command::{Command, FieldUnit, Identity, Measurement};
use crate::proto::parser::{ResponseFault, check_line};
use crate::transport::ConnectionState;

/// One reply line, terminator stripped, already checked to be printable
/// ASCII and free of device error codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    line: String,
}

impl Response {
    pub fn as_str(&self) -> &str {
        &self.line
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.line.as_bytes()
    }

    /// Wrap a decode failure together with the bytes that caused it.
    pub fn fault(&self, fault: ResponseFault) -> Error {
        Error::protocol(fault, self.as_bytes())
    }
}

impl TryFrom<Vec<u8>> for Response {
    type Error = Error;

    fn try_from(raw: Vec<u8>) -> Result<Self> {
        let checked = check_line(&raw).map(str::to_owned);
        match checked {
            Ok(line) => Ok(Response { line }),
            Err(fault) => Err(Error::protocol(fault, raw)),
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.line)
    }
}

/// Encodes [`Command`]s for one instrument, exchanges them over a transport
/// and decodes the replies.
///
/// Implementations hold no per-call state: one `send`/`query` is one wire
/// exchange, and no command is queued or pipelined.
pub trait DeviceCommunicator {
    type Config;

    fn open(&mut self, config: &Self::Config) -> Result<()>;
    fn close(&mut self);
    fn state(&self) -> ConnectionState;

    /// Write a command that has no reply.
    fn send(&mut self, command: &Command) -> Result<()>;

    /// Write a command and read its reply line.
    fn query(&mut self, command: &Command) -> Result<Response>;

    fn decode_measurement(&self, response: &Response) -> Result<Measurement>;
    fn decode_units(&self, response: &Response) -> Result<FieldUnit>;
    fn decode_range(&self, response: &Response) -> Result<u8>;
    fn decode_identity(&self, response: &Response) -> Result<Identity>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_clean_line() {
        let r = Response::try_from(b"+1.2345E+00G".to_vec()).unwrap();
        assert_eq!(r.as_str(), "+1.2345E+00G");
        assert_eq!(r.as_bytes(), b"+1.2345E+00G");
    }

    #[test]
    fn device_error_keeps_original_bytes() {
        let err = Response::try_from(b"ERR1".to_vec()).unwrap_err();
        match err {
            Error::Protocol { fault, raw } => {
                assert_eq!(fault, ResponseFault::DeviceError("ERR1".into()));
                assert_eq!(raw, b"ERR1");
            }
            other => panic!("expected protocol error, got {other:?}"),
        }
    }

    #[test]
    fn binary_garbage_is_protocol_error() {
        let raw = vec![0x02, b'1', 0x7F];
        let err = Response::try_from(raw.clone()).unwrap_err();
        assert!(matches!(err, Error::Protocol { fault: ResponseFault::NotAscii, .. }));
        assert_eq!(err.raw_bytes(), Some(raw.as_slice()));
    }
}
