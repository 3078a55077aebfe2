use std::time::Duration;

use thiserror::Error;

use crate::proto::parser::ResponseFault;
use crate::transport::ConnectionState;

/// Everything that can go wrong between the facade and the wire.
///
/// Each variant is a distinct failure kind; nothing in this crate retries or
/// converts one kind into another on the way up.
#[derive(Debug, Error)]
pub enum Error {
    /// The channel could not be acquired (missing port, busy port, bad config).
    #[error("cannot open {port}: {reason}")]
    Connection { port: String, reason: String },

    #[error("transport is {actual}, expected {expected}")]
    InvalidState {
        expected: ConnectionState,
        actual: ConnectionState,
    },

    /// Read or write failed on an open channel. The transport is now faulted.
    #[error("serial I/O: {0}")]
    Io(#[from] std::io::Error),

    /// No terminator arrived in time. The channel itself is still usable.
    #[error("no terminator within {timeout:?} ({} bytes buffered)", .partial.len())]
    Timeout { timeout: Duration, partial: Vec<u8> },

    #[error("cannot encode command: {0}")]
    Encoding(String),

    /// The device answered, but not in the expected grammar.
    #[error("{fault} (raw {:?})", String::from_utf8_lossy(.raw))]
    Protocol { fault: ResponseFault, raw: Vec<u8> },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn protocol(fault: ResponseFault, raw: impl Into<Vec<u8>>) -> Self {
        Error::Protocol {
            fault,
            raw: raw.into(),
        }
    }

    /// Bytes the device actually sent, for protocol faults and timeouts.
    pub fn raw_bytes(&self) -> Option<&[u8]> {
        match self {
            Error::Protocol { raw, .. } => Some(raw),
            Error::Timeout { partial, .. } => Some(partial),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_display_shows_raw_line() {
        let err = Error::protocol(ResponseFault::DeviceError("ERR1".into()), b"ERR1".to_vec());
        let msg = err.to_string();
        assert!(msg.contains("ERR1"));
        assert_eq!(err.raw_bytes(), Some(&b"ERR1"[..]));
    }

    #[test]
    fn timeout_reports_buffered_count() {
        let err = Error::Timeout {
            timeout: Duration::from_millis(500),
            partial: b"+1.23".to_vec(),
        };
        assert_eq!(err.to_string(), "no terminator within 500ms (5 bytes buffered)");
    }

    #[test]
    fn invalid_state_names_both_states() {
        let err = Error::InvalidState {
            expected: ConnectionState::Open,
            actual: ConnectionState::Faulted,
        };
        assert_eq!(err.to_string(), "transport is faulted, expected open");
        assert!(err.raw_bytes().is_none());
    }
}
