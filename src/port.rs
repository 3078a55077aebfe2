use serialport::SerialPort;
use std::io::Write;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::transport::{ConnectionState, Transport, read_until_terminator, require_open};

/// Rates `open` accepts unless a narrower set is configured.
pub const STANDARD_BAUD_RATES: &[u32] = &[
    300, 600, 1200, 2400, 4800, 9600, 19_200, 38_400, 57_600, 115_200,
];

// Cap on a single blocking read, so the overall read bound stays accurate.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Even,
    Odd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBits {
    One,
    Two,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

/// Line settings for a serial transport.
///
/// The defaults are what a LakeShore 475 ships with: 9600 baud, 7 data bits,
/// odd parity, one stop bit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Device path or name, e.g. `/dev/ttyUSB0` or `COM3`.
    pub port: String,
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    /// Upper bound on waiting for one response line.
    pub read_timeout: Duration,
    /// Baud rates the instrument on the other end understands.
    pub accepted_baud_rates: &'static [u32],
}

impl SerialConfig {
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: 9600,
            data_bits: DataBits::Seven,
            parity: Parity::Odd,
            stop_bits: StopBits::One,
            read_timeout: Duration::from_secs(3),
            accepted_baud_rates: STANDARD_BAUD_RATES,
        }
    }

    pub fn baud_rate(mut self, baud: u32) -> Self {
        self.baud_rate = baud;
        self
    }

    pub fn data_bits(mut self, bits: DataBits) -> Self {
        self.data_bits = bits;
        self
    }

    pub fn parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }

    pub fn stop_bits(mut self, stop: StopBits) -> Self {
        self.stop_bits = stop;
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn accepted_baud_rates(mut self, rates: &'static [u32]) -> Self {
        self.accepted_baud_rates = rates;
        self
    }

    /// Reject settings the instrument cannot accept, before touching the OS.
    pub fn validate(&self) -> Result<()> {
        let reject = |reason: String| {
            Err(Error::Connection {
                port: self.port.clone(),
                reason,
            })
        };
        if self.port.trim().is_empty() {
            return reject("empty port name".into());
        }
        if !self.accepted_baud_rates.contains(&self.baud_rate) {
            return reject(format!(
                "baud rate {} not in {:?}",
                self.baud_rate, self.accepted_baud_rates
            ));
        }
        if self.read_timeout.is_zero() {
            return reject("read timeout must be non-zero".into());
        }
        Ok(())
    }
}

pub fn open_port(config: &SerialConfig) -> Result<Box<dyn SerialPort>> {
    let builder = serialport::new(&config.port, config.baud_rate)
        .timeout(config.read_timeout.min(POLL_INTERVAL))
        .data_bits(config.data_bits.into())
        .parity(config.parity.into())
        .stop_bits(config.stop_bits.into())
        .flow_control(serialport::FlowControl::None);

    builder.open().map_err(|e| Error::Connection {
        port: config.port.clone(),
        reason: e.to_string(),
    })
}

/// [`Transport`] over an RS-232 line.
///
/// Any read/write failure leaves the transport Faulted; it has to be closed
/// and reopened before it will carry traffic again.
#[derive(Default)]
pub struct SerialTransport {
    port: Option<Box<dyn SerialPort>>,
    state: ConnectionState,
    name: String,
    read_timeout: Duration,
}

impl SerialTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn fault(&mut self, err: Error) -> Error {
        if matches!(err, Error::Io(_)) {
            warn!(port = %self.name, error = %err, "serial transport faulted");
            self.state = ConnectionState::Faulted;
        }
        err
    }
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("port", &self.name)
            .field("state", &self.state)
            .field("read_timeout", &self.read_timeout)
            .finish()
    }
}

impl Transport for SerialTransport {
    type Config = SerialConfig;

    fn open(&mut self, config: &SerialConfig) -> Result<()> {
        if self.state != ConnectionState::Closed {
            return Err(Error::InvalidState {
                expected: ConnectionState::Closed,
                actual: self.state,
            });
        }
        config.validate()?;
        let port = open_port(config)?;
        info!(
            port = %config.port,
            baud = config.baud_rate,
            parity = ?config.parity,
            stop_bits = ?config.stop_bits,
            "opened serial port"
        );
        self.port = Some(port);
        self.name = config.port.clone();
        self.read_timeout = config.read_timeout;
        self.state = ConnectionState::Open;
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        require_open(self.state)?;
        let Some(port) = self.port.as_mut() else {
            return Err(Error::InvalidState {
                expected: ConnectionState::Open,
                actual: ConnectionState::Closed,
            });
        };
        let res = port.write_all(bytes).and_then(|()| port.flush());
        match res {
            Ok(()) => {
                debug!(port = %self.name, bytes = ?String::from_utf8_lossy(bytes), "tx");
                Ok(())
            }
            Err(e) => Err(self.fault(Error::Io(e))),
        }
    }

    fn read_until(&mut self, terminator: &[u8], timeout: Duration) -> Result<Vec<u8>> {
        require_open(self.state)?;
        let Some(port) = self.port.as_mut() else {
            return Err(Error::InvalidState {
                expected: ConnectionState::Open,
                actual: ConnectionState::Closed,
            });
        };
        match read_until_terminator(&mut **port, terminator, timeout) {
            Ok(line) => {
                debug!(port = %self.name, bytes = ?String::from_utf8_lossy(&line), "rx");
                Ok(line)
            }
            Err(e) => Err(self.fault(e)),
        }
    }

    fn discard_input(&mut self) -> Result<()> {
        require_open(self.state)?;
        let Some(port) = self.port.as_mut() else {
            return Err(Error::InvalidState {
                expected: ConnectionState::Open,
                actual: ConnectionState::Closed,
            });
        };
        let dropped = port.bytes_to_read().unwrap_or(0);
        match port.clear(serialport::ClearBuffer::Input) {
            Ok(()) => {
                if dropped > 0 {
                    debug!(port = %self.name, dropped, "discarded stale input");
                }
                Ok(())
            }
            Err(e) => Err(self.fault(Error::Io(e.into()))),
        }
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            info!(port = %self.name, "closed serial port");
        }
        self.state = ConnectionState::Closed;
    }

    fn state(&self) -> ConnectionState {
        self.state
    }

    fn read_timeout(&self) -> Duration {
        self.read_timeout
    }
}

/* ---------- serialport conversions & FromStr impls ---------- */

impl From<Parity> for serialport::Parity {
    fn from(p: Parity) -> Self {
        match p {
            Parity::None => serialport::Parity::None,
            Parity::Even => serialport::Parity::Even,
            Parity::Odd => serialport::Parity::Odd,
        }
    }
}

impl From<StopBits> for serialport::StopBits {
    fn from(s: StopBits) -> Self {
        match s {
            StopBits::One => serialport::StopBits::One,
            StopBits::Two => serialport::StopBits::Two,
        }
    }
}

impl From<DataBits> for serialport::DataBits {
    fn from(d: DataBits) -> Self {
        match d {
            DataBits::Five => serialport::DataBits::Five,
            DataBits::Six => serialport::DataBits::Six,
            DataBits::Seven => serialport::DataBits::Seven,
            DataBits::Eight => serialport::DataBits::Eight,
        }
    }
}

impl FromStr for Parity {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "n" => Ok(Parity::None),
            "even" | "e" => Ok(Parity::Even),
            "odd" | "o" => Ok(Parity::Odd),
            _ => Err(format!("parity must be none, even or odd, got {s:?}")),
        }
    }
}

impl FromStr for StopBits {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "1" => Ok(StopBits::One),
            "2" => Ok(StopBits::Two),
            _ => Err(format!("stop bits must be 1 or 2, got {s:?}")),
        }
    }
}

impl FromStr for DataBits {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "5" => Ok(DataBits::Five),
            "6" => Ok(DataBits::Six),
            "7" => Ok(DataBits::Seven),
            "8" => Ok(DataBits::Eight),
            _ => Err(format!("data bits must be 5..=8, got {s:?}")),
        }
    }
}
