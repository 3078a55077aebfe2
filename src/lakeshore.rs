//! LakeShore 475 DSP gaussmeter driver.

use std::time::Duration;

use tracing::debug;

use crate::communicator::{DeviceCommunicator, Response};
use crate::error::{Error, Result};
use crate::port::SerialConfig;
use crate::proto::command::{Command, FieldUnit, Identity, Measurement};
use crate::proto::parser::{
    format_command, parse_identity, parse_measurement, parse_range, parse_units,
};
use crate::transport::{ConnectionState, Transport};

/// Line terminator the 475 uses in both directions.
pub const TERMINATOR: &[u8] = b"\r\n";

/// Baud rates selectable on the 475 front panel.
pub const BAUD_RATES: &[u32] = &[300, 1200, 9600];

/// Serial settings for a 475 on `port`, restricted to the rates it supports.
pub fn serial_config(port: impl Into<String>) -> SerialConfig {
    SerialConfig::new(port).accepted_baud_rates(BAUD_RATES)
}

/// Speaks the 475 command language over any [`Transport`].
#[derive(Debug)]
pub struct LakeShore475<T> {
    transport: T,
    terminator: Vec<u8>,
    timeout: Option<Duration>,
}

impl<T: Transport> LakeShore475<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            terminator: TERMINATOR.to_vec(),
            timeout: None,
        }
    }

    /// Use a different line terminator (the 475 can be set to CR or LF only).
    pub fn with_terminator(mut self, terminator: impl Into<Vec<u8>>) -> Result<Self> {
        let terminator = terminator.into();
        if terminator.is_empty() {
            return Err(Error::Encoding("empty terminator".into()));
        }
        self.terminator = terminator;
        Ok(self)
    }

    /// Bound reads by `timeout` instead of the transport's configured one.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn terminator(&self) -> &[u8] {
        &self.terminator
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    fn encode(&self, command: &Command) -> Result<Vec<u8>> {
        let mut out = format_command(command)?.into_bytes();
        out.extend_from_slice(&self.terminator);
        Ok(out)
    }
}

impl<T: Transport> DeviceCommunicator for LakeShore475<T> {
    type Config = T::Config;

    fn open(&mut self, config: &T::Config) -> Result<()> {
        self.transport.open(config)
    }

    fn close(&mut self) {
        self.transport.close()
    }

    fn state(&self) -> ConnectionState {
        self.transport.state()
    }

    fn send(&mut self, command: &Command) -> Result<()> {
        if command.is_query() {
            return Err(Error::Encoding(format!(
                "{command:?} expects a reply, use query"
            )));
        }
        let line = self.encode(command)?;
        debug!(?command, "send");
        self.transport.write(&line)
    }

    fn query(&mut self, command: &Command) -> Result<Response> {
        if !command.is_query() {
            return Err(Error::Encoding(format!("{command:?} has no reply, use send")));
        }
        let line = self.encode(command)?;
        let timeout = self
            .timeout
            .unwrap_or_else(|| self.transport.read_timeout());
        // Whatever is buffered now answers some earlier command.
        self.transport.discard_input()?;
        self.transport.write(&line)?;
        let raw = self.transport.read_until(&self.terminator, timeout)?;
        let response = Response::try_from(raw)?;
        debug!(?command, response = %response, "query");
        Ok(response)
    }

    fn decode_measurement(&self, response: &Response) -> Result<Measurement> {
        parse_measurement(response.as_str()).map_err(|f| response.fault(f))
    }

    fn decode_units(&self, response: &Response) -> Result<FieldUnit> {
        parse_units(response.as_str()).map_err(|f| response.fault(f))
    }

    fn decode_range(&self, response: &Response) -> Result<u8> {
        parse_range(response.as_str()).map_err(|f| response.fault(f))
    }

    fn decode_identity(&self, response: &Response) -> Result<Identity> {
        parse_identity(response.as_str()).map_err(|f| response.fault(f))
    }
}
