//! Serial driver for LakeShore 475 style gaussmeters.
//!
//! Layers, bottom up: a [`Transport`] moves bytes ([`SerialTransport`] over
//! RS-232, [`MockTransport`] in memory), a [`DeviceCommunicator`] such as
//! [`LakeShore475`] speaks one instrument's command language on top of it,
//! and [`Magnetometer`] exposes the typed operations callers use.
//!
//! ```no_run
//! use gaussmeter::{Magnetometer, SerialTransport, lakeshore};
//!
//! let mut meter = Magnetometer::lakeshore_475(SerialTransport::new());
//! let mut session = meter.connect(&lakeshore::serial_config("/dev/ttyUSB0"))?;
//! println!("{}", session.read_field()?);
//! # Ok::<(), gaussmeter::Error>(())
//! ```

pub mod communicator;
pub mod error;
pub mod lakeshore;
pub mod magnetometer;
pub mod mock;
pub mod port;
pub mod proto;
pub mod transport;

pub use communicator::{DeviceCommunicator, Response};
pub use error::{Error, Result};
pub use lakeshore::LakeShore475;
pub use magnetometer::{Magnetometer, Session};
pub use mock::MockTransport;
pub use port::{DataBits, Parity, SerialConfig, SerialTransport, StopBits};
pub use proto::command::{Command, FieldUnit, Identity, Measurement};
pub use proto::parser::ResponseFault;
pub use transport::{ConnectionState, Transport};
