//! Consumer-facing magnetometer API.
//!
//! Every operation is exactly one driver `send` or `query`. Errors from the
//! driver or transport come back untouched.

use std::ops::{Deref, DerefMut};

use tracing::{info, warn};

use crate::communicator::DeviceCommunicator;
use crate::error::Result;
use crate::lakeshore::LakeShore475;
use crate::proto::command::{Command, FieldUnit, Identity, Measurement};
use crate::transport::{ConnectionState, Transport};

#[derive(Debug)]
pub struct Magnetometer<D> {
    driver: D,
}

impl<T: Transport> Magnetometer<LakeShore475<T>> {
    pub fn lakeshore_475(transport: T) -> Self {
        Self::new(LakeShore475::new(transport))
    }
}

impl<D: DeviceCommunicator> Magnetometer<D> {
    pub fn new(driver: D) -> Self {
        Self { driver }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn into_inner(self) -> D {
        self.driver
    }

    /// Open the instrument and hand back a guard that closes it on drop.
    pub fn connect(&mut self, config: &D::Config) -> Result<Session<'_, D>> {
        self.open(config)?;
        Ok(Session { meter: self })
    }

    pub fn open(&mut self, config: &D::Config) -> Result<()> {
        self.driver.open(config)?;
        info!("magnetometer connected");
        Ok(())
    }

    pub fn close(&mut self) {
        self.driver.close();
    }

    pub fn state(&self) -> ConnectionState {
        self.driver.state()
    }

    pub fn read_field(&mut self) -> Result<Measurement> {
        let response = self.driver.query(&Command::ReadField)?;
        self.driver.decode_measurement(&response)
    }

    pub fn set_range(&mut self, range: u8) -> Result<()> {
        self.driver.send(&Command::SetRange(range))
    }

    pub fn range(&mut self) -> Result<u8> {
        let response = self.driver.query(&Command::QueryRange)?;
        self.driver.decode_range(&response)
    }

    pub fn set_units(&mut self, unit: FieldUnit) -> Result<()> {
        self.driver.send(&Command::SetUnits(unit))
    }

    pub fn units(&mut self) -> Result<FieldUnit> {
        let response = self.driver.query(&Command::QueryUnits)?;
        self.driver.decode_units(&response)
    }

    pub fn identify(&mut self) -> Result<Identity> {
        let response = self.driver.query(&Command::Identify)?;
        self.driver.decode_identity(&response)
    }
}

/// An open magnetometer. Closing happens on drop, whichever way the scope
/// is left.
#[derive(Debug)]
pub struct Session<'a, D: DeviceCommunicator> {
    meter: &'a mut Magnetometer<D>,
}

impl<D: DeviceCommunicator> Deref for Session<'_, D> {
    type Target = Magnetometer<D>;

    fn deref(&self) -> &Self::Target {
        self.meter
    }
}

impl<D: DeviceCommunicator> DerefMut for Session<'_, D> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.meter
    }
}

impl<D: DeviceCommunicator> Drop for Session<'_, D> {
    fn drop(&mut self) {
        if self.meter.state() == ConnectionState::Faulted {
            warn!("closing faulted magnetometer session");
        }
        self.meter.close();
    }
}
