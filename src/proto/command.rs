use std::fmt;

/// A semantic instruction for a magnetometer. Drivers decide how each
/// variant is spelled on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    // ---- Readings ----
    ReadField,

    // ---- Config ----
    SetRange(u8),
    QueryRange,
    SetUnits(FieldUnit),
    QueryUnits,

    // ---- Identification ----
    Identify,

    /// A command line sent verbatim; it is a query when it ends in `?`.
    Raw(String),
}

impl Command {
    /// Whether the instrument answers this command with a line.
    pub fn is_query(&self) -> bool {
        match self {
            Command::ReadField | Command::QueryRange | Command::QueryUnits | Command::Identify => {
                true
            }
            Command::SetRange(_) | Command::SetUnits(_) => false,
            Command::Raw(line) => line.trim_end().ends_with('?'),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldUnit {
    Gauss,
    Tesla,
    Oersted,
    AmpsPerMeter,
}

impl FieldUnit {
    pub fn symbol(self) -> &'static str {
        match self {
            FieldUnit::Gauss => "G",
            FieldUnit::Tesla => "T",
            FieldUnit::Oersted => "Oe",
            FieldUnit::AmpsPerMeter => "A/m",
        }
    }
}

impl fmt::Display for FieldUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// One decoded field reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub value: f64,
    /// Present when the instrument appended a unit suffix to the reading.
    pub unit: Option<FieldUnit>,
    /// Device status bits, when reported. Zero means a valid reading.
    pub status: Option<u16>,
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)?;
        if let Some(unit) = self.unit {
            write!(f, " {unit}")?;
        }
        if let Some(status) = self.status
            && status != 0
        {
            write!(f, " (status 0x{status:X})")?;
        }
        Ok(())
    }
}

/// Reply to an identification query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub manufacturer: String,
    pub model: String,
    pub serial: String,
    pub firmware: String,
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} (serial {}, firmware {})",
            self.manufacturer, self.model, self.serial, self.firmware
        )
    }
}
