// src/proto/parser.rs
//
// LakeShore 475 command grammar: uppercase mnemonics, space-separated
// arguments, comma-separated reply fields, CR/LF line ends.
use std::ops::RangeInclusive;
use std::str::FromStr;

use thiserror::Error;

use super::command::{Command, FieldUnit, Identity, Measurement};
use crate::error::{Error, Result};

/// Field ranges selectable with `RANGE n`.
pub const RANGES: RangeInclusive<u8> = 1..=5;

/// Ways a reply can violate the grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResponseFault {
    #[error("empty response")]
    Empty,
    #[error("response is not printable ASCII")]
    NotAscii,
    #[error("unexpected line terminator inside response")]
    UnexpectedTerminator,
    #[error("device reported {0}")]
    DeviceError(String),
    #[error("expected {expected} field(s), found {found}")]
    FieldCount { expected: usize, found: usize },
    #[error("not a number: {0:?}")]
    NotNumeric(String),
    #[error("non-finite reading: {0:?}")]
    NonFinite(String),
    #[error("unknown field unit: {0:?}")]
    UnknownUnit(String),
    #[error("value out of range: {0}")]
    OutOfRange(String),
}

/// Serialize a command to its wire line, without terminator.
pub fn format_command(cmd: &Command) -> Result<String> {
    use Command::*;
    let line = match cmd {
        ReadField => "RDGFIELD?".to_string(),
        SetRange(n) => {
            if !RANGES.contains(n) {
                return Err(Error::Encoding(format!(
                    "range {n} outside {}..={}",
                    RANGES.start(),
                    RANGES.end()
                )));
            }
            format!("RANGE {n}")
        }
        QueryRange => "RANGE?".to_string(),
        SetUnits(unit) => format!("UNIT {}", unit_code(*unit)),
        QueryUnits => "UNIT?".to_string(),
        Identify => "*IDN?".to_string(),
        Raw(line) => {
            let line = line.trim();
            if line.is_empty() {
                return Err(Error::Encoding("empty command line".into()));
            }
            if !line.bytes().all(is_printable) {
                return Err(Error::Encoding(format!(
                    "command {line:?} is not printable ASCII"
                )));
            }
            line.to_string()
        }
    };
    Ok(line)
}

/// Returns the error token when the instrument answered with an error code.
pub fn device_error(line: &str) -> Option<&str> {
    let s = line.trim();
    s.starts_with("ERR").then_some(s)
}

/// Parse a `RDGFIELD?` reply: `<number>[unit][,<status>]`.
pub fn parse_measurement(line: &str) -> std::result::Result<Measurement, ResponseFault> {
    let fields = split_fields(line)?;
    if fields.len() > 2 {
        return Err(ResponseFault::FieldCount {
            expected: 2,
            found: fields.len(),
        });
    }

    let (number, suffix) = split_number(fields[0]);
    let value = number
        .parse::<f64>()
        .map_err(|_| ResponseFault::NotNumeric(fields[0].to_string()))?;
    if !value.is_finite() {
        return Err(ResponseFault::NonFinite(fields[0].to_string()));
    }
    let unit = match suffix.trim() {
        "" => None,
        s => Some(unit_from_symbol(s).ok_or_else(|| ResponseFault::UnknownUnit(s.to_string()))?),
    };
    let status = fields
        .get(1)
        .map(|s| {
            s.parse::<u16>()
                .map_err(|_| ResponseFault::NotNumeric(s.to_string()))
        })
        .transpose()?;

    Ok(Measurement {
        value,
        unit,
        status,
    })
}

/// Parse a `UNIT?` reply (a single unit code).
pub fn parse_units(line: &str) -> std::result::Result<FieldUnit, ResponseFault> {
    let code = single_int(line)?;
    unit_from_code(code).ok_or_else(|| ResponseFault::OutOfRange(format!("unit code {code}")))
}

/// Parse a `RANGE?` reply.
pub fn parse_range(line: &str) -> std::result::Result<u8, ResponseFault> {
    let range = single_int(line)?;
    if RANGES.contains(&range) {
        Ok(range)
    } else {
        Err(ResponseFault::OutOfRange(format!("range {range}")))
    }
}

/// Parse an `*IDN?` reply: `manufacturer,model,serial,firmware`.
pub fn parse_identity(line: &str) -> std::result::Result<Identity, ResponseFault> {
    let fields = split_fields(line)?;
    match fields.as_slice() {
        [manufacturer, model, serial, firmware] => Ok(Identity {
            manufacturer: manufacturer.to_string(),
            model: model.to_string(),
            serial: serial.to_string(),
            firmware: firmware.to_string(),
        }),
        _ => Err(ResponseFault::FieldCount {
            expected: 4,
            found: fields.len(),
        }),
    }
}

/// Check a raw reply line before any decoding. Returns it as text.
pub fn check_line(raw: &[u8]) -> std::result::Result<&str, ResponseFault> {
    if raw.iter().any(|&b| b == b'\r' || b == b'\n') {
        return Err(ResponseFault::UnexpectedTerminator);
    }
    if !raw.iter().all(|&b| is_printable(b)) {
        return Err(ResponseFault::NotAscii);
    }
    let line = std::str::from_utf8(raw).map_err(|_| ResponseFault::NotAscii)?;
    if line.trim().is_empty() {
        return Err(ResponseFault::Empty);
    }
    if let Some(code) = device_error(line) {
        return Err(ResponseFault::DeviceError(code.to_string()));
    }
    Ok(line)
}

/* ---------- helpers ---------- */

fn is_printable(b: u8) -> bool {
    b.is_ascii_graphic() || b == b' '
}

fn split_fields(line: &str) -> std::result::Result<Vec<&str>, ResponseFault> {
    if line.trim().is_empty() {
        return Err(ResponseFault::Empty);
    }
    Ok(line.split(',').map(str::trim).collect())
}

fn single_int(line: &str) -> std::result::Result<u8, ResponseFault> {
    let fields = split_fields(line)?;
    if fields.len() != 1 {
        return Err(ResponseFault::FieldCount {
            expected: 1,
            found: fields.len(),
        });
    }
    fields[0]
        .parse::<u8>()
        .map_err(|_| ResponseFault::NotNumeric(fields[0].to_string()))
}

// "+1.2345E+00G" -> ("+1.2345E+00", "G")
fn split_number(token: &str) -> (&str, &str) {
    let end = token
        .find(|c: char| !matches!(c, '0'..='9' | '+' | '-' | '.' | 'e' | 'E'))
        .unwrap_or(token.len());
    token.split_at(end)
}

/* ---------- unit codes & FromStr ---------- */

pub fn unit_code(unit: FieldUnit) -> u8 {
    match unit {
        FieldUnit::Gauss => 1,
        FieldUnit::Tesla => 2,
        FieldUnit::Oersted => 3,
        FieldUnit::AmpsPerMeter => 4,
    }
}

pub fn unit_from_code(code: u8) -> Option<FieldUnit> {
    match code {
        1 => Some(FieldUnit::Gauss),
        2 => Some(FieldUnit::Tesla),
        3 => Some(FieldUnit::Oersted),
        4 => Some(FieldUnit::AmpsPerMeter),
        _ => None,
    }
}

fn unit_from_symbol(s: &str) -> Option<FieldUnit> {
    match s {
        "G" => Some(FieldUnit::Gauss),
        "T" => Some(FieldUnit::Tesla),
        "Oe" => Some(FieldUnit::Oersted),
        "A/m" => Some(FieldUnit::AmpsPerMeter),
        _ => None,
    }
}

// Accepts wire symbols as well as spelled-out names.
impl FromStr for FieldUnit {
    type Err = ResponseFault;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if let Some(unit) = unit_from_symbol(s) {
            return Ok(unit);
        }
        match s.to_ascii_lowercase().as_str() {
            "gauss" | "g" => Ok(FieldUnit::Gauss),
            "tesla" | "t" => Ok(FieldUnit::Tesla),
            "oersted" | "oe" => Ok(FieldUnit::Oersted),
            "amps-per-meter" | "a/m" => Ok(FieldUnit::AmpsPerMeter),
            _ => Err(ResponseFault::UnknownUnit(s.to_string())),
        }
    }
}

/* ---------- tests ---------- */

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_fixed_mnemonics() {
        assert_eq!(format_command(&Command::ReadField).unwrap(), "RDGFIELD?");
        assert_eq!(format_command(&Command::QueryRange).unwrap(), "RANGE?");
        assert_eq!(format_command(&Command::QueryUnits).unwrap(), "UNIT?");
        assert_eq!(format_command(&Command::Identify).unwrap(), "*IDN?");
    }

    #[test]
    fn format_arguments() {
        assert_eq!(format_command(&Command::SetRange(3)).unwrap(), "RANGE 3");
        assert_eq!(
            format_command(&Command::SetUnits(FieldUnit::Tesla)).unwrap(),
            "UNIT 2"
        );
        assert_eq!(
            format_command(&Command::Raw("  FILT 1 ".into())).unwrap(),
            "FILT 1"
        );
    }

    #[test]
    fn format_rejects_unencodable() {
        assert!(matches!(
            format_command(&Command::SetRange(0)),
            Err(Error::Encoding(_))
        ));
        assert!(matches!(
            format_command(&Command::SetRange(6)),
            Err(Error::Encoding(_))
        ));
        assert!(matches!(
            format_command(&Command::Raw("".into())),
            Err(Error::Encoding(_))
        ));
        assert!(matches!(
            format_command(&Command::Raw("RANGE 1\r\nRANGE 2".into())),
            Err(Error::Encoding(_))
        ));
        assert!(matches!(
            format_command(&Command::Raw("UNIT µ".into())),
            Err(Error::Encoding(_))
        ));
    }

    #[test]
    fn parse_scientific_reading_with_unit() {
        let m = parse_measurement("+1.2345E+00G").unwrap();
        assert_eq!(m.value, 1.2345);
        assert_eq!(m.unit, Some(FieldUnit::Gauss));
        assert_eq!(m.status, None);
    }

    #[test]
    fn parse_reading_variants() {
        let m = parse_measurement("-0.0520").unwrap();
        assert_eq!(m.value, -0.052);
        assert_eq!(m.unit, None);

        let m = parse_measurement("+3.000E-01 A/m,0").unwrap();
        assert_eq!(m.value, 0.3);
        assert_eq!(m.unit, Some(FieldUnit::AmpsPerMeter));
        assert_eq!(m.status, Some(0));

        let m = parse_measurement("12.5Oe, 32").unwrap();
        assert_eq!(m.unit, Some(FieldUnit::Oersted));
        assert_eq!(m.status, Some(32));
    }

    #[test]
    fn parse_reading_faults() {
        assert_eq!(parse_measurement(""), Err(ResponseFault::Empty));
        assert_eq!(
            parse_measurement("abc"),
            Err(ResponseFault::NotNumeric("abc".into()))
        );
        assert_eq!(
            parse_measurement("1.0,0,7"),
            Err(ResponseFault::FieldCount {
                expected: 2,
                found: 3
            })
        );
        assert_eq!(
            parse_measurement("1.0X"),
            Err(ResponseFault::UnknownUnit("X".into()))
        );
        assert_eq!(
            parse_measurement("1e999G"),
            Err(ResponseFault::NonFinite("1e999G".into()))
        );
        assert!(matches!(
            parse_measurement("1.0G,ok"),
            Err(ResponseFault::NotNumeric(_))
        ));
    }

    #[test]
    fn parse_units_and_range() {
        assert_eq!(parse_units("1"), Ok(FieldUnit::Gauss));
        assert_eq!(parse_units(" 4 "), Ok(FieldUnit::AmpsPerMeter));
        assert!(matches!(parse_units("9"), Err(ResponseFault::OutOfRange(_))));
        assert!(matches!(parse_units("G"), Err(ResponseFault::NotNumeric(_))));

        assert_eq!(parse_range("5"), Ok(5));
        assert!(matches!(parse_range("0"), Err(ResponseFault::OutOfRange(_))));
        assert!(matches!(
            parse_range("1,2"),
            Err(ResponseFault::FieldCount { expected: 1, found: 2 })
        ));
    }

    #[test]
    fn parse_identity_fields() {
        let id = parse_identity("LSCI,MODEL475,4750123,04102003").unwrap();
        assert_eq!(id.manufacturer, "LSCI");
        assert_eq!(id.model, "MODEL475");
        assert_eq!(id.serial, "4750123");
        assert_eq!(id.firmware, "04102003");

        assert_eq!(
            parse_identity("LSCI,MODEL475"),
            Err(ResponseFault::FieldCount {
                expected: 4,
                found: 2
            })
        );
    }

    #[test]
    fn check_line_classifies_raw_bytes() {
        assert_eq!(check_line(b"+1.0G"), Ok("+1.0G"));
        assert_eq!(
            check_line(b"ERR1"),
            Err(ResponseFault::DeviceError("ERR1".into()))
        );
        assert_eq!(check_line(b"  "), Err(ResponseFault::Empty));
        assert_eq!(
            check_line(b"1.0\r"),
            Err(ResponseFault::UnexpectedTerminator)
        );
        assert_eq!(check_line(&[0x31, 0xFF]), Err(ResponseFault::NotAscii));
    }

    #[test]
    fn unit_names_parse() {
        assert_eq!("G".parse::<FieldUnit>(), Ok(FieldUnit::Gauss));
        assert_eq!("tesla".parse::<FieldUnit>(), Ok(FieldUnit::Tesla));
        assert_eq!("Oe".parse::<FieldUnit>(), Ok(FieldUnit::Oersted));
        assert_eq!("a/m".parse::<FieldUnit>(), Ok(FieldUnit::AmpsPerMeter));
        assert!("furlong".parse::<FieldUnit>().is_err());
        for code in 1..=4 {
            let unit = unit_from_code(code).unwrap();
            assert_eq!(unit_code(unit), code);
        }
    }
}
