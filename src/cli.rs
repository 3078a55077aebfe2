use clap::{Args, Parser, Subcommand};
use std::time::Duration;

use gaussmeter::{DataBits, FieldUnit, Parity, SerialConfig, StopBits, lakeshore};

use crate::logging::LogLevel;

#[derive(Parser, Debug, Clone)]
#[command(name = "gaussmeter", about = "Read and configure a LakeShore 475 gaussmeter")]
pub struct Cli {
    #[command(flatten)]
    pub ser: SerialOpts,
    /// Log verbosity (RUST_LOG overrides)
    #[arg(long, value_enum, default_value_t = LogLevel::Warn)]
    pub log_level: LogLevel,
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Cmd {
    /// Read the field one or more times
    Field {
        /// Number of readings
        #[arg(long, default_value_t = 1)]
        count: u32,
        /// Pause between readings in milliseconds
        #[arg(long, default_value_t = 500)]
        interval_ms: u64,
    },
    /// Show the display units, or set them (G, T, Oe, A/m)
    Units { set: Option<FieldUnit> },
    /// Show the field range, or set it (1-5)
    Range { set: Option<u8> },
    /// Print the instrument identification
    Identify,
}

#[derive(Args, Debug, Clone)]
pub struct SerialOpts {
    /// Serial device path
    #[arg(long, default_value = "/dev/ttyUSB0")]
    pub dev: String,
    /// Baud rate (300, 1200 or 9600)
    #[arg(long, default_value_t = 9600)]
    pub baud: u32,
    /// Data bits (5-8)
    #[arg(long, default_value = "7")]
    pub data_bits: DataBits,
    /// Parity: none, even or odd
    #[arg(long, default_value = "odd")]
    pub parity: Parity,
    /// Stop bits (1 or 2)
    #[arg(long, default_value = "1")]
    pub stop_bits: StopBits,
    /// Response timeout in milliseconds
    #[arg(long, default_value_t = 3000)]
    pub timeout_ms: u64,
}

impl SerialOpts {
    pub fn to_config(&self) -> SerialConfig {
        lakeshore::serial_config(self.dev.as_str())
            .baud_rate(self.baud)
            .data_bits(self.data_bits)
            .parity(self.parity)
            .stop_bits(self.stop_bits)
            .read_timeout(Duration::from_millis(self.timeout_ms))
    }
}
