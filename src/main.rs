use anyhow::{Context, Result};
use clap::Parser;
use std::time::Duration;

use gaussmeter::{Magnetometer, SerialTransport};

mod cli;
mod logging;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    logging::init_logging(args.log_level);

    let config = args.ser.to_config();
    let mut meter = Magnetometer::lakeshore_475(SerialTransport::new());
    let mut session = meter
        .connect(&config)
        .with_context(|| format!("opening {}", config.port))?;

    match args.cmd {
        cli::Cmd::Field { count, interval_ms } => {
            for i in 0..count {
                if i > 0 {
                    std::thread::sleep(Duration::from_millis(interval_ms));
                }
                let reading = session.read_field().context("reading field")?;
                println!("{reading}");
            }
        }
        cli::Cmd::Units { set: Some(unit) } => {
            session.set_units(unit).context("setting units")?;
        }
        cli::Cmd::Units { set: None } => {
            println!("{}", session.units().context("querying units")?);
        }
        cli::Cmd::Range { set: Some(range) } => {
            session.set_range(range).context("setting range")?;
        }
        cli::Cmd::Range { set: None } => {
            println!("{}", session.range().context("querying range")?);
        }
        cli::Cmd::Identify => {
            println!("{}", session.identify().context("identifying")?);
        }
    }
    Ok(())
}
