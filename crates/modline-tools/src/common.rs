use std::time::Duration;

use clap::Args;
use modline_datalink::{SerialConfig, TokioSerialPort};
use modline_instrument::{Instrument, InstrumentConfig, InstrumentError, Mode};

#[derive(Debug, Clone, Args)]
pub struct SerialConnectionArgs {
    /// Serial device, e.g. /dev/ttyUSB0 or COM4.
    #[arg(long)]
    pub port: String,
    #[arg(long, default_value_t = 19200)]
    pub baud: u32,
    /// Framing mode: rtu or ascii.
    #[arg(long, default_value = "rtu", value_parser = parse_mode)]
    pub mode: Mode,
    #[arg(long, default_value_t = 1)]
    pub slave: u8,
    /// Response timeout in milliseconds.
    #[arg(long, default_value_t = 50)]
    pub timeout: u64,
}

fn parse_mode(input: &str) -> Result<Mode, String> {
    match input.trim().to_ascii_lowercase().as_str() {
        "rtu" => Ok(Mode::Rtu),
        "ascii" => Ok(Mode::Ascii),
        _ => Err(format!("invalid mode: {input} (expected rtu or ascii)")),
    }
}

pub async fn build_instrument(
    args: &SerialConnectionArgs,
) -> Result<Instrument<TokioSerialPort>, InstrumentError> {
    let serial = SerialConfig::default().with_baud_rate(args.baud);
    let config = InstrumentConfig::default()
        .with_mode(args.mode)
        .with_response_timeout(Duration::from_millis(args.timeout));
    Instrument::open_serial(&args.port, args.slave, serial, config).await
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .try_init();
}

pub fn parse_bool(input: &str) -> Result<bool, String> {
    match input.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        _ => Err(format!("invalid bool value: {input}")),
    }
}
