use clap::Parser;
use modline_instrument::WriteRegisterFunction;
use modline_tools::common::{build_instrument, init_tracing, SerialConnectionArgs};

#[derive(Debug, Parser)]
#[command(name = "writereg", about = "Write one register, optionally scaled (FC16/FC06)")]
struct Args {
    #[command(flatten)]
    conn: SerialConnectionArgs,
    #[arg(long)]
    addr: u16,
    #[arg(long)]
    value: f64,
    /// Decimal scaling: the value is multiplied by 10^decimals on the wire.
    #[arg(long, default_value_t = 0)]
    decimals: u8,
    /// Use FC06 (write single register) instead of FC16.
    #[arg(long)]
    single: bool,
    /// Interpret the register as two's complement.
    #[arg(long)]
    signed: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();
    let instrument = build_instrument(&args.conn).await?;

    let function = if args.single {
        WriteRegisterFunction::Single
    } else {
        WriteRegisterFunction::Multiple
    };
    instrument
        .write_register(args.addr, args.value, args.decimals, function, args.signed)
        .await?;
    println!("addr={} <- {}", args.addr, args.value);
    Ok(())
}
