use clap::Parser;
use modline_instrument::WriteBitFunction;
use modline_tools::common::{build_instrument, init_tracing, parse_bool, SerialConnectionArgs};

#[derive(Debug, Parser)]
#[command(name = "writebit", about = "Write a single coil (FC05/FC15)")]
struct Args {
    #[command(flatten)]
    conn: SerialConnectionArgs,
    #[arg(long)]
    addr: u16,
    #[arg(long, value_parser = parse_bool)]
    value: bool,
    /// Use FC15 (write multiple coils) with a count of one instead of FC05.
    #[arg(long)]
    multiple: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();
    let instrument = build_instrument(&args.conn).await?;

    let function = if args.multiple {
        WriteBitFunction::Multiple
    } else {
        WriteBitFunction::Single
    };
    instrument.write_bit(args.addr, args.value, function).await?;
    println!("addr={} <- {}", args.addr, u8::from(args.value));
    Ok(())
}
