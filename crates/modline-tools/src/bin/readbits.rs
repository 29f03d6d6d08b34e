use clap::Parser;
use modline_instrument::BitFunction;
use modline_tools::common::{build_instrument, init_tracing, SerialConnectionArgs};

#[derive(Debug, Parser)]
#[command(name = "readbits", about = "Read coils or discrete inputs (FC01/FC02)")]
struct Args {
    #[command(flatten)]
    conn: SerialConnectionArgs,
    #[arg(long)]
    start: u16,
    #[arg(long, default_value_t = 1)]
    count: u16,
    /// Read coils (FC01) instead of discrete inputs (FC02).
    #[arg(long)]
    coils: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();
    let instrument = build_instrument(&args.conn).await?;

    let function = if args.coils {
        BitFunction::Coils
    } else {
        BitFunction::DiscreteInputs
    };
    let bits = instrument.read_bits(args.start, args.count, function).await?;

    for (idx, bit) in bits.iter().enumerate() {
        println!("addr={} value={}", args.start + idx as u16, u8::from(*bit));
    }
    Ok(())
}
