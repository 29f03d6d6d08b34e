use clap::Parser;
use modline_instrument::RegisterFunction;
use modline_tools::common::{build_instrument, init_tracing, SerialConnectionArgs};

#[derive(Debug, Parser)]
#[command(name = "readreg", about = "Read holding or input registers (FC03/FC04)")]
struct Args {
    #[command(flatten)]
    conn: SerialConnectionArgs,
    #[arg(long)]
    start: u16,
    #[arg(long, default_value_t = 1)]
    count: u16,
    /// Read input registers (FC04) instead of holding registers (FC03).
    #[arg(long)]
    input: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();
    let instrument = build_instrument(&args.conn).await?;

    let function = if args.input {
        RegisterFunction::Input
    } else {
        RegisterFunction::Holding
    };
    let values = instrument.read_registers(args.start, args.count, function).await?;

    for (idx, value) in values.iter().enumerate() {
        println!(
            "addr={} value={} (0x{:04X})",
            args.start + idx as u16,
            value,
            value
        );
    }
    Ok(())
}
