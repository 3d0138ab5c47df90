use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing_subscriber::filter::LevelFilter;

use syxpatch::devices::dstation;
use syxpatch::{Device, Model, Report, SlLayout, Variant, read_file};

#[derive(ValueEnum, Debug, Copy, Clone, PartialEq, Eq)]
enum DeviceArg {
    RemoteSl,
    Dstation,
    Prophet08,
}

/// Parses a patch dump and prints its parameters.
#[derive(Parser, Debug)]
#[command(name = "syxdump", version)]
struct Arguments {
    /// Device to parse as. Identified from the message when omitted.
    #[arg(long, short, value_enum)]
    device: Option<DeviceArg>,

    /// Use the ReMOTE SL Compact control layout.
    #[arg(long)]
    compact: bool,

    /// Patch of a D-Station bank dump to load.
    #[arg(long, default_value_t = 0)]
    slot: usize,

    /// Print diagnostics and library log messages.
    #[arg(long, short)]
    verbose: bool,

    file: PathBuf,
}

fn choose(args: &Arguments, data: &[u8]) -> Option<Device> {
    let device = match args.device {
        Some(DeviceArg::RemoteSl) => Device::RemoteSl(SlLayout::Standard),
        Some(DeviceArg::Dstation) => Device::DStation,
        Some(DeviceArg::Prophet08) => Device::Prophet08,
        None => syxpatch::identify(data)?.0,
    };
    match device {
        Device::RemoteSl(_) if args.compact => Some(Device::RemoteSl(SlLayout::Compact)),
        _ => Some(device),
    }
}

fn parse(device: Device, data: &[u8], slot: usize, model: &mut Model) -> Result<Report, syxpatch::FormatError> {
    if device == Device::DStation && device.classify(data) == Some(Variant::Bank) {
        let mut report = Report::new(Variant::Bank);
        dstation::parse_bank_slot(data, slot, model, &mut report)?;
        return Ok(report);
    }
    device.parse(data, model)
}

fn main() {
    let args = Arguments::parse();
    if args.verbose {
        tracing_subscriber::fmt().with_max_level(LevelFilter::DEBUG).with_writer(std::io::stderr).init();
    }

    let data = match read_file(&args.file) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("{}: {}", args.file.display(), e);
            std::process::exit(1);
        }
    };

    let Some(device) = choose(&args, &data) else {
        eprintln!("{}: not a recognized patch", args.file.display());
        std::process::exit(1);
    };

    let mut model = Model::new();
    match parse(device, &data, args.slot, &mut model) {
        Ok(report) => {
            let variant = report.variant.map_or("unknown".to_string(), |v| format!("{:?}", v));
            println!("{} {}, {} parameters", device.name(), variant, model.len());
            for (key, value) in model.iter() {
                println!("{} = {}", key, value);
            }
            if args.verbose {
                for diagnostic in &report.diagnostics {
                    println!("diagnostic: {}", diagnostic);
                }
            }
            if !report.is_clean() {
                eprintln!("{} diagnostic(s)", report.diagnostics.len());
            }
        },
        Err(e) => {
            eprintln!("{}: {}", args.file.display(), e);
            std::process::exit(1);
        }
    }
}
