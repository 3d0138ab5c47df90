use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing_subscriber::filter::LevelFilter;

use syxpatch::{Message, UniversalKind, message_count, split_messages, read_file};

#[derive(ValueEnum, Debug, Copy, Clone)]
enum LogLevel {
    Warn,
    Debug,
}

/// Identifies the System Exclusive messages in one or more files.
#[derive(Parser, Debug)]
#[command(name = "syxidentify", version)]
struct Arguments {
    /// Files with one or more messages.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    #[arg(long, short, value_enum)]
    log_level: Option<LogLevel>,
}

fn main() {
    let args = Arguments::parse();
    if let Some(level) = args.log_level {
        let filter = match level {
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Debug => LevelFilter::DEBUG,
        };
        tracing_subscriber::fmt().with_max_level(filter).with_writer(std::io::stderr).init();
    }

    let mut failed = false;
    for path in &args.files {
        let buffer = match read_file(path) {
            Ok(buffer) => buffer,
            Err(e) => {
                eprintln!("{}: {}", path.display(), e);
                failed = true;
                continue;
            }
        };

        let count = message_count(&buffer);
        println!("{}: {} message(s)", path.display(), count);
        for (number, data) in split_messages(&buffer).iter().enumerate() {
            println!("Message {} of {}, {} bytes", number + 1, count, data.len());
            match Message::new(data) {
                Ok(message) => {
                    identify(&message);
                    match syxpatch::identify(data) {
                        Some((device, variant)) => println!("Patch: {} {:?} ({})",
                            device.name(), variant, device.spec().manufacturer),
                        None => println!("Patch: not recognized"),
                    }
                    println!("MD5 digest: {}", message.digest());
                },
                Err(e) => {
                    println!("Not a valid message: {}", e);
                    failed = true;
                }
            }
            println!();
        }
    }

    if failed {
        std::process::exit(1);
    }
}

fn identify(message: &Message) {
    match message {
        Message::ManufacturerSpecific { manufacturer, payload } => {
            println!("Manufacturer: {} ({}), payload = {} bytes",
                manufacturer, manufacturer.to_hex(), payload.len());
        },
        Message::Universal { kind, sub_id1, sub_id2, payload } => {
            println!("Universal, kind: {}, {:02X} {:02X}, payload = {} bytes",
                match kind {
                    UniversalKind::NonRealTime => "Non-Real-time",
                    UniversalKind::RealTime => "Real-time",
                },
                sub_id1, sub_id2, payload.len());
        },
    }
}
