//! cpy - copy a file through the block-partitioned ring buffer
//!
//! Usage: `cpy <source> <destination>`
//!
//! Set `RUST_LOG=blkcpy=trace` to watch the per-block locking protocol.

use blkcpy::{copy, CopyConfig};
use std::fs::File;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        eprintln!("usage: cpy <source> <destination>");
        return ExitCode::from(2);
    }

    let source = match File::open(&args[1]) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("cpy: could not open source file {}: {}", args[1], e);
            return ExitCode::FAILURE;
        }
    };

    let dest = match File::create(&args[2]) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("cpy: could not create destination file {}: {}", args[2], e);
            return ExitCode::FAILURE;
        }
    };

    match copy(source, dest, CopyConfig::default()) {
        Ok(report) => {
            debug!(
                bytes_read = report.bytes_read,
                bytes_written = report.bytes_written,
                "copy complete"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("cpy: {}", e);
            ExitCode::FAILURE
        }
    }
}
