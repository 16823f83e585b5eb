//! Main entry point for the runpac CLI application.
//!
//! This binary unpacks a Spreadtrum PAC firmware archive into a directory,
//! one file per partition.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::Path;
use tracing_subscriber::EnvFilter;

use runpac::pac::{PacHeader, PartitionEntry, Progress};
use runpac::{Cli, CrcStage, UnpackOptions, unpack};

/// Padding printed after a file name to wipe the percentage written before it.
const FIVE_SPACES: &str = "     ";

/// Application entry point.
///
/// Parses command-line arguments, sets up logging and unpacks the archive.
/// Any error ends the process with a nonzero status.
fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over the -d flag.
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let out_dir = cli.output_dir()?;
    let options = UnpackOptions {
        verify_crc: cli.check_crc,
    };
    let mut console = ConsoleProgress { debug: cli.debug };

    let summary = unpack(&cli.file, &out_dir, &options, &mut console)
        .with_context(|| format!("failed to unpack {}", cli.file.display()))?;

    if cli.debug {
        println!(
            "\n{} files extracted, {} entries without data",
            summary.extracted.len(),
            summary.skipped
        );
    }
    println!("\nDone...");

    Ok(())
}

/// Prints human readable progress to stdout.
///
/// In debug mode the header and every partition entry are dumped as they
/// are decoded.
struct ConsoleProgress {
    debug: bool,
}

impl Progress for ConsoleProgress {
    fn header_decoded(&mut self, header: &PacHeader) {
        if self.debug {
            println!("{header}\n");
        }
    }

    fn checksum_started(&mut self, stage: CrcStage) {
        println!("Checking CRC {}", capitalize(&stage.to_string()));
    }

    fn checksum_progress(&mut self, stage: CrcStage, percent: u8) {
        if stage == CrcStage::Body {
            print!("\r{percent}%");
            if percent == 100 {
                println!("\r{FIVE_SPACES}");
            }
            flush();
        }
    }

    fn partition_decoded(&mut self, _index: usize, entry: &PartitionEntry) {
        if self.debug {
            println!("{entry}");
        }
    }

    fn extraction_started(&mut self, out_dir: &Path) {
        println!("\nExtracting to {}\n", out_dir.display());
    }

    fn partition_started(&mut self, entry: &PartitionEntry) {
        print!("{FIVE_SPACES}{}", entry.file_name);
        flush();
    }

    fn partition_progress(&mut self, _entry: &PartitionEntry, percent: u8) {
        print!("\r{percent}%");
        flush();
    }

    fn partition_finished(&mut self, entry: &PartitionEntry, _path: &Path) {
        println!("\r{}{FIVE_SPACES}", entry.file_name);
    }
}

/// "part 1" -> "Part 1"
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Progress lines have no trailing newline, so push them out explicitly.
fn flush() {
    let _ = std::io::stdout().flush();
}
