use clap::Parser;
use std::path::PathBuf;

/// Output directory used when none is given, relative to the working directory.
pub const DEFAULT_OUTPUT_DIR: &str = "outdir";

#[derive(Parser, Debug)]
#[command(name = "runpac")]
#[command(version)]
#[command(about = "A Rust extractor for Spreadtrum PAC firmware archives", long_about = None)]
#[command(after_help = "Examples:\n  \
  runpac firmware.pac                 extract into ./outdir\n  \
  runpac -c firmware.pac images       verify CRC16, then extract into ./images\n  \
  runpac -d firmware.pac              also dump the header and partition table")]
pub struct Cli {
    /// Spreadtrum .pac file
    #[arg(value_name = "PACFILE")]
    pub file: PathBuf,

    /// Output directory to extract files into (default: ./outdir)
    #[arg(value_name = "OUTDIR")]
    pub out_dir: Option<PathBuf>,

    /// Enable debug output
    #[arg(short = 'd')]
    pub debug: bool,

    /// Compute and verify CRC16
    #[arg(short = 'c')]
    pub check_crc: bool,
}

impl Cli {
    /// Output directory, falling back to `outdir` under the working directory.
    pub fn output_dir(&self) -> std::io::Result<PathBuf> {
        match &self.out_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(std::env::current_dir()?.join(DEFAULT_OUTPUT_DIR)),
        }
    }

    /// Default log filter when `RUST_LOG` is not set.
    pub fn log_level(&self) -> &'static str {
        if self.debug { "debug" } else { "warn" }
    }
}
