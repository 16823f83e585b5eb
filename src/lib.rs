//! # runpac
//!
//! A Rust extractor for Spreadtrum/Unisoc PAC firmware archives.
//!
//! PAC files bundle every image a flashing tool writes to a device: boot
//! loaders, kernels, file system images and so on. This library decodes the
//! archive header and partition table, optionally verifies the two CRC16
//! checksums, and copies each partition payload out to its own file.
//!
//! ## Features
//!
//! - Typed, schema-driven decoding of the fixed-width header and entries
//! - CRC16 verification of the header and of the archive body
//! - Streaming extraction in small chunks, with progress callbacks
//! - Explicit bounds checks on every 32-bit offset and size
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use runpac::{NoProgress, UnpackOptions, unpack};
//!
//! fn main() -> anyhow::Result<()> {
//!     let options = UnpackOptions { verify_crc: true };
//!     let summary = unpack(
//!         Path::new("firmware.pac"),
//!         Path::new("outdir"),
//!         &options,
//!         &mut NoProgress,
//!     )?;
//!
//!     for path in &summary.extracted {
//!         println!("{}", path.display());
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod error;
pub mod io;
pub mod pac;

pub use cli::Cli;
pub use error::{CrcStage, PacError, Result};
pub use io::{ByteSource, LocalFileReader};
pub use pac::{
    NoProgress, PacExtractor, PacHeader, PartitionEntry, Progress, UnpackOptions, UnpackSummary,
    unpack, unpack_source,
};
