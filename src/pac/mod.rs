//! PAC firmware archive parsing and extraction.
//!
//! ## PAC Format Overview
//!
//! A PAC file is a flat little-endian container:
//! 1. A fixed [`HEADER_SIZE`] byte header with the version tag, total size,
//!    product information, the partition table location and two CRC16 values
//! 2. A table of fixed [`PARTITION_ENTRY_SIZE`] byte partition entries
//! 3. The partition payloads, each located by its entry's offset and size
//!
//! ## Architecture
//!
//! - [`layout`]: typed schemas for fixed-width records and the generic decoder
//! - [`crc16`]: the table-driven CRC16 used for integrity checks
//! - [`header`] and [`partition`]: the two record types built on [`layout`]
//! - [`PacExtractor`]: header validation, CRC verification and payload copying
//! - [`unpack`](unpack()): the whole sequence in one call
//!
//! ## Limitations
//!
//! - Only the `BP_R1.0.0` version with 32-bit sizes and offsets

pub mod crc16;
mod extractor;
pub mod header;
pub mod layout;
pub mod partition;
mod unpack;

pub use extractor::{EXTRACT_CHUNK_SIZE, NoProgress, PacExtractor, Progress};
pub use header::{HEADER_SIZE, PAC_MAGIC, PAC_VERSION, PacHeader};
pub use partition::{PARTITION_ENTRY_SIZE, PartitionEntry, read_partitions};
pub use unpack::{UnpackOptions, UnpackSummary, unpack, unpack_source};
