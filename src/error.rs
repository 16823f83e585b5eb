//! Error types for PAC parsing and extraction.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for PAC operations
pub type Result<T> = std::result::Result<T, PacError>;

/// Which of the two archive checksums failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrcStage {
    /// CRC over the header, excluding the two checksum fields.
    Header,
    /// CRC over everything after the header.
    Body,
}

impl fmt::Display for CrcStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrcStage::Header => f.write_str("part 1"),
            CrcStage::Body => f.write_str("part 2"),
        }
    }
}

/// PAC error types
///
/// Every variant is fatal: the caller is expected to stop the run.
#[derive(Error, Debug)]
pub enum PacError {
    /// The archive is too small to hold a header.
    #[error("not a PAC firmware: {size} bytes is smaller than a PAC header")]
    NotAPacFile { size: u64 },

    /// The output path exists and is not a directory.
    #[error("output path {} exists and is not a directory", .0.display())]
    InvalidOutputPath(PathBuf),

    #[error("unsupported PAC version: {0:?}")]
    UnsupportedVersion(String),

    /// Declared archive size does not match the real one.
    #[error("bin packet's size is not correct: header says {declared} bytes, file has {actual}")]
    SizeMismatch { declared: u32, actual: u64 },

    #[error("CRC check failed for {stage}: expected {expected:#06x}, computed {computed:#06x}")]
    ChecksumMismatch {
        stage: CrcStage,
        expected: u16,
        computed: u16,
    },

    /// A fixed-layout record could not be decoded or failed validation.
    #[error(
        "malformed {record}{}: {reason}",
        .index.map(|i| format!(" #{i}")).unwrap_or_default()
    )]
    MalformedRecord {
        record: &'static str,
        index: Option<usize>,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// An output file could not be created or written.
    #[error("cannot write {}: {source}", .path.display())]
    OutputFile { path: PathBuf, source: io::Error },
}

impl PacError {
    pub(crate) fn malformed(record: &'static str, reason: impl Into<String>) -> Self {
        PacError::MalformedRecord {
            record,
            index: None,
            reason: reason.into(),
        }
    }

    /// Attach a table index to a `MalformedRecord`; other variants pass through.
    pub(crate) fn at_index(self, i: usize) -> Self {
        match self {
            PacError::MalformedRecord { record, reason, .. } => PacError::MalformedRecord {
                record,
                index: Some(i),
                reason,
            },
            other => other,
        }
    }
}
