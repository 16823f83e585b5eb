//! One-shot unpacking of a whole archive.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use super::extractor::{PacExtractor, Progress};
use super::header::HEADER_SIZE;
use crate::error::{PacError, Result};
use crate::io::{ByteSource, LocalFileReader};

/// Options for [`unpack`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UnpackOptions {
    /// Verify the archive CRC16 values before extracting anything.
    pub verify_crc: bool,
}

/// What an unpack run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnpackSummary {
    /// Written files, in table order.
    pub extracted: Vec<PathBuf>,
    /// Entries without payload.
    pub skipped: usize,
}

/// Unpack the archive at `archive` into `out_dir`.
///
/// Runs strictly in order: size check, output directory check and
/// creation, header decode, optional CRC verification, partition table
/// decode, then extraction of every entry in table order. The first error
/// stops the run; files already written stay on disk.
pub fn unpack(
    archive: &Path,
    out_dir: &Path,
    options: &UnpackOptions,
    progress: &mut dyn Progress,
) -> Result<UnpackSummary> {
    let source = LocalFileReader::new(archive)?;
    unpack_source(source, out_dir, options, progress)
}

/// Same as [`unpack`], reading from any [`ByteSource`].
pub fn unpack_source<R: ByteSource>(
    source: R,
    out_dir: &Path,
    options: &UnpackOptions,
    progress: &mut dyn Progress,
) -> Result<UnpackSummary> {
    let size = source.size();
    if size < HEADER_SIZE as u64 {
        return Err(PacError::NotAPacFile { size });
    }
    prepare_output_dir(out_dir)?;

    let mut extractor = PacExtractor::new(source)?;
    progress.header_decoded(extractor.header());

    if options.verify_crc {
        extractor.verify_checksums(progress)?;
    }

    let entries = extractor.partitions()?;
    for (i, entry) in entries.iter().enumerate() {
        progress.partition_decoded(i, entry);
    }

    info!("extracting {} entries to {}", entries.len(), out_dir.display());
    progress.extraction_started(out_dir);

    let mut summary = UnpackSummary::default();
    for entry in &entries {
        match extractor.extract_partition(entry, out_dir, progress)? {
            Some(path) => summary.extracted.push(path),
            None => summary.skipped += 1,
        }
    }

    Ok(summary)
}

/// Create `out_dir` unless it exists, refusing paths that are not directories.
fn prepare_output_dir(out_dir: &Path) -> Result<()> {
    match fs::metadata(out_dir) {
        Ok(meta) if !meta.is_dir() => {
            return Err(PacError::InvalidOutputPath(out_dir.to_path_buf()));
        }
        Ok(_) => return Ok(()),
        Err(_) => {}
    }

    fs::create_dir_all(out_dir).map_err(|source| PacError::OutputFile {
        path: out_dir.to_path_buf(),
        source,
    })
}
