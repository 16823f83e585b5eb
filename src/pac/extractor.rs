use std::fs::File;
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::crc16::percent_done;
use super::header::PacHeader;
use super::partition::{PartitionEntry, read_partitions};
use crate::error::{CrcStage, PacError, Result};
use crate::io::ByteSource;

/// Chunk size used when copying partition payloads.
pub const EXTRACT_CHUNK_SIZE: usize = 4096;

/// Receives progress notifications while an archive is unpacked.
///
/// Every hook defaults to doing nothing.
#[allow(unused_variables)]
pub trait Progress {
    fn header_decoded(&mut self, header: &PacHeader) {}

    fn checksum_started(&mut self, stage: CrcStage) {}

    fn checksum_progress(&mut self, stage: CrcStage, percent: u8) {}

    fn partition_decoded(&mut self, index: usize, entry: &PartitionEntry) {}

    fn extraction_started(&mut self, out_dir: &Path) {}

    fn partition_started(&mut self, entry: &PartitionEntry) {}

    /// `percent` is `100 - 100 * remaining / total`, truncated.
    fn partition_progress(&mut self, entry: &PartitionEntry, percent: u8) {}

    fn partition_finished(&mut self, entry: &PartitionEntry, path: &Path) {}
}

/// Progress sink that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {}

/// PAC archive extractor
///
/// Owns the archive source and its validated header.
pub struct PacExtractor<R: ByteSource> {
    source: R,
    header: PacHeader,
}

impl<R: ByteSource> PacExtractor<R> {
    /// Decode and validate the header of `source`.
    pub fn new(mut source: R) -> Result<Self> {
        let header = PacHeader::parse(&mut source)?;
        Ok(Self { source, header })
    }

    pub fn header(&self) -> &PacHeader {
        &self.header
    }

    /// Run both CRC stages, failing on the first mismatch.
    pub fn verify_checksums(&mut self, progress: &mut dyn Progress) -> Result<()> {
        let mut current = None;
        self.header.verify_checksums(&mut self.source, |stage, percent| {
            if current != Some(stage) {
                current = Some(stage);
                progress.checksum_started(stage);
            }
            progress.checksum_progress(stage, percent);
        })
    }

    /// Decode the whole partition table.
    pub fn partitions(&mut self) -> Result<Vec<PartitionEntry>> {
        read_partitions(&mut self.source, &self.header)
    }

    /// Copy one partition payload to `out_dir/<file name>`.
    ///
    /// Existing files are overwritten. Returns `None` for entries without
    /// payload, in which case nothing is created.
    pub fn extract_partition(
        &mut self,
        entry: &PartitionEntry,
        out_dir: &Path,
        progress: &mut dyn Progress,
    ) -> Result<Option<PathBuf>> {
        if !entry.has_data() {
            debug!("{} has no payload, skipping", entry.partition_name);
            return Ok(None);
        }

        self.source.seek(SeekFrom::Start(entry.offset.into()))?;

        let path = out_dir.join(&entry.file_name);
        let output_err = |source: io::Error| PacError::OutputFile {
            path: path.clone(),
            source,
        };

        progress.partition_started(entry);
        let file = File::create(&path).map_err(output_err)?;
        let mut writer = BufWriter::new(file);

        copy_chunked(
            &mut self.source,
            &mut writer,
            entry.size.into(),
            EXTRACT_CHUNK_SIZE,
            |percent| progress.partition_progress(entry, percent),
        )?;
        writer.flush().map_err(output_err)?;

        info!("extracted {} ({} bytes)", path.display(), entry.size);
        progress.partition_finished(entry, &path);
        Ok(Some(path))
    }

    /// Consume the extractor, returning the source.
    pub fn into_inner(self) -> R {
        self.source
    }
}

/// Copy exactly `len` bytes from `reader` to `writer`, `chunk_size` at a time.
///
/// The last chunk is truncated to what is left. An early end of `reader`
/// is an `UnexpectedEof` [`PacError::Io`].
pub(crate) fn copy_chunked<W: Write>(
    reader: &mut impl Read,
    writer: &mut W,
    len: u64,
    chunk_size: usize,
    mut on_progress: impl FnMut(u8),
) -> Result<()> {
    let mut buf = vec![0u8; chunk_size.max(1)];
    let mut remaining = len;

    while remaining > 0 {
        let n = remaining.min(buf.len() as u64) as usize;
        reader.read_exact(&mut buf[..n])?;
        writer.write_all(&buf[..n])?;
        remaining -= n as u64;
        on_progress(percent_done(remaining, len));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Cursor;

    #[test]
    fn copies_exact_span_and_reports_progress() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let mut reader = Cursor::new(&data);
        reader.set_position(100);

        let mut out = Vec::new();
        let mut seen = Vec::new();
        copy_chunked(&mut reader, &mut out, 9000, 4096, |p| seen.push(p)).unwrap();

        assert_eq!(out, &data[100..9100]);
        // 4096 + 4096 + 808
        assert_eq!(seen, vec![46, 92, 100]);
    }

    #[test]
    fn short_source_is_an_io_error() {
        let mut reader = Cursor::new(vec![1u8; 10]);
        let mut out = Vec::new();
        let err = copy_chunked(&mut reader, &mut out, 20, 4, |_| {}).unwrap_err();
        assert!(matches!(err, PacError::Io(ref e) if e.kind() == io::ErrorKind::UnexpectedEof));
    }

    #[test]
    fn zero_length_copies_nothing() {
        let mut reader = Cursor::new(vec![1u8; 10]);
        let mut out = Vec::new();
        let mut calls = 0;
        copy_chunked(&mut reader, &mut out, 0, 4096, |_| calls += 1).unwrap();
        assert!(out.is_empty());
        assert_eq!(calls, 0);
    }

    proptest! {
        #[test]
        fn any_chunk_size_copies_the_same_bytes(
            data in prop::collection::vec(any::<u8>(), 1..3000),
            start in any::<prop::sample::Index>(),
            chunk_size in 1usize..5000,
        ) {
            let start = start.index(data.len());
            let len = (data.len() - start) as u64;
            let mut reader = Cursor::new(&data);
            reader.set_position(start as u64);

            let mut out = Vec::new();
            let mut last = None;
            copy_chunked(&mut reader, &mut out, len, chunk_size, |p| last = Some(p)).unwrap();

            prop_assert_eq!(&out[..], &data[start..]);
            if len > 0 {
                prop_assert_eq!(last, Some(100));
            }
        }
    }
}
