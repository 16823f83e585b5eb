//! Partition table entries.

use std::fmt;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Component, Path};

use tracing::debug;

use super::header::PacHeader;
use super::layout::{Field, FieldKind, Layout, Record, Value};
use crate::error::{PacError, Result};
use crate::io::ByteSource;

pub static PARTITION_LAYOUT: Layout = Layout {
    name: "partition entry",
    fields: &[
        Field::new("length", FieldKind::U32),
        Field::new("partition_name", FieldKind::Utf16(512)),
        Field::new("file_name", FieldKind::Utf16(512)),
        Field::new("file_version", FieldKind::Utf16(512)),
        Field::new("size", FieldKind::U32),
        Field::new("file_flag", FieldKind::U32),
        Field::new("check_flag", FieldKind::U32),
        Field::new("offset", FieldKind::U32),
        Field::new("can_omit_flag", FieldKind::U32),
        Field::new("address_count", FieldKind::U32),
        Field::new("address0", FieldKind::U32),
        Field::new("address1", FieldKind::U32),
        Field::new("address2", FieldKind::U32),
        Field::new("address3", FieldKind::U32),
        Field::new("address4", FieldKind::U32),
        Field::new("reserved", FieldKind::Bytes(996)),
    ],
};

/// Width of one on-disk partition entry in bytes (2580).
pub const PARTITION_ENTRY_SIZE: usize = PARTITION_LAYOUT.width();

const ADDRESS_FIELDS: [&str; 5] = ["address0", "address1", "address2", "address3", "address4"];

/// One entry of the partition table.
///
/// Entries with a zero `size` describe flashing operations rather than data
/// and have nothing to extract.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionEntry {
    /// Size of this entry itself, always [`PARTITION_ENTRY_SIZE`].
    pub length: u32,
    /// File ID such as `FDL`, `FDL2` or `NV`.
    pub partition_name: String,
    /// Name of the payload file, without directories.
    pub file_name: String,
    pub file_version: String,
    /// Payload size in bytes.
    pub size: u32,
    /// 1 when the entry needs a file, 0 for pure operations.
    pub file_flag: u32,
    /// 1 when the file must be downloaded.
    pub check_flag: u32,
    /// Payload offset from the start of the archive.
    pub offset: u32,
    pub can_omit_flag: u32,
    pub address_count: u32,
    pub addresses: [u32; 5],
    pub reserved: Vec<u8>,
}

impl PartitionEntry {
    /// Decode an entry from raw bytes without validating it.
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        let r = PARTITION_LAYOUT.decode(buf)?;
        let mut addresses = [0u32; 5];
        for (slot, name) in addresses.iter_mut().zip(ADDRESS_FIELDS) {
            *slot = r.int(name)?;
        }

        Ok(Self {
            length: r.int("length")?,
            partition_name: r.text("partition_name")?,
            file_name: r.text("file_name")?,
            file_version: r.text("file_version")?,
            size: r.int("size")?,
            file_flag: r.int("file_flag")?,
            check_flag: r.int("check_flag")?,
            offset: r.int("offset")?,
            can_omit_flag: r.int("can_omit_flag")?,
            address_count: r.int("address_count")?,
            addresses,
            reserved: r.bytes("reserved")?,
        })
    }

    /// Encode the entry into its [`PARTITION_ENTRY_SIZE`] byte on-disk form.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut values = vec![
            Value::Int(self.length),
            Value::Text(self.partition_name.clone()),
            Value::Text(self.file_name.clone()),
            Value::Text(self.file_version.clone()),
            Value::Int(self.size),
            Value::Int(self.file_flag),
            Value::Int(self.check_flag),
            Value::Int(self.offset),
            Value::Int(self.can_omit_flag),
            Value::Int(self.address_count),
        ];
        values.extend(self.addresses.iter().copied().map(Value::Int));
        values.push(Value::Bytes(self.reserved.clone()));

        PARTITION_LAYOUT.encode(&Record::new(&PARTITION_LAYOUT, values))
    }

    /// Whether there is payload to extract.
    pub fn has_data(&self) -> bool {
        self.size > 0
    }

    /// Exclusive end of the payload within the archive.
    pub fn end(&self) -> u64 {
        u64::from(self.offset) + u64::from(self.size)
    }

    /// Check the entry against the archive it was read from.
    fn validate(&self, archive_size: u64) -> Result<()> {
        if self.length as usize != PARTITION_ENTRY_SIZE {
            return Err(PacError::malformed(
                PARTITION_LAYOUT.name,
                format!(
                    "unknown entry format: length {} (expected {PARTITION_ENTRY_SIZE})",
                    self.length
                ),
            ));
        }

        if !self.has_data() {
            return Ok(());
        }

        if self.end() > archive_size {
            return Err(PacError::malformed(
                PARTITION_LAYOUT.name,
                format!(
                    "payload {:#x}..{:#x} lies outside the {archive_size} byte archive",
                    self.offset,
                    self.end()
                ),
            ));
        }

        if !is_plain_file_name(&self.file_name) {
            return Err(PacError::malformed(
                PARTITION_LAYOUT.name,
                format!("{:?} is not a plain file name", self.file_name),
            ));
        }

        Ok(())
    }
}

/// A single normal path component, so output stays inside the target directory.
fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}

/// Read the whole partition table described by `header`.
///
/// Entries come back in table order. Any bad entry fails the whole table,
/// with the error naming its index.
pub fn read_partitions<R: ByteSource + ?Sized>(
    source: &mut R,
    header: &PacHeader,
) -> Result<Vec<PartitionEntry>> {
    let archive_size = source.size();
    source.seek(SeekFrom::Start(header.partitions_offset.into()))?;

    // Never trust the count for the allocation.
    let fits = archive_size / PARTITION_ENTRY_SIZE as u64;
    let mut entries = Vec::with_capacity((header.partition_count as u64).min(fits) as usize);

    for i in 0..header.partition_count as usize {
        let mut buf = Vec::with_capacity(PARTITION_ENTRY_SIZE);
        Read::take(&mut *source, PARTITION_ENTRY_SIZE as u64).read_to_end(&mut buf)?;

        let entry = PartitionEntry::from_bytes(&buf).map_err(|e| e.at_index(i))?;
        entry.validate(archive_size).map_err(|e| e.at_index(i))?;

        debug!(
            "partition #{i}: {} -> {:?}, {} bytes at {:#x}",
            entry.partition_name, entry.file_name, entry.size, entry.offset
        );
        entries.push(entry);
    }

    Ok(entries)
}

impl fmt::Display for PartitionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<13} = {}", "Size", self.length)?;
        writeln!(f, "{:<13} = {}", "FileID", self.partition_name)?;
        writeln!(f, "{:<13} = {}", "FileName", self.file_name)?;
        writeln!(f, "{:<13} = {}", "FileSize", self.size)?;
        writeln!(f, "{:<13} = {}", "FileFlag", self.file_flag)?;
        writeln!(f, "{:<13} = {}", "CheckFlag", self.check_flag)?;
        writeln!(f, "{:<13} = {}", "DataOffset", self.offset)?;
        writeln!(f, "{:<13} = {}", "CanOmitFlag", self.can_omit_flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pac::header::{HEADER_SIZE, PAC_VERSION};
    use std::io::Cursor;

    fn entry(file_name: &str, size: u32, offset: u32) -> PartitionEntry {
        PartitionEntry {
            length: PARTITION_ENTRY_SIZE as u32,
            partition_name: "BOOT".to_string(),
            file_name: file_name.to_string(),
            size,
            file_flag: 1,
            check_flag: 1,
            offset,
            addresses: [0x8000_0000, 0, 0, 0, 0],
            address_count: 1,
            ..Default::default()
        }
    }

    fn archive_with(entries: &[PartitionEntry], tail: usize) -> Vec<u8> {
        let table_len = entries.len() * PARTITION_ENTRY_SIZE;
        let header = PacHeader {
            version: PAC_VERSION.to_string(),
            size: (HEADER_SIZE + table_len + tail) as u32,
            partition_count: entries.len() as u32,
            partitions_offset: HEADER_SIZE as u32,
            ..Default::default()
        };

        let mut archive = header.to_bytes().unwrap();
        for e in entries {
            archive.extend(e.to_bytes().unwrap());
        }
        archive.resize(archive.len() + tail, 0xAA);
        archive
    }

    #[test]
    fn entry_size_is_fixed() {
        assert_eq!(PARTITION_ENTRY_SIZE, 2580);
    }

    #[test]
    fn round_trips_through_bytes() {
        let e = entry("boot.img", 4, 100);
        let bytes = e.to_bytes().unwrap();
        assert_eq!(bytes.len(), PARTITION_ENTRY_SIZE);

        let mut expected = e.clone();
        expected.reserved = vec![0; 996];
        assert_eq!(PartitionEntry::from_bytes(&bytes).unwrap(), expected);
    }

    #[test]
    fn offsets_of_size_and_data_offset() {
        let bytes = entry("boot.img", 0x11, 0x22).to_bytes().unwrap();
        assert_eq!(&bytes[1540..1544], &0x11u32.to_le_bytes());
        assert_eq!(&bytes[1552..1556], &0x22u32.to_le_bytes());
    }

    #[test]
    fn reads_table_in_order() {
        let payload_at = (HEADER_SIZE + 2 * PARTITION_ENTRY_SIZE) as u32;
        let entries = [
            entry("fdl1.bin", 8, payload_at),
            PartitionEntry {
                partition_name: "FLASH".to_string(),
                ..entry("", 0, 0)
            },
        ];
        let archive = archive_with(&entries, 8);
        let mut source = Cursor::new(archive);
        let header = PacHeader::parse(&mut source).unwrap();

        let table = read_partitions(&mut source, &header).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table[0].file_name, "fdl1.bin");
        assert_eq!(table[1].partition_name, "FLASH");
        assert!(!table[1].has_data());
    }

    #[test]
    fn bad_length_names_index() {
        let payload_at = (HEADER_SIZE + 2 * PARTITION_ENTRY_SIZE) as u32;
        let mut bad = entry("system.img", 4, payload_at);
        bad.length = 2564;
        let archive = archive_with(&[entry("boot.img", 4, payload_at), bad], 4);
        let mut source = Cursor::new(archive);
        let header = PacHeader::parse(&mut source).unwrap();

        let err = read_partitions(&mut source, &header).unwrap_err();
        assert!(matches!(
            err,
            PacError::MalformedRecord { index: Some(1), .. }
        ));
    }

    #[test]
    fn truncated_table_is_malformed() {
        let payload_at = HEADER_SIZE as u32;
        let archive = archive_with(&[entry("boot.img", 4, payload_at)], 0);
        let mut source = Cursor::new(archive);
        let mut header = PacHeader::parse(&mut source).unwrap();
        header.partition_count = 2;

        let err = read_partitions(&mut source, &header).unwrap_err();
        assert!(matches!(
            err,
            PacError::MalformedRecord { index: Some(1), .. }
        ));
    }

    #[test]
    fn payload_past_end_is_rejected() {
        let archive = archive_with(&[entry("boot.img", 16, HEADER_SIZE as u32)], 0);
        let len = archive.len() as u32;
        let mut archive = archive;
        let past_end = entry("boot.img", 16, len - 8);
        archive[HEADER_SIZE..].copy_from_slice(&past_end.to_bytes().unwrap());
        let mut source = Cursor::new(archive);
        let header = PacHeader::parse(&mut source).unwrap();

        let err = read_partitions(&mut source, &header).unwrap_err();
        assert!(matches!(
            err,
            PacError::MalformedRecord { index: Some(0), ref reason, .. } if reason.contains("outside")
        ));
    }

    #[test]
    fn path_like_names_are_rejected() {
        for name in ["../evil.img", "dir/boot.img", "..", "", "/abs.img", "a\\b.img"] {
            let e = entry(name, 1, 0);
            assert!(e.validate(10).is_err(), "{name:?} should be rejected");
        }
        assert!(entry("boot.img", 1, 0).validate(10).is_ok());
        // Nothing to write, so the name does not matter.
        assert!(entry("", 0, 0).validate(10).is_ok());
    }

    #[test]
    fn display_lists_fields() {
        let text = entry("boot.img", 4, 100).to_string();
        assert!(text.contains("FileName      = boot.img"));
        assert!(text.contains("DataOffset    = 100"));
    }
}
