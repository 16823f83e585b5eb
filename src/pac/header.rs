//! PAC archive header.

use std::fmt;
use std::io::{Read, Seek, SeekFrom};

use tracing::debug;

use super::crc16;
use super::layout::{Field, FieldKind, Layout, Record, Value};
use crate::error::{CrcStage, PacError, Result};
use crate::io::ByteSource;

/// The only archive version understood by this crate.
pub const PAC_VERSION: &str = "BP_R1.0.0";

/// Magic value marking archives that also carry a header checksum.
pub const PAC_MAGIC: u32 = 0xFFFA_FFFA;

pub static HEADER_LAYOUT: Layout = Layout {
    name: "PAC header",
    fields: &[
        Field::new("version", FieldKind::Utf16(48)),
        Field::new("size", FieldKind::U32),
        Field::new("product_name", FieldKind::Utf16(512)),
        Field::new("firmware_name", FieldKind::Utf16(512)),
        Field::new("partition_count", FieldKind::U32),
        Field::new("partitions_offset", FieldKind::U32),
        Field::new("mode", FieldKind::U32),
        Field::new("flash_type", FieldKind::U32),
        Field::new("nand_strategy", FieldKind::U32),
        Field::new("is_nv_backup", FieldKind::U32),
        Field::new("nand_page_type", FieldKind::U32),
        Field::new("product_alias", FieldKind::Utf16(200)),
        Field::new("oma_dm_product_flag", FieldKind::U32),
        Field::new("is_oma_dm", FieldKind::U32),
        Field::new("is_preload", FieldKind::U32),
        Field::new("reserved", FieldKind::Bytes(800)),
        Field::new("magic", FieldKind::U32),
        Field::new("crc1", FieldKind::U16),
        Field::new("crc2", FieldKind::U16),
    ],
};

/// Width of the on-disk header in bytes (2124).
pub const HEADER_SIZE: usize = HEADER_LAYOUT.width();

/// Decoded PAC header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PacHeader {
    /// Packet struct version, `BP_R1.0.0` for supported archives.
    pub version: String,
    /// Size of the whole archive in bytes.
    pub size: u32,
    pub product_name: String,
    pub firmware_name: String,
    /// Number of partition entries in the table.
    pub partition_count: u32,
    /// Offset of the partition table from the start of the archive.
    pub partitions_offset: u32,
    pub mode: u32,
    pub flash_type: u32,
    pub nand_strategy: u32,
    pub is_nv_backup: u32,
    pub nand_page_type: u32,
    pub product_alias: String,
    pub oma_dm_product_flag: u32,
    pub is_oma_dm: u32,
    pub is_preload: u32,
    /// Reserved block, kept so the header can be written back unchanged.
    pub reserved: Vec<u8>,
    pub magic: u32,
    /// CRC16 of the header bytes before the two checksum fields.
    pub crc1: u16,
    /// CRC16 of everything after the header.
    pub crc2: u16,
}

impl PacHeader {
    /// Read and validate the header at the start of `source`.
    ///
    /// Leaves the cursor right after the header.
    pub fn parse<R: ByteSource + ?Sized>(source: &mut R) -> Result<Self> {
        let actual = source.size();
        if actual < HEADER_SIZE as u64 {
            return Err(PacError::NotAPacFile { size: actual });
        }

        source.seek(SeekFrom::Start(0))?;
        let mut buf = vec![0u8; HEADER_SIZE];
        source.read_exact(&mut buf)?;

        let header = Self::from_bytes(&buf)?;
        if header.version != PAC_VERSION {
            return Err(PacError::UnsupportedVersion(header.version));
        }
        if u64::from(header.size) != actual {
            return Err(PacError::SizeMismatch {
                declared: header.size,
                actual,
            });
        }

        debug!(
            "PAC header: version {}, {} partitions at {:#x}, magic {:#x}",
            header.version, header.partition_count, header.partitions_offset, header.magic
        );
        Ok(header)
    }

    /// Decode a header from raw bytes without validating it.
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        let r = HEADER_LAYOUT.decode(buf)?;
        Ok(Self {
            version: r.text("version")?,
            size: r.int("size")?,
            product_name: r.text("product_name")?,
            firmware_name: r.text("firmware_name")?,
            partition_count: r.int("partition_count")?,
            partitions_offset: r.int("partitions_offset")?,
            mode: r.int("mode")?,
            flash_type: r.int("flash_type")?,
            nand_strategy: r.int("nand_strategy")?,
            is_nv_backup: r.int("is_nv_backup")?,
            nand_page_type: r.int("nand_page_type")?,
            product_alias: r.text("product_alias")?,
            oma_dm_product_flag: r.int("oma_dm_product_flag")?,
            is_oma_dm: r.int("is_oma_dm")?,
            is_preload: r.int("is_preload")?,
            reserved: r.bytes("reserved")?,
            magic: r.int("magic")?,
            crc1: r.int("crc1")? as u16,
            crc2: r.int("crc2")? as u16,
        })
    }

    /// Encode the header into its [`HEADER_SIZE`] byte on-disk form.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let record = Record::new(
            &HEADER_LAYOUT,
            vec![
                Value::Text(self.version.clone()),
                Value::Int(self.size),
                Value::Text(self.product_name.clone()),
                Value::Text(self.firmware_name.clone()),
                Value::Int(self.partition_count),
                Value::Int(self.partitions_offset),
                Value::Int(self.mode),
                Value::Int(self.flash_type),
                Value::Int(self.nand_strategy),
                Value::Int(self.is_nv_backup),
                Value::Int(self.nand_page_type),
                Value::Text(self.product_alias.clone()),
                Value::Int(self.oma_dm_product_flag),
                Value::Int(self.is_oma_dm),
                Value::Int(self.is_preload),
                Value::Bytes(self.reserved.clone()),
                Value::Int(self.magic),
                Value::Int(self.crc1.into()),
                Value::Int(self.crc2.into()),
            ],
        );
        HEADER_LAYOUT.encode(&record)
    }

    /// Whether the archive carries a header checksum (CRC part 1).
    pub fn has_header_crc(&self) -> bool {
        self.magic == PAC_MAGIC
    }

    /// Verify both archive checksums against the bytes in `source`.
    ///
    /// The header checksum is only checked when [`has_header_crc`](Self::has_header_crc)
    /// holds. `on_progress` is told which stage runs and how far it is.
    pub fn verify_checksums<R: ByteSource + ?Sized>(
        &self,
        source: &mut R,
        mut on_progress: impl FnMut(CrcStage, u8),
    ) -> Result<()> {
        if self.has_header_crc() {
            source.seek(SeekFrom::Start(0))?;
            let len = (HEADER_SIZE - 4) as u64;
            let computed =
                crc16::checksum_reader(source, len, |p| on_progress(CrcStage::Header, p))?;
            check(CrcStage::Header, self.crc1, computed)?;
        } else {
            debug!(
                "magic {:#x} is not {PAC_MAGIC:#x}, skipping header CRC",
                self.magic
            );
        }

        source.seek(SeekFrom::Start(HEADER_SIZE as u64))?;
        let len = u64::from(self.size).saturating_sub(HEADER_SIZE as u64);
        let computed = crc16::checksum_reader(source, len, |p| on_progress(CrcStage::Body, p))?;
        check(CrcStage::Body, self.crc2, computed)
    }
}

fn check(stage: CrcStage, expected: u16, computed: u16) -> Result<()> {
    if expected != computed {
        debug!("Computed CRC {stage} = {computed}, CRC in PAC = {expected}");
        return Err(PacError::ChecksumMismatch {
            stage,
            expected,
            computed,
        });
    }
    debug!("CRC {stage} ok ({computed:#06x})");
    Ok(())
}

impl fmt::Display for PacHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<13} = {}", "Version", self.version)?;
        writeln!(f, "{:<13} = {}", "Size", self.size)?;
        writeln!(f, "{:<13} = {}", "PrdName", self.product_name)?;
        writeln!(f, "{:<13} = {}", "FirmwareName", self.firmware_name)?;
        writeln!(f, "{:<13} = {}", "FileCount", self.partition_count)?;
        writeln!(f, "{:<13} = {}", "FileOffset", self.partitions_offset)?;
        writeln!(f, "{:<13} = {}", "Mode", self.mode)?;
        writeln!(f, "{:<13} = {}", "FlashType", self.flash_type)?;
        writeln!(f, "{:<13} = {}", "NandStrategy", self.nand_strategy)?;
        writeln!(f, "{:<13} = {}", "IsNvBackup", self.is_nv_backup)?;
        writeln!(f, "{:<13} = {}", "NandPageType", self.nand_page_type)?;
        writeln!(f, "{:<13} = {}", "PrdAlias", self.product_alias)?;
        writeln!(f, "{:<13} = {}", "OmaDmPrdFlag", self.oma_dm_product_flag)?;
        writeln!(f, "{:<13} = {}", "IsOmaDM", self.is_oma_dm)?;
        writeln!(f, "{:<13} = {}", "IsPreload", self.is_preload)?;
        writeln!(f, "{:<13} = {:#x}", "Magic", self.magic)?;
        writeln!(f, "{:<13} = {}", "CRC1", self.crc1)?;
        writeln!(f, "{:<13} = {}", "CRC2", self.crc2)?;
        Ok(())
    }
}
