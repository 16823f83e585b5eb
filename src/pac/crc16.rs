//! CRC16 used by PAC archives.
//!
//! This is the reflected CRC-16 (polynomial 0xA001, a.k.a. CRC-16/ARC)
//! started from zero and without a final xor.

use std::io::Read;

/// Chunk size used when checksumming a stream.
pub const CRC_CHUNK_SIZE: usize = 64 * 1024;

/// CRC16 lookup table (reflected polynomial 0xA001)
const CRC16_TABLE: [u16; 256] = {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u16;
        let mut j = 0;
        while j < 8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ 0xA001;
            } else {
                crc >>= 1;
            }
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
};

/// Continue a CRC16 computation from `state` over `data`.
pub fn update(mut state: u16, data: &[u8]) -> u16 {
    for &byte in data {
        let index = ((state ^ byte as u16) & 0xFF) as usize;
        state = (state >> 8) ^ CRC16_TABLE[index];
    }
    state
}

/// CRC16 of `data` in one pass.
pub fn crc16(data: &[u8]) -> u16 {
    update(0, data)
}

/// Resumable CRC16 accumulator.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Crc16 {
    state: u16,
}

impl Crc16 {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, data: &[u8]) {
        self.state = update(self.state, data);
    }

    pub fn value(&self) -> u16 {
        self.state
    }
}

/// Checksum exactly `len` bytes read from `reader`, [`CRC_CHUNK_SIZE`] at a time.
///
/// `on_progress` receives the integer percentage done after every chunk,
/// or a single 100 for an empty span.
/// Running out of input before `len` bytes is an `UnexpectedEof` error.
pub fn checksum_reader<R: Read + ?Sized>(
    reader: &mut R,
    len: u64,
    mut on_progress: impl FnMut(u8),
) -> std::io::Result<u16> {
    let mut crc = Crc16::new();
    let mut buf = vec![0u8; CRC_CHUNK_SIZE.min(len as usize)];
    let mut remaining = len;
    if len == 0 {
        on_progress(100);
    }

    while remaining > 0 {
        let n = remaining.min(buf.len() as u64) as usize;
        reader.read_exact(&mut buf[..n])?;
        crc.update(&buf[..n]);
        remaining -= n as u64;
        on_progress(percent_done(remaining, len));
    }

    Ok(crc.value())
}

/// `100 - 100 * remaining / total`, truncated.
pub(crate) fn percent_done(remaining: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    (100 - (100 * u128::from(remaining) / u128::from(total))) as u8
}
