mod local;

pub use local::LocalFileReader;

use std::io::{Cursor, Read, Seek};

/// Seekable byte source an archive is read from.
///
/// The archive is read through a single cursor, so implementors only need
/// ordinary `Read + Seek` plus the total length of the underlying data.
pub trait ByteSource: Read + Seek {
    /// Get the total size of the data source
    fn size(&self) -> u64;
}

impl<T: AsRef<[u8]>> ByteSource for Cursor<T> {
    fn size(&self) -> u64 {
        self.get_ref().as_ref().len() as u64
    }
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn size(&self) -> u64 {
        (**self).size()
    }
}
