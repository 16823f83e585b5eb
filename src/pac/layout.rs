//! Fixed-layout record decoding.
//!
//! Every on-disk PAC structure is a packed little-endian record of known
//! width. A [`Layout`] describes such a record as an ordered list of typed
//! fields, and a single routine decodes (or encodes) any layout.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read};

use crate::error::{PacError, Result};

/// Kind and on-disk width of a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    U8,
    U16,
    U32,
    /// UTF-16LE text occupying this many bytes, NUL padded.
    Utf16(usize),
    /// Opaque bytes, kept as-is.
    Bytes(usize),
}

impl FieldKind {
    pub const fn width(&self) -> usize {
        match self {
            FieldKind::U8 => 1,
            FieldKind::U16 => 2,
            FieldKind::U32 => 4,
            FieldKind::Utf16(n) | FieldKind::Bytes(n) => *n,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl Field {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }
}

/// Decoded field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(u32),
    Text(String),
    Bytes(Vec<u8>),
}

/// An ordered record schema.
#[derive(Debug)]
pub struct Layout {
    /// Human readable record name, used in error messages.
    pub name: &'static str,
    pub fields: &'static [Field],
}

impl Layout {
    /// Total width in bytes of a record with this layout.
    pub const fn width(&self) -> usize {
        let mut total = 0;
        let mut i = 0;
        while i < self.fields.len() {
            total += self.fields[i].kind.width();
            i += 1;
        }
        total
    }

    /// Decode a record from the start of `buf`.
    ///
    /// Bytes past [`width`](Self::width) are ignored.
    pub fn decode(&'static self, buf: &[u8]) -> Result<Record> {
        let width = self.width();
        if buf.len() < width {
            return Err(PacError::malformed(
                self.name,
                format!("need {width} bytes, got {}", buf.len()),
            ));
        }

        let mut cursor = Cursor::new(&buf[..width]);
        let mut values = Vec::with_capacity(self.fields.len());
        for field in self.fields {
            let value = match field.kind {
                FieldKind::U8 => Value::Int(cursor.read_u8()?.into()),
                FieldKind::U16 => Value::Int(cursor.read_u16::<LittleEndian>()?.into()),
                FieldKind::U32 => Value::Int(cursor.read_u32::<LittleEndian>()?),
                FieldKind::Utf16(n) => {
                    let mut units = vec![0u16; n / 2];
                    cursor.read_u16_into::<LittleEndian>(&mut units)?;
                    Value::Text(decode_utf16(&units))
                }
                FieldKind::Bytes(n) => {
                    let mut raw = vec![0u8; n];
                    cursor.read_exact(&mut raw)?;
                    Value::Bytes(raw)
                }
            };
            values.push(value);
        }

        Ok(Record {
            layout: self,
            values,
        })
    }

    /// Encode `record` back into exactly [`width`](Self::width) bytes.
    pub fn encode(&'static self, record: &Record) -> Result<Vec<u8>> {
        if record.values.len() != self.fields.len() {
            return Err(PacError::malformed(
                self.name,
                format!(
                    "expected {} fields, got {}",
                    self.fields.len(),
                    record.values.len()
                ),
            ));
        }

        let mut out = Vec::with_capacity(self.width());
        for (field, value) in self.fields.iter().zip(&record.values) {
            match (field.kind, value) {
                (FieldKind::U8, Value::Int(v)) => {
                    let v = u8::try_from(*v).map_err(|_| self.too_wide(field))?;
                    out.write_u8(v)?;
                }
                (FieldKind::U16, Value::Int(v)) => {
                    let v = u16::try_from(*v).map_err(|_| self.too_wide(field))?;
                    out.write_u16::<LittleEndian>(v)?;
                }
                (FieldKind::U32, Value::Int(v)) => out.write_u32::<LittleEndian>(*v)?,
                (FieldKind::Utf16(n), Value::Text(s)) => {
                    let start = out.len();
                    for unit in s.encode_utf16() {
                        out.write_u16::<LittleEndian>(unit)?;
                    }
                    if out.len() - start > n {
                        return Err(self.too_wide(field));
                    }
                    out.resize(start + n, 0);
                }
                (FieldKind::Bytes(n), Value::Bytes(raw)) => {
                    if raw.len() > n {
                        return Err(self.too_wide(field));
                    }
                    out.extend_from_slice(raw);
                    out.resize(out.len() + n - raw.len(), 0);
                }
                _ => {
                    return Err(PacError::malformed(
                        self.name,
                        format!("field {} has a value of the wrong kind", field.name),
                    ));
                }
            }
        }

        Ok(out)
    }

    fn too_wide(&self, field: &Field) -> PacError {
        PacError::malformed(
            self.name,
            format!(
                "value for {} does not fit in {} bytes",
                field.name,
                field.kind.width()
            ),
        )
    }
}

/// UTF-16 text with trailing NUL padding removed.
fn decode_utf16(units: &[u16]) -> String {
    let end = units.iter().rposition(|&u| u != 0).map_or(0, |i| i + 1);
    String::from_utf16_lossy(&units[..end])
}

/// Field values decoded with a [`Layout`], in layout order.
#[derive(Debug, Clone)]
pub struct Record {
    layout: &'static Layout,
    values: Vec<Value>,
}

impl Record {
    /// Build a record from values given in layout order.
    pub fn new(layout: &'static Layout, values: Vec<Value>) -> Self {
        Self { layout, values }
    }

    pub fn layout(&self) -> &'static Layout {
        self.layout
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.layout
            .fields
            .iter()
            .position(|f| f.name == name)
            .and_then(|i| self.values.get(i))
    }

    pub fn int(&self, name: &str) -> Result<u32> {
        match self.get(name) {
            Some(Value::Int(v)) => Ok(*v),
            _ => Err(self.missing(name, "integer")),
        }
    }

    pub fn text(&self, name: &str) -> Result<String> {
        match self.get(name) {
            Some(Value::Text(s)) => Ok(s.clone()),
            _ => Err(self.missing(name, "text")),
        }
    }

    pub fn bytes(&self, name: &str) -> Result<Vec<u8>> {
        match self.get(name) {
            Some(Value::Bytes(b)) => Ok(b.clone()),
            _ => Err(self.missing(name, "byte block")),
        }
    }

    fn missing(&self, name: &str, kind: &str) -> PacError {
        PacError::malformed(self.layout.name, format!("no {kind} field named {name}"))
    }
}
