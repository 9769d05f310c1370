//! Low-level helpers shared by the container readers and writers.

use std::io::{self, Read, Seek, SeekFrom};
use std::ops::{Deref, DerefMut};

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Result, TexError};

/// Seeks to `target` and returns to the original position when dropped,
/// whichever way the borrowing scope is left.
pub struct TemporarySeek<'a, S: Seek> {
    inner: &'a mut S,
    restore: u64,
}

impl<'a, S: Seek> TemporarySeek<'a, S> {
    pub fn new(inner: &'a mut S, target: u64) -> io::Result<Self> {
        let restore = inner.stream_position()?;
        inner.seek(SeekFrom::Start(target))?;
        Ok(Self { inner, restore })
    }
}

impl<S: Seek> Deref for TemporarySeek<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.inner
    }
}

impl<S: Seek> DerefMut for TemporarySeek<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.inner
    }
}

impl<S: Seek> Drop for TemporarySeek<'_, S> {
    fn drop(&mut self) {
        // Drop cannot report failure; the next read on the stream will.
        let _ = self.inner.seek(SeekFrom::Start(self.restore));
    }
}

/// Reads exactly `len` bytes, reporting a short stream as `TruncatedData`.
pub fn read_bytes<R: Read>(reader: &mut R, len: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.by_ref().take(len as u64).read_to_end(&mut buf)?;
    if buf.len() < len {
        return Err(TexError::TruncatedData {
            needed: len as u64,
            available: buf.len() as u64,
        });
    }
    Ok(buf)
}

/// Zero-pads `buf` up to the next multiple of `alignment`.
pub fn pad_to(buf: &mut Vec<u8>, alignment: usize) {
    let rem = buf.len() % alignment;
    if rem != 0 {
        buf.resize(buf.len() + alignment - rem, 0);
    }
}

/// Little-endian `u32` fields whose values are only known after later data
/// has been laid out.
#[derive(Debug, Default)]
pub struct OffsetPatches {
    entries: Vec<(usize, u32)>,
}

impl OffsetPatches {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, position: usize, value: u32) {
        self.entries.push((position, value));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn apply(&self, buf: &mut [u8]) -> Result<()> {
        for &(position, value) in &self.entries {
            let field = buf.get_mut(position..position + 4).ok_or_else(|| {
                TexError::InvalidInput(format!(
                    "offset patch at {position} lies outside the {}-byte output",
                    buf.len()
                ))
            })?;
            LittleEndian::write_u32(field, value);
        }
        Ok(())
    }
}

/// Narrows a buffer position to the 32-bit offsets the formats store.
pub fn offset_u32(position: usize) -> Result<u32> {
    u32::try_from(position).map_err(|_| {
        TexError::InvalidInput(format!("offset {position} does not fit in 32 bits"))
    })
}
