//! Bounds-checked random-access view over a container's raw bytes.
//!
//! Every multi-byte read names its endianness through a [`byteorder`]
//! type parameter; the record frames of the JIC family are little-endian
//! throughout, but the cursor itself does not assume that. Reads have no
//! side effect beyond advancing the position, and every overrun is reported
//! as [`ExtractError::OutOfBounds`] with the exact offending coordinates.

use byteorder::ByteOrder;

use crate::error::{ExtractError, Result};

/// A cursor over an immutable byte buffer.
///
/// The buffer is borrowed for the cursor's lifetime; slices handed out by
/// [`ByteCursor::slice`] and [`ByteCursor::read_bytes`] borrow from the same
/// buffer and stay valid after the cursor is dropped.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos:  usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Reposition absolutely. An offset one past the end is allowed (the
    /// cursor parks at EOF); anything beyond fails.
    pub fn seek(&mut self, offset: usize) -> Result<()> {
        if offset > self.data.len() {
            return Err(ExtractError::OutOfBounds {
                offset: offset as u64,
                len:    0,
                size:   self.data.len() as u64,
            });
        }
        self.pos = offset;
        Ok(())
    }

    /// Borrow the next `len` bytes and advance past them.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let taken = slice_at(self.data, self.pos as u64, len as u64)?;
        self.pos += len;
        Ok(taken)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16<E: ByteOrder>(&mut self) -> Result<u16> {
        Ok(E::read_u16(self.read_bytes(2)?))
    }

    pub fn read_u32<E: ByteOrder>(&mut self) -> Result<u32> {
        Ok(E::read_u32(self.read_bytes(4)?))
    }

    /// Borrow `len` bytes at an absolute `offset` without moving the cursor.
    pub fn slice(&self, offset: usize, len: usize) -> Result<&'a [u8]> {
        slice_at(self.data, offset as u64, len as u64)
    }
}

/// Borrow `[offset, offset + len)` from `data`.
///
/// Arithmetic is done in u64 so that offset and length fields taken straight
/// from a hostile container cannot wrap before the comparison.
pub fn slice_at(data: &[u8], offset: u64, len: u64) -> Result<&[u8]> {
    let size = data.len() as u64;
    let end = offset
        .checked_add(len)
        .ok_or(ExtractError::OutOfBounds { offset, len, size })?;
    if end > size {
        return Err(ExtractError::OutOfBounds { offset, len, size });
    }
    Ok(&data[offset as usize..end as usize])
}
