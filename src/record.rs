//! Header records and the chain walk.
//!
//! # Record frame
//! Each record is a fixed 28-byte little-endian frame: tag, next-record
//! offset, data offset, stored data length, declared uncompressed length,
//! flags, and a CRC32 of the decoded payload (zero when the producer omits
//! it). Records link by absolute byte offset; the chain is an arena walk
//! over the container buffer, not a pointer structure.
//!
//! # Hostile input
//! No single offset is trusted. Every step re-validates against the buffer
//! bounds, a visited set rejects cycles, and a configurable record-count
//! bound rejects degenerate chains long before allocation becomes a problem.

use std::collections::HashSet;

use byteorder::LittleEndian;
use serde::Serialize;
use tracing::debug;

use crate::cursor::ByteCursor;
use crate::error::{ExtractError, Result};
use crate::format::FormatDescriptor;

/// Byte length of one record frame on the wire.
pub const RECORD_SIZE: usize = 28;

/// Flag bit: the section payload is stored compressed.
pub const FLAG_COMPRESSED: u32 = 1 << 0;

/// One resolved header record.
///
/// `offset` is where the record was read from; it is not a wire field but is
/// kept so diagnostics and cycle reports can name the exact frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeaderRecord {
    pub offset:      u32,
    pub tag:         u32,
    pub next_offset: u32,
    pub data_offset: u32,
    pub data_len:    u32,
    pub orig_len:    u32,
    pub flags:       u32,
    pub checksum:    u32,
}

impl HeaderRecord {
    /// Read one frame from the cursor's current position.
    pub fn read(cur: &mut ByteCursor<'_>) -> Result<Self> {
        let offset = cur.position() as u32;
        Ok(Self {
            offset,
            tag:         cur.read_u32::<LittleEndian>()?,
            next_offset: cur.read_u32::<LittleEndian>()?,
            data_offset: cur.read_u32::<LittleEndian>()?,
            data_len:    cur.read_u32::<LittleEndian>()?,
            orig_len:    cur.read_u32::<LittleEndian>()?,
            flags:       cur.read_u32::<LittleEndian>()?,
            checksum:    cur.read_u32::<LittleEndian>()?,
        })
    }

    pub fn is_compressed(&self) -> bool {
        self.flags & FLAG_COMPRESSED != 0
    }

    /// Whether `next_offset` terminates the chain under `desc`.
    pub fn is_terminal(&self, desc: &FormatDescriptor) -> bool {
        self.next_offset == desc.next_sentinel || self.next_offset == 0
    }
}

/// The ordered record sequence produced by [`walk`].
#[derive(Debug, Clone)]
pub struct ResolvedChain {
    pub entry_offset: u32,
    pub records:      Vec<HeaderRecord>,
}

impl ResolvedChain {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Walk the record chain from `entry_offset` to its terminal sentinel.
///
/// Per step: the frame is read through the bounds-checked cursor, a
/// non-terminal `next_offset` must lie inside the buffer, and `data_offset`
/// must lie inside the buffer whenever `data_len` is non-zero (a zero-length
/// record carries no data range to validate and is retained as-is). Cycles
/// fail with [`ExtractError::MalformedChain`]; a chain of more than
/// `max_chain_len` records fails with [`ExtractError::ChainTooLong`].
pub fn walk(
    buffer:        &[u8],
    desc:          &FormatDescriptor,
    entry_offset:  u32,
    max_chain_len: usize,
) -> Result<ResolvedChain> {
    let size = buffer.len() as u64;
    let mut cur = ByteCursor::new(buffer);
    cur.seek(entry_offset as usize)?;

    let mut records: Vec<HeaderRecord> = Vec::new();
    let mut visited: HashSet<u32> = HashSet::new();
    let mut offset = entry_offset;

    loop {
        if !visited.insert(offset) {
            return Err(ExtractError::MalformedChain { offset });
        }
        if records.len() >= max_chain_len {
            return Err(ExtractError::ChainTooLong { max: max_chain_len });
        }

        cur.seek(offset as usize)?;
        let rec = HeaderRecord::read(&mut cur)?;

        if !rec.is_terminal(desc) && u64::from(rec.next_offset) >= size {
            return Err(ExtractError::OutOfBounds {
                offset: u64::from(rec.next_offset),
                len:    0,
                size,
            });
        }
        if rec.data_len > 0 && u64::from(rec.data_offset) >= size {
            return Err(ExtractError::OutOfBounds {
                offset: u64::from(rec.data_offset),
                len:    u64::from(rec.data_len),
                size,
            });
        }

        let terminal = rec.is_terminal(desc);
        let next = rec.next_offset;
        records.push(rec);

        if terminal {
            break;
        }
        offset = next;
    }

    debug!("walked {} record(s) from {:#x}", records.len(), entry_offset);
    Ok(ResolvedChain { entry_offset, records })
}
