//! In-memory container authoring.
//!
//! [`ContainerBuilder`] emits the same wire layout the extraction pipeline
//! consumes: a 12-byte leader tag followed by a chain of 28-byte header
//! records with inline payloads. Records are appended terminal and the
//! previous record's `next_offset` is patched to point at the newcomer, so
//! the chain is always well formed mid-build.
//!
//! Beyond producing valid containers, the builder deliberately allows
//! invalid ones: [`ContainerBuilder::add_frame`] takes every wire field
//! verbatim and [`ContainerBuilder::set_next_offset`] patches links after
//! the fact, which is how cyclic and out-of-bounds fixtures are made.

use std::io;

use crc32fast::Hasher;

use crate::decomp::Scheme;
use crate::format::{ContainerKind, NEXT_SENTINEL, TAG_FIRMWARE, TAG_RAW_FIRMWARE};
use crate::record::{FLAG_COMPRESSED, RECORD_SIZE};

fn checksum_of(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

// ── ContainerBuilder ─────────────────────────────────────────────────────────

pub struct ContainerBuilder {
    buf:            Vec<u8>,
    record_offsets: Vec<u32>,
}

impl ContainerBuilder {
    /// Start a container of the given kind. The leader tag is written
    /// immediately; the first record lands right behind it.
    pub fn new(kind: ContainerKind) -> Self {
        let buf = kind.descriptor().leader.to_bytes().to_vec();
        Self { buf, record_offsets: Vec::new() }
    }

    // ── Sections ─────────────────────────────────────────────────────────────

    /// Append an uncompressed section under `tag`. The record is stamped
    /// with the payload's CRC32.
    pub fn add_section(&mut self, tag: u32, data: &[u8]) -> &mut Self {
        self.append_record(tag, data, data.len() as u32, 0, checksum_of(data))
    }

    /// Append a NUL-terminated string section, the shape metadata records
    /// carry on the wire.
    pub fn add_metadata(&mut self, tag: u32, value: &str) -> &mut Self {
        let mut payload = value.as_bytes().to_vec();
        payload.push(0);
        self.add_section(tag, &payload)
    }

    /// Append a firmware section holding `image` as-is.
    pub fn add_bitstream(&mut self, image: &[u8]) -> &mut Self {
        self.add_section(TAG_FIRMWARE, image)
    }

    /// Append a firmware section with the 12-byte raw-firmware object tag
    /// prepended, the way programmer-generated containers store it. Length
    /// and checksum cover the tag bytes too.
    pub fn add_bitstream_tagged(&mut self, image: &[u8]) -> &mut Self {
        let mut payload = TAG_RAW_FIRMWARE.to_bytes().to_vec();
        payload.extend_from_slice(image);
        self.add_section(TAG_FIRMWARE, &payload)
    }

    /// Append a compressed firmware section. The declared length and the
    /// checksum describe the uncompressed image.
    pub fn add_bitstream_compressed(&mut self, image: &[u8], scheme: Scheme) -> io::Result<&mut Self> {
        let stored = scheme.compress(image)?;
        Ok(self.append_record(
            TAG_FIRMWARE,
            &stored,
            image.len() as u32,
            FLAG_COMPRESSED,
            checksum_of(image),
        ))
    }

    // ── Raw frames and patches ───────────────────────────────────────────────

    /// Append a bare 28-byte frame with every field given verbatim and no
    /// payload bytes. The previous record is linked to this frame; the
    /// frame's own fields are not validated in any way.
    pub fn add_frame(
        &mut self,
        tag:         u32,
        next_offset: u32,
        data_offset: u32,
        data_len:    u32,
        orig_len:    u32,
        flags:       u32,
        checksum:    u32,
    ) -> &mut Self {
        let record_offset = self.buf.len() as u32;
        self.link_previous(record_offset);

        self.put_u32(tag);
        self.put_u32(next_offset);
        self.put_u32(data_offset);
        self.put_u32(data_len);
        self.put_u32(orig_len);
        self.put_u32(flags);
        self.put_u32(checksum);

        self.record_offsets.push(record_offset);
        self
    }

    /// Rewrite the `next_offset` field of an already-appended record.
    pub fn set_next_offset(&mut self, record_index: usize, value: u32) -> &mut Self {
        self.patch_field(record_index, 4, value)
    }

    /// Rewrite the stored checksum of an already-appended record. Zero marks
    /// the checksum absent.
    pub fn set_checksum(&mut self, record_index: usize, value: u32) -> &mut Self {
        self.patch_field(record_index, 24, value)
    }

    /// Rewrite the declared uncompressed length of an already-appended record.
    pub fn set_orig_len(&mut self, record_index: usize, value: u32) -> &mut Self {
        self.patch_field(record_index, 16, value)
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub fn record_count(&self) -> usize { self.record_offsets.len() }

    /// Offset of the `index`-th record frame, in append order.
    pub fn record_offset(&self, index: usize) -> u32 { self.record_offsets[index] }

    pub fn finish(self) -> Vec<u8> { self.buf }

    // ── Internals ────────────────────────────────────────────────────────────

    fn append_record(
        &mut self,
        tag:      u32,
        stored:   &[u8],
        orig_len: u32,
        flags:    u32,
        checksum: u32,
    ) -> &mut Self {
        let record_offset = self.buf.len() as u32;
        let data_offset = record_offset + RECORD_SIZE as u32;
        self.add_frame(
            tag,
            NEXT_SENTINEL,
            data_offset,
            stored.len() as u32,
            orig_len,
            flags,
            checksum,
        );
        self.buf.extend_from_slice(stored);
        self
    }

    fn link_previous(&mut self, record_offset: u32) {
        if let Some(&prev) = self.record_offsets.last() {
            let field = prev as usize + 4;
            self.buf[field..field + 4].copy_from_slice(&record_offset.to_le_bytes());
        }
    }

    fn patch_field(&mut self, record_index: usize, field_offset: usize, value: u32) -> &mut Self {
        let field = self.record_offsets[record_index] as usize + field_offset;
        self.buf[field..field + 4].copy_from_slice(&value.to_le_bytes());
        self
    }

    fn put_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::OBJECT_TAG_SIZE;

    #[test]
    fn leader_and_first_record_placement() {
        let mut b = ContainerBuilder::new(ContainerKind::Jic);
        b.add_bitstream(&[1, 2, 3]);
        assert_eq!(b.record_count(), 1);
        assert_eq!(b.record_offset(0) as usize, OBJECT_TAG_SIZE);

        let bytes = b.finish();
        assert_eq!(&bytes[..3], &b"JIC"[..]);
        assert_eq!(bytes.len(), OBJECT_TAG_SIZE + RECORD_SIZE + 3);
    }

    #[test]
    fn appending_links_previous_record() {
        let mut b = ContainerBuilder::new(ContainerKind::Jic);
        b.add_metadata(2, "EP4CE6");
        b.add_bitstream(&[0xAA]);

        let second = b.record_offset(1);
        let first = b.record_offset(0) as usize;
        let bytes = b.finish();

        let next = u32::from_le_bytes([
            bytes[first + 4],
            bytes[first + 5],
            bytes[first + 6],
            bytes[first + 7],
        ]);
        assert_eq!(next, second);
    }
}
