//! Bitstream section decoding: decompression, length and checksum
//! validation, and firmware object-tag stripping.
//!
//! # Validation order
//! 1. Decompress when the record's compressed flag is set; otherwise take
//!    an owned copy of the stored slice.
//! 2. The decoded length must equal the record's declared uncompressed
//!    length exactly.
//! 3. A non-zero checksum field is recomputed (CRC32 over the decoded
//!    payload) and compared. A mismatch is recorded, not fatal: some
//!    producers zero the field, and a wrong value on otherwise-consistent
//!    data should not block recovery of the image. `require_checksum`
//!    promotes the mismatch to a hard error.
//! 4. A payload opening with the 12-byte raw-firmware object tag has the
//!    tag stripped; the image proper starts after it. Payloads without the
//!    tag pass through byte-for-byte.

use crc32fast::Hasher;
use tracing::{debug, warn};

use crate::cursor::ByteCursor;
use crate::decomp::Decompressor;
use crate::error::{ExtractError, Result};
use crate::format::{ObjectTag, TagClass, OBJECT_TAG_SIZE};
use crate::section::{Section, SectionKind};

/// Verdict of the checksum comparison for one decoded payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumState {
    /// Stored and recomputed values agree.
    Verified,
    /// The record's checksum field was zero; nothing to compare.
    Absent,
    /// Stored and recomputed values disagree.
    Mismatch { stored: u32, computed: u32 },
}

impl ChecksumState {
    pub fn is_mismatch(self) -> bool {
        matches!(self, ChecksumState::Mismatch { .. })
    }
}

/// The bitstream payload after decompression and validation.
#[derive(Debug, Clone)]
pub struct DecodedBitstream {
    /// The image bytes, object tag already stripped.
    pub data:         Vec<u8>,
    /// The record's declared uncompressed length (covers the object tag).
    pub declared_len: u32,
    pub checksum:     ChecksumState,
    /// The leading object tag, when the payload carried one.
    pub object_tag:   Option<ObjectTag>,
}

/// Decode one section classified as [`SectionKind::Bitstream`].
pub fn decode(
    section:          &Section<'_>,
    decompressor:     &dyn Decompressor,
    require_checksum: bool,
) -> Result<DecodedBitstream> {
    debug_assert_eq!(section.kind, SectionKind::Bitstream);
    let record = &section.record;

    let mut data = if record.is_compressed() {
        debug!(
            "decompressing {} stored byte(s) via {}",
            section.data.len(),
            decompressor.name()
        );
        decompressor.decompress(section.data, record.orig_len as usize)?
    } else {
        section.data.to_vec()
    };

    if data.len() as u64 != u64::from(record.orig_len) {
        return Err(ExtractError::LengthMismatch {
            declared: u64::from(record.orig_len),
            actual:   data.len() as u64,
        });
    }

    let checksum = if record.checksum == 0 {
        ChecksumState::Absent
    } else {
        let mut hasher = Hasher::new();
        hasher.update(&data);
        let computed = hasher.finalize();
        if computed == record.checksum {
            ChecksumState::Verified
        } else if require_checksum {
            return Err(ExtractError::ChecksumMismatch {
                stored:   record.checksum,
                computed,
            });
        } else {
            warn!(
                "bitstream checksum mismatch: stored {:#010x}, computed {:#010x}",
                record.checksum, computed
            );
            ChecksumState::Mismatch { stored: record.checksum, computed }
        }
    };

    let object_tag = leading_firmware_tag(&data);
    if object_tag.is_some() {
        data.drain(..OBJECT_TAG_SIZE);
    }

    Ok(DecodedBitstream {
        data,
        declared_len: record.orig_len,
        checksum,
        object_tag,
    })
}

/// Parse the first 12 bytes as an object tag and accept it only when it is
/// exactly the raw-firmware tag. A real image that happens to start with
/// those 12 bytes is not representable; the tag bytes are reserved.
fn leading_firmware_tag(data: &[u8]) -> Option<ObjectTag> {
    if data.len() < OBJECT_TAG_SIZE {
        return None;
    }
    let mut cur = ByteCursor::new(&data[..OBJECT_TAG_SIZE]);
    let tag = ObjectTag::read(&mut cur).ok()?;
    match tag.classify() {
        Some(TagClass::RawFirmware) => Some(tag),
        _ => None,
    }
}
