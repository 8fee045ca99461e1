//! RPD assembly: bit order and padding.
//!
//! The container stores configuration data with the opposite per-byte bit
//! orientation from what device programmers consume. Assembly mirrors every
//! byte (bit 0 becomes bit 7) and optionally pads the result to a block
//! boundary. Nothing here inspects the bits; the transform is purely
//! structural.

use crate::bitstream::{ChecksumState, DecodedBitstream};

/// Default padding fill byte: the erased state of NOR flash.
pub const DEFAULT_PAD_FILL: u8 = 0xFF;

/// Reverse the bit order of every byte. The transform is its own inverse.
pub fn reverse_bits(data: &[u8]) -> Vec<u8> {
    data.iter().map(|b| b.reverse_bits()).collect()
}

/// The assembled raw programming image.
///
/// `data` holds the padded image; `logical_len` is the byte count of the
/// image proper so callers never confuse the two.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpdImage {
    pub data:        Vec<u8>,
    pub logical_len: usize,
    /// Checksum verdict carried over from the decode stage.
    pub checksum:    ChecksumState,
}

impl RpdImage {
    pub fn padded_len(&self) -> usize {
        self.data.len()
    }

    pub fn padding(&self) -> usize {
        self.data.len() - self.logical_len
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// Assemble a decoded bitstream into RPD order.
///
/// `pad_to` rounds the image up to a multiple of the given byte alignment
/// using `fill`; padding bytes are appended after the bit reversal and are
/// not themselves reversed. `pad_to` of `None`, zero, or one leaves the
/// image at its logical length.
pub fn assemble(decoded: &DecodedBitstream, pad_to: Option<usize>, fill: u8) -> RpdImage {
    let mut data = reverse_bits(&decoded.data);
    let logical_len = data.len();

    if let Some(align) = pad_to {
        if align > 1 {
            let rem = data.len() % align;
            if rem != 0 {
                data.resize(data.len() + (align - rem), fill);
            }
        }
    }

    RpdImage { data, logical_len, checksum: decoded.checksum }
}
