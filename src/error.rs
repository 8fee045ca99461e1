//! Error taxonomy for a single extraction pass.
//!
//! Every failure here is structural and local to one input buffer: container
//! parsing is deterministic, so no variant carries retry semantics. A fatal
//! error aborts the pipeline; the only recoverable condition, a checksum
//! mismatch, surfaces as [`ChecksumState::Mismatch`] on the decoded payload
//! unless the caller opted into `require_checksum`.
//!
//! [`ChecksumState::Mismatch`]: crate::bitstream::ChecksumState

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExtractError>;

#[derive(Error, Debug)]
pub enum ExtractError {
    /// An offset or length implied by the container exceeds the buffer.
    #[error("Offset {offset:#x} (+{len} bytes) exceeds container size {size}")]
    OutOfBounds { offset: u64, len: u64, size: u64 },

    /// The record chain revisited an offset it had already resolved.
    #[error("Record chain cycles back to offset {offset:#x}")]
    MalformedChain { offset: u32 },

    /// The chain grew past the configured bound; treated as corruption, not
    /// as a legitimately large container.
    #[error("Record chain exceeds the configured maximum of {max} records")]
    ChainTooLong { max: usize },

    /// The chain walked and classified cleanly but held no bitstream section
    /// at the requested index.
    #[error("No bitstream section found ({walked} record(s) walked)")]
    NoBitstreamSection { walked: usize },

    #[error("Bitstream decompression failed: {0}")]
    DecompressionFailed(String),

    #[error("Decoded bitstream is {actual} bytes, record declares {declared}")]
    LengthMismatch { declared: u64, actual: u64 },

    /// Raised only under `require_checksum`; the default policy records the
    /// mismatch on the decoded payload and proceeds.
    #[error("Bitstream checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { stored: u32, computed: u32 },

    /// The 12-byte leader tag does not identify the expected format.
    #[error("Container leader is not a {expected} tag")]
    LeaderMismatch { expected: &'static str },
}
