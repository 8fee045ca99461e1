//! Decompression contract and the built-in scheme registry.
//!
//! # Contract
//! The bitstream decoder never implements compression itself; it invokes a
//! [`Decompressor`] and treats any failure as stream corruption. The
//! `expected_len` argument is the record's declared uncompressed length,
//! passed through so implementations that need an output size up front
//! (raw LZ4, vendor schemes) have it; built-ins that self-describe their
//! output ignore it.
//!
//! # Schemes
//! The compressed flag in a record is a single bit; which algorithm it
//! implies is configuration, not container data. [`Scheme`] names the
//! built-ins and resolves to a boxed contract. Callers with knowledge of a
//! vendor algorithm implement [`Decompressor`] themselves and call
//! [`crate::bitstream::decode`] directly.
//!
//! # Synthesis
//! [`Scheme::compress`] is the paired forward transform, used by the
//! container builder and the test suite to produce compressed fixtures. The
//! extraction pipeline never compresses.

use std::io::{self, Cursor};

use crate::error::{ExtractError, Result};

/// The decompression contract invoked on sections whose compressed flag is
/// set. Implementations must be pure functions of their input.
pub trait Decompressor: Send + Sync {
    /// Scheme name for diagnostics.
    fn name(&self) -> &'static str;

    /// Decode `data`; `expected_len` is the declared uncompressed length.
    ///
    /// Implementations fail with [`ExtractError::DecompressionFailed`] on
    /// corrupt or truncated streams. They do not enforce `expected_len`;
    /// length validation belongs to the decoder.
    fn decompress(&self, data: &[u8], expected_len: usize) -> Result<Vec<u8>>;
}

// ── Scheme registry ──────────────────────────────────────────────────────────

/// Built-in compression schemes the compressed flag can be resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scheme {
    #[default]
    Zstd,
    Lz4,
    Lzma,
}

impl Scheme {
    pub fn name(self) -> &'static str {
        match self {
            Scheme::Zstd => "zstd",
            Scheme::Lz4  => "lz4",
            Scheme::Lzma => "lzma",
        }
    }

    /// Parse from a CLI string.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "zstd" => Some(Scheme::Zstd),
            "lz4"  => Some(Scheme::Lz4),
            "lzma" => Some(Scheme::Lzma),
            _      => None,
        }
    }

    /// Resolve to the boxed contract.
    pub fn decompressor(self) -> Box<dyn Decompressor> {
        match self {
            Scheme::Zstd => Box::new(ZstdDecompressor),
            Scheme::Lz4  => Box::new(Lz4Decompressor),
            Scheme::Lzma => Box::new(LzmaDecompressor),
        }
    }

    /// Forward transform for container synthesis.
    pub fn compress(self, data: &[u8]) -> io::Result<Vec<u8>> {
        match self {
            Scheme::Zstd => zstd::encode_all(data, DEFAULT_ZSTD_LEVEL),
            Scheme::Lz4  => Ok(lz4_flex::compress_prepend_size(data)),
            Scheme::Lzma => {
                let mut out = Vec::new();
                lzma_rs::lzma_compress(&mut Cursor::new(data), &mut out)
                    .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
                Ok(out)
            }
        }
    }
}

/// Zstd level used when synthesizing fixtures. Ratio is irrelevant there.
const DEFAULT_ZSTD_LEVEL: i32 = 3;

// ── Built-in implementations ─────────────────────────────────────────────────

pub struct ZstdDecompressor;
impl Decompressor for ZstdDecompressor {
    fn name(&self) -> &'static str { "zstd" }
    fn decompress(&self, data: &[u8], _expected_len: usize) -> Result<Vec<u8>> {
        zstd::decode_all(data).map_err(|e| ExtractError::DecompressionFailed(e.to_string()))
    }
}

pub struct Lz4Decompressor;
impl Decompressor for Lz4Decompressor {
    fn name(&self) -> &'static str { "lz4" }
    fn decompress(&self, data: &[u8], _expected_len: usize) -> Result<Vec<u8>> {
        lz4_flex::decompress_size_prepended(data)
            .map_err(|e| ExtractError::DecompressionFailed(e.to_string()))
    }
}

pub struct LzmaDecompressor;
impl Decompressor for LzmaDecompressor {
    fn name(&self) -> &'static str { "lzma" }
    fn decompress(&self, data: &[u8], expected_len: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(expected_len);
        lzma_rs::lzma_decompress(&mut Cursor::new(data), &mut out)
            .map_err(|e| ExtractError::DecompressionFailed(e.to_string()))?;
        Ok(out)
    }
}
