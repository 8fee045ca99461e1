//! The extraction pipeline: container bytes in, RPD image out.
//!
//! ```
//! use jicex::builder::ContainerBuilder;
//! use jicex::format::TAG_CHIP_NAME;
//! use jicex::{extract, ContainerKind, ExtractOptions};
//!
//! let mut builder = ContainerBuilder::new(ContainerKind::Jic);
//! builder.add_metadata(TAG_CHIP_NAME, "EP4CE22F17C6");
//! builder.add_bitstream(&[0x01, 0x80, 0xFF, 0x00]);
//! let container = builder.finish();
//!
//! let image = extract(&container, &ExtractOptions::default())?;
//! assert_eq!(image.as_bytes(), [0x80, 0x01, 0xFF, 0x00]);
//! # Ok::<(), jicex::ExtractError>(())
//! ```
//!
//! The pipeline runs strictly upward: cursor, chain walk, classification,
//! bitstream decode, RPD assembly. Each stage is a pure function over its
//! inputs, so concurrent extractions of different buffers need no
//! coordination; the container slice is the only resource held.

use tracing::debug;

use crate::bitstream::{self, DecodedBitstream};
use crate::cursor::ByteCursor;
use crate::decomp::Scheme;
use crate::error::{ExtractError, Result};
use crate::format::{ContainerKind, FormatDescriptor, ObjectTag};
use crate::record::{walk, ResolvedChain};
use crate::rpd::{assemble, RpdImage, DEFAULT_PAD_FILL};
use crate::section::{classify, Section, SectionKind};

/// Default bound on chain length. Real containers hold a handful of records;
/// anything approaching this bound is corrupt or adversarial.
pub const DEFAULT_MAX_CHAIN_LEN: usize = 4096;

// ── Options ──────────────────────────────────────────────────────────────────

/// Configuration for [`extract`].
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Which format descriptor drives the walk and classification.
    pub kind:             ContainerKind,
    /// Override for the chain entry offset. When set, the caller owns the
    /// container geometry and the leader-tag check is skipped.
    pub entry_offset:     Option<u32>,
    /// Upper bound on walked records before the chain is declared corrupt.
    pub max_chain_len:    usize,
    /// Pad the assembled image to a multiple of this many bytes.
    pub pad_to:           Option<usize>,
    /// Fill byte for padding.
    pub pad_fill:         u8,
    /// Promote a checksum mismatch from a recorded verdict to a hard error.
    pub require_checksum: bool,
    /// Require the full 12-byte leader tag to match the descriptor; when
    /// cleared only the ASCII magic is compared.
    pub strict:           bool,
    /// Which bitstream section to decode when the chain carries several,
    /// counted in chain order. The first is the authoritative one; producers
    /// that append variants put them later.
    pub bitstream_index:  usize,
    /// Compression scheme the compressed flag resolves to.
    pub scheme:           Scheme,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            kind:             ContainerKind::Jic,
            entry_offset:     None,
            max_chain_len:    DEFAULT_MAX_CHAIN_LEN,
            pad_to:           None,
            pad_fill:         DEFAULT_PAD_FILL,
            require_checksum: false,
            strict:           true,
            bitstream_index:  0,
            scheme:           Scheme::default(),
        }
    }
}

// ── Pipeline stages ──────────────────────────────────────────────────────────

fn validate_leader(
    container: &[u8],
    desc:      &'static FormatDescriptor,
    strict:    bool,
) -> Result<ObjectTag> {
    let mut cur = ByteCursor::new(container);
    let leader = ObjectTag::read(&mut cur)?;
    let ok = if strict {
        leader == desc.leader
    } else {
        leader.magic_matches(desc.leader)
    };
    if !ok {
        return Err(ExtractError::LeaderMismatch { expected: desc.name });
    }
    Ok(leader)
}

/// Validate the leader (unless the caller overrides the entry offset) and
/// walk the record chain.
pub fn walk_container(container: &[u8], opts: &ExtractOptions) -> Result<ResolvedChain> {
    let desc = opts.kind.descriptor();
    let entry = match opts.entry_offset {
        Some(offset) => offset,
        None => {
            validate_leader(container, desc, opts.strict)?;
            desc.entry_offset
        }
    };
    walk(container, desc, entry, opts.max_chain_len)
}

/// Walk and classify every record, materializing payload slices.
pub fn sections<'a>(container: &'a [u8], opts: &ExtractOptions) -> Result<Vec<Section<'a>>> {
    let desc = opts.kind.descriptor();
    let chain = walk_container(container, opts)?;
    chain
        .records
        .iter()
        .map(|record| classify(record, container, desc))
        .collect()
}

/// Locate the selected bitstream section and decode it.
pub fn decode_bitstream(container: &[u8], opts: &ExtractOptions) -> Result<DecodedBitstream> {
    let sections = sections(container, opts)?;
    let walked = sections.len();

    let target = sections
        .iter()
        .filter(|s| s.kind == SectionKind::Bitstream)
        .nth(opts.bitstream_index)
        .ok_or(ExtractError::NoBitstreamSection { walked })?;

    debug!(
        "decoding bitstream record at {:#x} ({} stored byte(s), compressed: {})",
        target.record.offset,
        target.record.data_len,
        target.record.is_compressed(),
    );

    let decompressor = opts.scheme.decompressor();
    bitstream::decode(target, decompressor.as_ref(), opts.require_checksum)
}

/// Extract the raw programming image from a container.
///
/// This is the crate's entry point; everything else is a stage of it. The
/// call is deterministic: the same bytes and options always produce a
/// byte-identical image or the same error.
pub fn extract(container: &[u8], opts: &ExtractOptions) -> Result<RpdImage> {
    let decoded = decode_bitstream(container, opts)?;
    Ok(assemble(&decoded, opts.pad_to, opts.pad_fill))
}
