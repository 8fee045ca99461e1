//! Format descriptors: the data-driven constants that separate JIC from its
//! POF/SOF siblings.
//!
//! # Identity rules
//! The three container variants share one record-frame shape and differ only
//! in the values collected here: the 12-byte leader tag, the chain entry
//! offset, the terminal sentinel, and the section tag table. Adding a
//! variant means adding a descriptor, never new control flow in the walker
//! or classifier.
//!
//! # Object tags
//! Every container opens with a 12-byte object tag (ASCII magic + two u32
//! fields), and firmware payloads open with one as well. The known tag
//! values form a small closed set; anything else classifies as `None` and
//! is surfaced verbatim for diagnostics.

use byteorder::LittleEndian;

use crate::cursor::ByteCursor;
use crate::error::Result;
use crate::section::SectionKind;

/// Byte length of an [`ObjectTag`] on the wire.
pub const OBJECT_TAG_SIZE: usize = 12;

// ── Section tag values ───────────────────────────────────────────────────────
//
// These values are fixed by the container producers. Tags absent from this
// list still walk and classify (as Unknown); they are simply not understood.

/// Software version string (NUL-terminated).
pub const TAG_SOFTWARE_VERSION: u32 = 1;
/// Target chip name string (NUL-terminated).
pub const TAG_CHIP_NAME: u32 = 2;
/// Design title string (NUL-terminated).
pub const TAG_TITLE: u32 = 3;
/// Flash device name string (NUL-terminated).
pub const TAG_FLASH_DEVICE: u32 = 27;
/// Firmware page: a 12-byte object tag followed by the RPD-equivalent image.
pub const TAG_FIRMWARE: u32 = 28;

/// Human label for a section tag, for listings only. Unlabelled tags have
/// been observed in real containers but their purpose is not established.
pub fn tag_label(tag: u32) -> Option<&'static str> {
    match tag {
        TAG_SOFTWARE_VERSION => Some("software version"),
        TAG_CHIP_NAME        => Some("chip name"),
        TAG_TITLE            => Some("title"),
        8                    => Some("checksum block"),
        26                   => Some("device descriptor"),
        TAG_FLASH_DEVICE     => Some("flash device name"),
        TAG_FIRMWARE         => Some("firmware image"),
        30                   => Some("auxiliary data"),
        _                    => None,
    }
}

// ── Object tags ──────────────────────────────────────────────────────────────

/// The 12-byte tag structure found at offset 0 of every container and at the
/// head of firmware payloads: a 4-byte ASCII magic (NUL padded) and two
/// little-endian u32 fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectTag {
    pub magic: [u8; 4],
    pub attr:  u32,
    pub class: u32,
}

/// Leader tag of a JIC container.
pub const TAG_JIC_HEADER: ObjectTag = ObjectTag { magic: *b"JIC\0", attr: 0, class: 0x08 };
/// Leader tag of a SOF container.
pub const TAG_SOF_HEADER: ObjectTag = ObjectTag { magic: *b"SOF\0", attr: 0, class: 0x0B };
/// Leader tag of a POF container.
pub const TAG_POF_HEADER: ObjectTag = ObjectTag { magic: *b"POF\0", attr: 0x0001_0000, class: 0x07 };
/// Tag that precedes a raw firmware image inside a firmware section.
pub const TAG_RAW_FIRMWARE: ObjectTag = ObjectTag { magic: [0; 4], attr: 0, class: 0x0001_0800 };

/// Classification of a known [`ObjectTag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagClass {
    JicHeader,
    SofHeader,
    PofHeader,
    RawFirmware,
}

impl TagClass {
    pub fn name(self) -> &'static str {
        match self {
            TagClass::JicHeader   => "JIC header",
            TagClass::SofHeader   => "SOF header",
            TagClass::PofHeader   => "POF header",
            TagClass::RawFirmware => "raw firmware",
        }
    }
}

impl ObjectTag {
    /// Read a tag from the cursor's current position.
    pub fn read(cur: &mut ByteCursor<'_>) -> Result<Self> {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(cur.read_bytes(4)?);
        let attr = cur.read_u32::<LittleEndian>()?;
        let class = cur.read_u32::<LittleEndian>()?;
        Ok(Self { magic, attr, class })
    }

    /// Serialize back to the 12-byte wire form.
    pub fn to_bytes(self) -> [u8; OBJECT_TAG_SIZE] {
        let mut out = [0u8; OBJECT_TAG_SIZE];
        out[..4].copy_from_slice(&self.magic);
        out[4..8].copy_from_slice(&self.attr.to_le_bytes());
        out[8..].copy_from_slice(&self.class.to_le_bytes());
        out
    }

    /// Look the tag up in the closed set of known classes.
    pub fn classify(self) -> Option<TagClass> {
        match self {
            t if t == TAG_JIC_HEADER   => Some(TagClass::JicHeader),
            t if t == TAG_SOF_HEADER   => Some(TagClass::SofHeader),
            t if t == TAG_POF_HEADER   => Some(TagClass::PofHeader),
            t if t == TAG_RAW_FIRMWARE => Some(TagClass::RawFirmware),
            _                          => None,
        }
    }

    /// Compare only the ASCII magic, ignoring the two numeric fields.
    /// This is the non-strict leader check.
    pub fn magic_matches(self, other: ObjectTag) -> bool {
        self.magic == other.magic
    }

    /// The magic with NUL padding stripped, for display.
    pub fn magic_str(&self) -> String {
        let end = self.magic.iter().position(|&b| b == 0).unwrap_or(4);
        String::from_utf8_lossy(&self.magic[..end]).into_owned()
    }

    /// Space-grouped hex rendering of the 12 raw bytes, for diagnostics.
    pub fn hexdump(&self) -> String {
        self.to_bytes()
            .chunks(4)
            .map(|word| {
                word.iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(" ")
            })
            .collect::<Vec<_>>()
            .join("  ")
    }
}

// ── Descriptors ──────────────────────────────────────────────────────────────

/// Terminal sentinel for a record's `next_offset` field. An offset of zero
/// also terminates: offset 0 is the leader tag, never a record.
pub const NEXT_SENTINEL: u32 = 0xFFFF_FFFF;

/// The per-variant constants consumed by the walker and classifier.
#[derive(Debug)]
pub struct FormatDescriptor {
    pub name:          &'static str,
    /// Expected 12-byte tag at offset 0.
    pub leader:        ObjectTag,
    /// Where the record chain starts: just past the leader tag.
    pub entry_offset:  u32,
    /// Value of `next_offset` that ends the chain.
    pub next_sentinel: u32,
    /// Tag table driving section classification; tags not listed here
    /// classify as [`SectionKind::Unknown`].
    pub tags:          &'static [(u32, SectionKind)],
}

impl FormatDescriptor {
    /// Resolve a section tag through this descriptor's table.
    pub fn kind_of(&self, tag: u32) -> SectionKind {
        self.tags
            .iter()
            .find(|(t, _)| *t == tag)
            .map(|(_, k)| *k)
            .unwrap_or(SectionKind::Unknown)
    }
}

const JIC_TAGS: &[(u32, SectionKind)] = &[
    (TAG_SOFTWARE_VERSION, SectionKind::Metadata),
    (TAG_CHIP_NAME,        SectionKind::Metadata),
    (TAG_TITLE,            SectionKind::Metadata),
    (TAG_FLASH_DEVICE,     SectionKind::FlashLayout),
    (TAG_FIRMWARE,         SectionKind::Bitstream),
];

// POF/SOF tag assignments have not been observed to differ from JIC; they get
// their own tables so a divergence is a data edit, not a restructuring.
const POF_TAGS: &[(u32, SectionKind)] = JIC_TAGS;
const SOF_TAGS: &[(u32, SectionKind)] = JIC_TAGS;

pub static JIC: FormatDescriptor = FormatDescriptor {
    name:          "JIC",
    leader:        TAG_JIC_HEADER,
    entry_offset:  OBJECT_TAG_SIZE as u32,
    next_sentinel: NEXT_SENTINEL,
    tags:          JIC_TAGS,
};

pub static POF: FormatDescriptor = FormatDescriptor {
    name:          "POF",
    leader:        TAG_POF_HEADER,
    entry_offset:  OBJECT_TAG_SIZE as u32,
    next_sentinel: NEXT_SENTINEL,
    tags:          POF_TAGS,
};

pub static SOF: FormatDescriptor = FormatDescriptor {
    name:          "SOF",
    leader:        TAG_SOF_HEADER,
    entry_offset:  OBJECT_TAG_SIZE as u32,
    next_sentinel: NEXT_SENTINEL,
    tags:          SOF_TAGS,
};

// ── ContainerKind ────────────────────────────────────────────────────────────

/// Runtime selector for one of the built-in descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContainerKind {
    #[default]
    Jic,
    Pof,
    Sof,
}

impl ContainerKind {
    pub fn descriptor(self) -> &'static FormatDescriptor {
        match self {
            ContainerKind::Jic => &JIC,
            ContainerKind::Pof => &POF,
            ContainerKind::Sof => &SOF,
        }
    }

    /// Human-readable name (for diagnostics only, never parsed back).
    pub fn name(self) -> &'static str {
        self.descriptor().name
    }

    /// Parse from a CLI string.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "jic" => Some(ContainerKind::Jic),
            "pof" => Some(ContainerKind::Pof),
            "sof" => Some(ContainerKind::Sof),
            _     => None,
        }
    }
}
