//! Section classification: tag dispatch plus payload materialization.
//!
//! Classification maps a record's tag through the format descriptor's fixed
//! table and borrows the payload range from the container buffer. Unknown
//! tags are not an error (real containers carry vendor sections the
//! extractor has no business understanding), but a payload range that
//! overruns the buffer is: once a record implies data, the data must exist.

use serde::Serialize;

use crate::cursor::slice_at;
use crate::error::Result;
use crate::format::FormatDescriptor;
use crate::record::HeaderRecord;

/// The closed set of section kinds the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SectionKind {
    /// Holds the configuration payload, possibly compressed.
    Bitstream,
    /// NUL-terminated descriptive strings: tool version, chip name, title.
    Metadata,
    /// Flash device naming and layout information.
    FlashLayout,
    /// Anything the tag table does not cover; passed through unchanged.
    Unknown,
}

impl SectionKind {
    /// Display name (never parsed back).
    pub fn name(self) -> &'static str {
        match self {
            SectionKind::Bitstream   => "bitstream",
            SectionKind::Metadata    => "metadata",
            SectionKind::FlashLayout => "flash-layout",
            SectionKind::Unknown     => "unknown",
        }
    }

    /// Whether payloads of this kind are NUL-terminated strings.
    pub fn is_string_bearing(self) -> bool {
        matches!(self, SectionKind::Metadata | SectionKind::FlashLayout)
    }
}

/// A classified record with its payload materialized as a borrowed slice.
///
/// The slice borrows from the container buffer; the section never owns
/// payload bytes.
#[derive(Debug, Clone, Copy)]
pub struct Section<'a> {
    pub kind:   SectionKind,
    pub record: HeaderRecord,
    pub data:   &'a [u8],
}

impl<'a> Section<'a> {
    /// Decode a string-bearing payload up to its NUL terminator.
    ///
    /// Returns `None` for kinds that do not carry strings and for payloads
    /// that are not valid UTF-8 up to the terminator.
    pub fn metadata_str(&self) -> Option<&'a str> {
        if !self.kind.is_string_bearing() {
            return None;
        }
        let end = self.data.iter().position(|&b| b == 0).unwrap_or(self.data.len());
        std::str::from_utf8(&self.data[..end]).ok()
    }
}

/// Classify one record and materialize its payload.
///
/// A zero-length record yields an empty slice without consulting
/// `data_offset`: no data range was implied, so there is nothing to bound.
pub fn classify<'a>(
    record: &HeaderRecord,
    buffer: &'a [u8],
    desc:   &FormatDescriptor,
) -> Result<Section<'a>> {
    let kind = desc.kind_of(record.tag);
    let data: &'a [u8] = if record.data_len == 0 {
        &[]
    } else {
        slice_at(buffer, u64::from(record.data_offset), u64::from(record.data_len))?
    };
    Ok(Section { kind, record: *record, data })
}
