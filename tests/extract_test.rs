use jicex::builder::ContainerBuilder;
use jicex::extract::{extract, sections, ExtractOptions};
use jicex::format::{
    ContainerKind, NEXT_SENTINEL, TAG_CHIP_NAME, TAG_FIRMWARE, TAG_FLASH_DEVICE,
    TAG_SOFTWARE_VERSION, TAG_TITLE,
};
use jicex::record::{FLAG_COMPRESSED, RECORD_SIZE};
use jicex::section::SectionKind;
use jicex::{ChecksumState, ExtractError, Scheme};
use tempfile::NamedTempFile;

/// A single 28-byte record frame at offset 0 with its payload right behind
/// it. No leader tag; callers pass `entry_offset: Some(0)`.
fn bare_record_container(payload: &[u8]) -> Vec<u8> {
    let fields = [
        TAG_FIRMWARE,
        NEXT_SENTINEL,
        RECORD_SIZE as u32,
        payload.len() as u32,
        payload.len() as u32,
        0,
        0,
    ];
    let mut buf = Vec::with_capacity(RECORD_SIZE + payload.len());
    for field in fields {
        buf.extend_from_slice(&field.to_le_bytes());
    }
    buf.extend_from_slice(payload);
    buf
}

#[test]
fn test_extract_reverses_bit_order() {
    let mut b = ContainerBuilder::new(ContainerKind::Jic);
    b.add_bitstream(&[0x01, 0x80, 0xFF, 0x00]);
    let container = b.finish();

    let image = extract(&container, &ExtractOptions::default()).unwrap();
    assert_eq!(image.as_bytes(), [0x80, 0x01, 0xFF, 0x00]);
    assert_eq!(image.checksum, ChecksumState::Verified);
}

#[test]
fn test_extract_skips_metadata_records() {
    let mut b = ContainerBuilder::new(ContainerKind::Jic);
    b.add_metadata(TAG_SOFTWARE_VERSION, "Quartus Prime 20.1");
    b.add_metadata(TAG_CHIP_NAME, "EP4CE22F17C6");
    b.add_bitstream(&[0x0F, 0xF0]);
    let container = b.finish();

    let image = extract(&container, &ExtractOptions::default()).unwrap();
    assert_eq!(image.as_bytes(), [0xF0, 0x0F]);
}

#[test]
fn test_section_listing_preserves_chain_order() {
    let mut b = ContainerBuilder::new(ContainerKind::Jic);
    b.add_metadata(TAG_SOFTWARE_VERSION, "v23.1");
    b.add_metadata(TAG_CHIP_NAME, "EP4CE6E22C8");
    b.add_metadata(TAG_TITLE, "blinky");
    b.add_metadata(TAG_FLASH_DEVICE, "EPCS16");
    b.add_bitstream(&[0xAA; 64]);
    let container = b.finish();

    let secs = sections(&container, &ExtractOptions::default()).unwrap();
    let kinds: Vec<SectionKind> = secs.iter().map(|s| s.kind).collect();
    assert_eq!(
        kinds,
        [
            SectionKind::Metadata,
            SectionKind::Metadata,
            SectionKind::Metadata,
            SectionKind::FlashLayout,
            SectionKind::Bitstream,
        ]
    );
    assert_eq!(secs[1].metadata_str(), Some("EP4CE6E22C8"));
    assert_eq!(secs[3].metadata_str(), Some("EPCS16"));
    assert_eq!(secs[4].metadata_str(), None);
}

#[test]
fn test_unknown_tags_walk_and_classify_as_unknown() {
    let mut b = ContainerBuilder::new(ContainerKind::Jic);
    b.add_section(42, &[7, 7, 7]);
    b.add_bitstream(&[0x01]);
    let container = b.finish();

    let secs = sections(&container, &ExtractOptions::default()).unwrap();
    assert_eq!(secs[0].kind, SectionKind::Unknown);
    assert_eq!(secs[0].data, &[7, 7, 7]);

    let image = extract(&container, &ExtractOptions::default()).unwrap();
    assert_eq!(image.as_bytes(), [0x80]);
}

#[test]
fn test_record_at_entry_zero() {
    let container = bare_record_container(&[0x01, 0x80, 0xFF, 0x00]);
    let opts = ExtractOptions { entry_offset: Some(0), ..ExtractOptions::default() };

    let image = extract(&container, &opts).unwrap();
    assert_eq!(image.as_bytes(), [0x80, 0x01, 0xFF, 0x00]);
    // Frame checksum field is zero, so there was nothing to verify.
    assert_eq!(image.checksum, ChecksumState::Absent);
}

#[test]
fn test_chain_longer_than_bound_is_rejected() {
    let mut b = ContainerBuilder::new(ContainerKind::Jic);
    b.add_metadata(TAG_SOFTWARE_VERSION, "v1");
    b.add_metadata(TAG_CHIP_NAME, "EP4CE22");
    b.add_metadata(TAG_TITLE, "t");
    b.add_bitstream(&[0xAB]);
    let container = b.finish();

    let opts = ExtractOptions { max_chain_len: 3, ..ExtractOptions::default() };
    let err = extract(&container, &opts).unwrap_err();
    assert!(matches!(err, ExtractError::ChainTooLong { max: 3 }), "got {err}");

    // One more allowed record and the same chain resolves.
    let opts = ExtractOptions { max_chain_len: 4, ..ExtractOptions::default() };
    assert!(extract(&container, &opts).is_ok());
}

#[test]
fn test_cyclic_chain_is_rejected() {
    let mut b = ContainerBuilder::new(ContainerKind::Jic);
    b.add_metadata(TAG_TITLE, "loop");
    b.add_bitstream(&[1, 2, 3]);
    let first = b.record_offset(0);
    b.set_next_offset(1, first);
    let container = b.finish();

    let err = extract(&container, &ExtractOptions::default()).unwrap_err();
    assert!(
        matches!(err, ExtractError::MalformedChain { offset } if offset == first),
        "got {err}"
    );
}

#[test]
fn test_self_linking_record_is_rejected() {
    let mut b = ContainerBuilder::new(ContainerKind::Jic);
    b.add_bitstream(&[1]);
    let own = b.record_offset(0);
    b.set_next_offset(0, own);
    let container = b.finish();

    let err = extract(&container, &ExtractOptions::default()).unwrap_err();
    assert!(matches!(err, ExtractError::MalformedChain { offset } if offset == own));
}

#[test]
fn test_next_offset_past_end_is_rejected() {
    let mut b = ContainerBuilder::new(ContainerKind::Jic);
    b.add_bitstream(&[1, 2]);
    b.set_next_offset(0, 0x0012_3456);
    let container = b.finish();

    let err = extract(&container, &ExtractOptions::default()).unwrap_err();
    assert!(
        matches!(err, ExtractError::OutOfBounds { offset: 0x0012_3456, .. }),
        "got {err}"
    );
}

#[test]
fn test_data_offset_past_end_is_rejected() {
    let mut b = ContainerBuilder::new(ContainerKind::Jic);
    b.add_frame(TAG_FIRMWARE, NEXT_SENTINEL, 0xFFFF, 4, 4, 0, 0);
    let container = b.finish();

    let err = extract(&container, &ExtractOptions::default()).unwrap_err();
    assert!(matches!(err, ExtractError::OutOfBounds { offset: 0xFFFF, len: 4, .. }));
}

#[test]
fn test_data_range_spilling_past_end_is_rejected() {
    let mut b = ContainerBuilder::new(ContainerKind::Jic);
    b.add_bitstream(&[1, 2, 3, 4]);
    let mut container = b.finish();
    // Data offset stays in bounds; the range no longer fits.
    container.truncate(container.len() - 2);

    let err = extract(&container, &ExtractOptions::default()).unwrap_err();
    assert!(matches!(err, ExtractError::OutOfBounds { len: 4, .. }), "got {err}");
}

#[test]
fn test_metadata_only_container_has_no_bitstream() {
    let mut b = ContainerBuilder::new(ContainerKind::Jic);
    b.add_metadata(TAG_SOFTWARE_VERSION, "v1");
    b.add_metadata(TAG_TITLE, "no firmware here");
    let container = b.finish();

    let err = extract(&container, &ExtractOptions::default()).unwrap_err();
    assert!(matches!(err, ExtractError::NoBitstreamSection { walked: 2 }), "got {err}");
}

#[test]
fn test_bitstream_index_selects_in_chain_order() {
    let mut b = ContainerBuilder::new(ContainerKind::Jic);
    b.add_bitstream(&[0x01, 0x02]);
    b.add_bitstream(&[0xFF]);
    let container = b.finish();

    let first = extract(&container, &ExtractOptions::default()).unwrap();
    assert_eq!(first.as_bytes(), [0x80, 0x40]);

    let opts = ExtractOptions { bitstream_index: 1, ..ExtractOptions::default() };
    let second = extract(&container, &opts).unwrap();
    assert_eq!(second.as_bytes(), [0xFF]);

    let opts = ExtractOptions { bitstream_index: 2, ..ExtractOptions::default() };
    let err = extract(&container, &opts).unwrap_err();
    assert!(matches!(err, ExtractError::NoBitstreamSection { walked: 2 }));
}

#[test]
fn test_compressed_bitstream_roundtrip_all_schemes() {
    let mut image = vec![0x5A; 4096];
    image.extend_from_slice(b"trailing structure so the stream is not one run");

    for scheme in [Scheme::Zstd, Scheme::Lz4, Scheme::Lzma] {
        let mut b = ContainerBuilder::new(ContainerKind::Jic);
        b.add_metadata(TAG_CHIP_NAME, "10M08SAE144");
        b.add_bitstream_compressed(&image, scheme).unwrap();
        let container = b.finish();

        let opts = ExtractOptions { scheme, ..ExtractOptions::default() };
        let out = extract(&container, &opts).unwrap();
        assert_eq!(out.checksum, ChecksumState::Verified, "scheme {}", scheme.name());
        assert_eq!(out.logical_len, image.len());

        let expected: Vec<u8> = image.iter().map(|b| b.reverse_bits()).collect();
        assert_eq!(out.as_bytes(), &expected[..], "scheme {}", scheme.name());
    }
}

#[test]
fn test_garbage_compressed_stream_fails_decompression() {
    let mut b = ContainerBuilder::new(ContainerKind::Jic);
    b.add_frame(TAG_FIRMWARE, NEXT_SENTINEL, 0, 0, 64, FLAG_COMPRESSED, 0);
    let mut container = b.finish();
    let data_offset = container.len() as u32;
    container.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x11]);

    // Patch the frame to point at the garbage bytes.
    let rec = 12usize;
    container[rec + 8..rec + 12].copy_from_slice(&data_offset.to_le_bytes());
    container[rec + 12..rec + 16].copy_from_slice(&6u32.to_le_bytes());

    let err = extract(&container, &ExtractOptions::default()).unwrap_err();
    assert!(matches!(err, ExtractError::DecompressionFailed(_)), "got {err}");
}

#[test]
fn test_declared_length_mismatch_is_fatal() {
    let mut b = ContainerBuilder::new(ContainerKind::Jic);
    b.add_bitstream(&[1, 2, 3, 4]);
    b.set_orig_len(0, 99);
    let container = b.finish();

    let err = extract(&container, &ExtractOptions::default()).unwrap_err();
    assert!(
        matches!(err, ExtractError::LengthMismatch { declared: 99, actual: 4 }),
        "got {err}"
    );
}

#[test]
fn test_zero_checksum_means_absent() {
    let mut b = ContainerBuilder::new(ContainerKind::Jic);
    b.add_bitstream(&[0x10, 0x20]);
    b.set_checksum(0, 0);
    let container = b.finish();

    let image = extract(&container, &ExtractOptions::default()).unwrap();
    assert_eq!(image.checksum, ChecksumState::Absent);
    assert_eq!(image.as_bytes(), [0x08, 0x04]);
}

#[test]
fn test_checksum_mismatch_is_recorded_not_fatal() {
    let mut b = ContainerBuilder::new(ContainerKind::Jic);
    b.add_bitstream(&[0x10, 0x20]);
    b.set_checksum(0, 0xDEAD_BEEF);
    let container = b.finish();

    let image = extract(&container, &ExtractOptions::default()).unwrap();
    match image.checksum {
        ChecksumState::Mismatch { stored, computed } => {
            assert_eq!(stored, 0xDEAD_BEEF);
            assert_ne!(computed, stored);
        }
        other => panic!("expected mismatch, got {other:?}"),
    }
    // The image itself is still recovered.
    assert_eq!(image.as_bytes(), [0x08, 0x04]);
}

#[test]
fn test_require_checksum_promotes_mismatch_to_error() {
    let mut b = ContainerBuilder::new(ContainerKind::Jic);
    b.add_bitstream(&[0x10, 0x20]);
    b.set_checksum(0, 0xDEAD_BEEF);
    let container = b.finish();

    let opts = ExtractOptions { require_checksum: true, ..ExtractOptions::default() };
    let err = extract(&container, &opts).unwrap_err();
    assert!(
        matches!(err, ExtractError::ChecksumMismatch { stored: 0xDEAD_BEEF, .. }),
        "got {err}"
    );
}

#[test]
fn test_firmware_object_tag_is_stripped() {
    let image = [0x01u8, 0x80, 0xFF, 0x00, 0x3C];
    let mut b = ContainerBuilder::new(ContainerKind::Jic);
    b.add_bitstream_tagged(&image);
    let container = b.finish();

    let out = extract(&container, &ExtractOptions::default()).unwrap();
    // Length and checksum cover the 12 tag bytes, the image does not.
    assert_eq!(out.checksum, ChecksumState::Verified);
    assert_eq!(out.logical_len, image.len());
    let expected: Vec<u8> = image.iter().map(|b| b.reverse_bits()).collect();
    assert_eq!(out.as_bytes(), &expected[..]);
}

#[test]
fn test_padding_fills_with_erased_flash_byte() {
    let mut b = ContainerBuilder::new(ContainerKind::Jic);
    b.add_bitstream(&[1, 2, 3, 4, 5]);
    let container = b.finish();

    let opts = ExtractOptions { pad_to: Some(8), ..ExtractOptions::default() };
    let image = extract(&container, &opts).unwrap();
    assert_eq!(image.padded_len(), 8);
    assert_eq!(image.logical_len, 5);
    assert_eq!(image.padding(), 3);
    assert!(image.as_bytes()[5..].iter().all(|&b| b == 0xFF));

    // Already aligned: no growth.
    let opts = ExtractOptions { pad_to: Some(5), ..ExtractOptions::default() };
    let image = extract(&container, &opts).unwrap();
    assert_eq!(image.padded_len(), 5);
    assert_eq!(image.padding(), 0);
}

#[test]
fn test_zero_length_bitstream_extracts_empty_image() {
    let mut b = ContainerBuilder::new(ContainerKind::Jic);
    b.add_bitstream(&[]);
    let container = b.finish();

    let image = extract(&container, &ExtractOptions::default()).unwrap();
    assert!(image.as_bytes().is_empty());
    assert_eq!(image.checksum, ChecksumState::Absent);
}

#[test]
fn test_wrong_leader_is_rejected() {
    let mut b = ContainerBuilder::new(ContainerKind::Pof);
    b.add_bitstream(&[1, 2, 3]);
    let container = b.finish();

    let err = extract(&container, &ExtractOptions::default()).unwrap_err();
    assert!(matches!(err, ExtractError::LeaderMismatch { expected: "JIC" }), "got {err}");

    let opts = ExtractOptions { kind: ContainerKind::Pof, ..ExtractOptions::default() };
    assert!(extract(&container, &opts).is_ok());
}

#[test]
fn test_nonstrict_leader_matches_on_magic_alone() {
    let mut b = ContainerBuilder::new(ContainerKind::Jic);
    b.add_bitstream(&[0x55]);
    let mut container = b.finish();
    // Perturb the leader's class field; the JIC magic stays intact.
    container[8] ^= 0xFF;

    let err = extract(&container, &ExtractOptions::default()).unwrap_err();
    assert!(matches!(err, ExtractError::LeaderMismatch { .. }));

    let opts = ExtractOptions { strict: false, ..ExtractOptions::default() };
    let image = extract(&container, &opts).unwrap();
    assert_eq!(image.as_bytes(), [0xAA]);
}

#[test]
fn test_truncated_container_is_out_of_bounds() {
    let err = extract(&[], &ExtractOptions::default()).unwrap_err();
    assert!(matches!(err, ExtractError::OutOfBounds { .. }));

    let mut b = ContainerBuilder::new(ContainerKind::Jic);
    b.add_bitstream(&[1]);
    let container = b.finish();
    let err = extract(&container[..8], &ExtractOptions::default()).unwrap_err();
    assert!(matches!(err, ExtractError::OutOfBounds { .. }));
}

#[test]
fn test_sof_container_roundtrip() {
    let mut b = ContainerBuilder::new(ContainerKind::Sof);
    b.add_metadata(TAG_CHIP_NAME, "5CSEBA6U23I7");
    b.add_bitstream(&[0xC3, 0x3C]);
    let container = b.finish();

    let opts = ExtractOptions { kind: ContainerKind::Sof, ..ExtractOptions::default() };
    let image = extract(&container, &opts).unwrap();
    assert_eq!(image.as_bytes(), [0xC3, 0x3C]);
}

#[test]
fn test_extraction_is_deterministic() {
    let mut b = ContainerBuilder::new(ContainerKind::Jic);
    b.add_metadata(TAG_TITLE, "determinism");
    b.add_bitstream_compressed(&[0x11; 512], Scheme::Zstd).unwrap();
    let container = b.finish();

    let first = extract(&container, &ExtractOptions::default()).unwrap();
    let second = extract(&container, &ExtractOptions::default()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_extract_from_file_on_disk() {
    let mut b = ContainerBuilder::new(ContainerKind::Jic);
    b.add_metadata(TAG_FLASH_DEVICE, "EPCS64");
    b.add_bitstream(&[0x01, 0x80, 0xFF, 0x00]);
    let container = b.finish();

    let temp = NamedTempFile::new().unwrap();
    std::fs::write(temp.path(), &container).unwrap();

    let read_back = std::fs::read(temp.path()).unwrap();
    let image = extract(&read_back, &ExtractOptions::default()).unwrap();
    assert_eq!(image.as_bytes(), [0x80, 0x01, 0xFF, 0x00]);
}
