use fftex_core::prelude::*;

const DEFAULT_TEXTURE_FLAGS: u32 = 0xFFFF_FF81;

fn u32_at(bytes: &[u8], pos: usize) -> u32 {
    u32::from_le_bytes([bytes[pos], bytes[pos + 1], bytes[pos + 2], bytes[pos + 3]])
}

/// A one-texture, one-chunk file with the payload stored raw at offset 96.
fn single_chunk_tex(format: u32, width: u16, height: u16, payload: &[u8]) -> Vec<u8> {
    let mut b = Vec::new();
    b.extend_from_slice(b"TEX ");
    b.extend_from_slice(&[4, 1, 16, 0, 1, 0]);
    b.extend_from_slice(&1u16.to_le_bytes());
    b.extend_from_slice(&0u32.to_le_bytes());
    b.extend_from_slice(&0u32.to_le_bytes());
    b.extend_from_slice(&0x13u32.to_le_bytes());
    b.extend_from_slice(&[0u8; 16]);
    assert_eq!(b.len(), 40);

    b.extend_from_slice(&DEFAULT_TEXTURE_FLAGS.to_le_bytes());
    b.extend_from_slice(&format.to_le_bytes());
    for v in [1u16, width, height, 1] {
        b.extend_from_slice(&v.to_le_bytes());
    }
    b.extend_from_slice(&96u32.to_le_bytes());
    b.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    b.extend_from_slice(&0xFFA6_AFC7u32.to_le_bytes());
    b.extend_from_slice(&0u16.to_le_bytes());
    b.extend_from_slice(&1u16.to_le_bytes());
    assert_eq!(b.len(), 72);

    b.extend_from_slice(&96u32.to_le_bytes());
    b.extend_from_slice(&((payload.len() as u32) << 2).to_le_bytes());
    b.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    b.extend_from_slice(&0u32.to_le_bytes());
    b.resize(96, 0);
    b.extend_from_slice(payload);
    b
}

#[test]
fn fresh_document_round_trips() {
    let mut doc = TexDocument::default();
    assert_eq!(doc.textures.len(), 1);
    assert_eq!(doc.textures[0].flags.0, DEFAULT_TEXTURE_FLAGS);
    assert_eq!(doc.textures[0].format, TextureFormat::Bc7UnormSrgb);

    let bytes = doc.to_bytes(&DeflateCodec::default()).expect("write");
    assert_eq!(&bytes[..4], b"TEX ");
    // Header and one record, padded to 16.
    assert_eq!(bytes.len(), 80);
    assert_eq!(u32_at(&bytes, 40 + 16), 80);

    let back = TexDocument::from_bytes(&bytes).expect("read");
    assert_eq!(back, doc);
    assert_eq!(back.header.unknown_flags, 0x13);
}

#[test]
fn unchanged_bc1_chunk_rewrites_byte_for_byte() {
    let payload: Vec<u8> = (0..2048u32).map(|i| (i * 31 % 251) as u8).collect();
    let original = single_chunk_tex(TextureFormat::Bc1Unorm.code(), 64, 64, &payload);

    let mut doc = TexDocument::from_bytes(&original).expect("read");
    let texture = &mut doc.textures[0];
    assert_eq!(texture.chunks.len(), 1);
    assert_eq!(texture.chunks[0].storage, ChunkStorage::Raw);

    let data = texture.image_data(AlignmentPolicy::Dimension).expect("image data");
    assert_eq!(data, payload);
    texture.set_image_data(vec![data]).expect("set");

    let rewritten = doc.to_bytes(&DeflateCodec::default()).expect("write");
    assert_eq!(rewritten, original);
}

#[test]
fn decoded_pixels_survive_write_then_read() {
    let mut doc = TexDocument::default();
    let texture = &mut doc.textures[0];
    *texture = Texture::new(TextureFormat::R8G8B8A8Unorm, 3, 2, 1);
    let pixels: Vec<u8> = (0..24).collect();
    let hardware = fftex_core::surface::to_hardware_levels(
        texture,
        AlignmentPolicy::Dimension,
        &[pixels.clone()],
    )
    .expect("pad");
    texture.set_image_data(hardware).expect("set");

    let bytes = doc.to_bytes(&DeflateCodec::new(9)).expect("write");
    let back = TexDocument::from_bytes(&bytes).expect("read");
    let mips = back.textures[0]
        .linear_mips(AlignmentPolicy::Dimension)
        .expect("linear");
    assert_eq!(mips, vec![pixels]);
}

#[test]
fn bad_magic_is_malformed() {
    let mut bytes = single_chunk_tex(TextureFormat::Bc1Unorm.code(), 4, 4, &[0; 8]);
    bytes[..4].copy_from_slice(b"XET ");
    match TexDocument::from_bytes(&bytes) {
        Err(TexError::MalformedHeader(_)) => {}
        other => panic!("expected MalformedHeader, got {other:?}"),
    }
}

#[test]
fn unknown_format_code_is_unsupported() {
    let bytes = single_chunk_tex(0xDEAD, 4, 4, &[0; 8]);
    match TexDocument::from_bytes(&bytes) {
        Err(TexError::UnsupportedFormat(msg)) => assert!(msg.contains("0xdead")),
        other => panic!("expected UnsupportedFormat, got {other:?}"),
    }
}

#[test]
fn payload_past_end_is_truncated() {
    let mut bytes = single_chunk_tex(TextureFormat::Bc1Unorm.code(), 64, 64, &[0x55; 2048]);
    bytes.truncate(bytes.len() - 100);
    match TexDocument::from_bytes(&bytes) {
        Err(TexError::TruncatedData { needed, available }) => {
            assert_eq!(needed, 2048);
            assert_eq!(available, 1948);
        }
        other => panic!("expected TruncatedData, got {other:?}"),
    }
}

#[test]
fn chunk_run_outside_the_table_is_malformed() {
    let mut bytes = single_chunk_tex(TextureFormat::Bc1Unorm.code(), 4, 4, &[0; 8]);
    // Texture claims two chunks, the file has one.
    bytes[70..72].copy_from_slice(&2u16.to_le_bytes());
    assert!(matches!(
        TexDocument::from_bytes(&bytes),
        Err(TexError::MalformedHeader(_))
    ));
}

#[test]
fn every_texture_points_at_its_first_payload() {
    let mut doc = TexDocument::default();
    doc.textures[0] = Texture::new(TextureFormat::R8G8B8A8Unorm, 4, 4, 2);
    doc.textures[0]
        .set_image_data(vec![vec![1u8; 100], vec![2u8; 30]])
        .expect("set");
    let mut second = Texture::new(TextureFormat::R8Unorm, 16, 16, 1);
    let noise: Vec<u8> = (0..=255u8).collect();
    second.set_image_data(vec![noise.clone()]).expect("set");
    doc.textures.push(second);

    let bytes = doc.to_bytes(&DeflateCodec::default()).expect("write");
    assert_eq!(doc.header.texture_count, 2);
    assert_eq!(doc.header.chunk_count, 3);

    let descriptors = 40 + 2 * 32;
    let data_start = (descriptors + 3 * 16 + 15) / 16 * 16;
    let first = u32_at(&bytes, 40 + 16);
    let second = u32_at(&bytes, 40 + 32 + 16);
    assert_eq!(first as usize, data_start);
    assert_eq!(first, u32_at(&bytes, descriptors));
    assert_eq!(second, u32_at(&bytes, descriptors + 2 * 16));
    assert_eq!(second % 8, 0);
    assert_eq!(doc.textures[1].chunk_offset, second);

    let back = TexDocument::from_bytes(&bytes).expect("read");
    assert_eq!(back.textures[1].chunk_index, 2);
    assert_eq!(back.textures[1].chunks[0].data(), noise.as_slice());
    assert_eq!(back.textures[0].chunks[1].data(), &[2u8; 30][..]);
    assert_eq!(back.textures[0].chunks[1].chunk_type(), 1);
    assert_eq!(back.textures[0].chunks[1].chunk_index(), 1);
}

#[test]
fn chunk_size_counts_alignment_gaps() {
    let mut doc = TexDocument::default();
    let texture = &mut doc.textures[0];
    let mut a = Chunk::new(vec![7; 13], 0, 0);
    a.storage = ChunkStorage::Raw;
    let mut b = Chunk::new(vec![9; 5], 1, 1);
    b.storage = ChunkStorage::Raw;
    texture.chunks = vec![a, b];

    let bytes = doc.to_bytes(&DeflateCodec::default()).expect("write");
    assert_eq!(doc.textures[0].chunk_size, 13 + 3 + 5);

    let descriptors = 40 + 32;
    let a_at = u32_at(&bytes, descriptors) as usize;
    let b_at = u32_at(&bytes, descriptors + 16) as usize;
    assert_eq!(b_at - a_at, 16);
    assert_eq!(&bytes[b_at..b_at + 5], &[9; 5]);
    assert_eq!(bytes.len(), b_at + 5);
}

#[test]
fn compressed_chunks_round_trip_and_rewrite_identically() {
    let mut doc = TexDocument::default();
    doc.textures[0] = Texture::new(TextureFormat::R8Unorm, 64, 64, 1);
    doc.textures[0].set_image_data(vec![vec![0u8; 4096]]).expect("set");

    let codec = DeflateCodec::new(6);
    let first = doc.to_bytes(&codec).expect("write");
    assert!(first.len() < 4096);

    let mut back = TexDocument::from_bytes(&first).expect("read");
    let chunk = &back.textures[0].chunks[0];
    assert!(chunk.is_compressed());
    assert_eq!(chunk.decompressed_size(), 4096);
    assert!(chunk.data().iter().all(|&b| b == 0));

    let second = back.to_bytes(&DeflateCodec::new(1)).expect("rewrite");
    assert_eq!(second, first);
}

#[test]
fn set_image_data_needs_a_level() {
    let mut texture = Texture::default();
    assert!(matches!(
        texture.set_image_data(Vec::new()),
        Err(TexError::InvalidInput(_))
    ));
}

#[test]
fn image_data_drops_bytes_past_the_surface() {
    let mut texture = Texture::new(TextureFormat::Bc1Unorm, 64, 64, 1);
    texture.set_image_data(vec![vec![1u8; 2048 + 64]]).expect("set");
    let data = texture.image_data(AlignmentPolicy::Dimension).expect("data");
    assert_eq!(data.len(), 2048);
}

#[test]
fn undecodable_chunk_stays_opaque_and_rewrites_identically() {
    // Sizes differ, so the reader treats the payload as compressed; it is not deflate.
    let stream: Vec<u8> = (0..64u8).map(|i| i.wrapping_mul(37) | 0x80).collect();
    let mut original = single_chunk_tex(TextureFormat::Bc1Unorm.code(), 64, 64, &stream);
    original[72 + 8..72 + 12].copy_from_slice(&2048u32.to_le_bytes());

    let mut doc = TexDocument::from_bytes(&original).expect("read");
    let chunk = &doc.textures[0].chunks[0];
    assert!(!chunk.is_decoded());
    assert!(chunk.is_compressed());
    assert_eq!(chunk.decompressed_size(), 2048);

    match doc.textures[0].image_data(AlignmentPolicy::Dimension) {
        Err(TexError::UnimplementedCodec(msg)) => assert!(msg.contains("chunk 0")),
        other => panic!("expected UnimplementedCodec, got {other:?}"),
    }

    let rewritten = doc.to_bytes(&DeflateCodec::default()).expect("write");
    assert_eq!(rewritten, original);

    // New pixels replace the opaque stream.
    doc.textures[0].set_image_data(vec![vec![0u8; 2048]]).expect("set");
    assert!(doc.textures[0].chunks[0].is_decoded());
    assert!(doc.textures[0].image_data(AlignmentPolicy::Dimension).is_ok());
}

#[test]
fn oversized_payload_length_fails_without_reserving_it() {
    let mut bytes = single_chunk_tex(TextureFormat::Bc1Unorm.code(), 64, 64, &[0x11; 32]);
    let huge = (1u32 << 30) - 1;
    bytes[72 + 4..72 + 8].copy_from_slice(&(huge << 2).to_le_bytes());
    bytes[72 + 8..72 + 12].copy_from_slice(&huge.to_le_bytes());
    match TexDocument::from_bytes(&bytes) {
        Err(TexError::TruncatedData { needed, available }) => {
            assert_eq!(needed, huge as u64);
            assert_eq!(available, 32);
        }
        other => panic!("expected TruncatedData, got {other:?}"),
    }
}
