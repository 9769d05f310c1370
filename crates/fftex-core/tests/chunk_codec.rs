use fftex_core::chunk::{ChunkFlags, MAX_CHUNK_SIZE};
use fftex_core::prelude::*;
use rand::{Rng, SeedableRng};

#[test]
fn deflate_round_trips() {
    let codec = DeflateCodec::new(6);
    let data: Vec<u8> = b"tex chunk ".iter().copied().cycle().take(10_000).collect();
    let packed = codec.compress(&data).expect("compress");
    assert!(packed.len() < data.len());
    assert_eq!(codec.decompress(&packed, data.len()).expect("decompress"), data);
}

#[test]
fn wrong_expected_length_is_truncation() {
    let codec = DeflateCodec::default();
    let packed = codec.compress(&[1u8; 64]).expect("compress");
    match codec.decompress(&packed, 100) {
        Err(TexError::TruncatedData { needed, available }) => {
            assert_eq!(needed, 100);
            assert_eq!(available, 64);
        }
        other => panic!("expected TruncatedData, got {other:?}"),
    }
    // More output than announced is also rejected.
    assert!(codec.decompress(&packed, 10).is_err());
}

#[test]
fn garbage_stream_is_a_compression_error() {
    let codec = DeflateCodec::default();
    assert!(matches!(
        codec.decompress(&[0xFF; 32], 128),
        Err(TexError::Compression(_)) | Err(TexError::TruncatedData { .. })
    ));
}

#[test]
fn level_is_clamped() {
    assert_eq!(DeflateCodec::new(42).level(), 9);
    assert_eq!(DeflateCodec::default().level(), 6);
}

#[test]
fn incompressible_chunks_are_written_raw() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(11);
    let noise: Vec<u8> = (0..512).map(|_| rng.r#gen::<u8>()).collect();

    let mut doc = TexDocument::default();
    doc.textures[0] = Texture::new(TextureFormat::R8Unorm, 16, 32, 1);
    doc.textures[0].set_image_data(vec![noise.clone()]).expect("set");
    let bytes = doc.to_bytes(&DeflateCodec::default()).expect("write");

    let chunk = &doc.textures[0].chunks[0];
    assert!(!chunk.is_compressed());
    assert_eq!(chunk.flags.compressed_size(), 512);

    let back = TexDocument::from_bytes(&bytes).expect("read");
    assert_eq!(back.textures[0].chunks[0].storage, ChunkStorage::Raw);
    assert_eq!(back.textures[0].chunks[0].data(), noise.as_slice());
}

#[test]
fn chunk_words_pack_type_size_and_index() {
    let chunk = Chunk::new(vec![0; 3], 1, 5);
    assert_eq!(chunk.chunk_type(), 1);
    assert_eq!(chunk.chunk_index(), 5);
    assert_eq!(chunk.decompressed_size(), 3);

    let mut flags = ChunkFlags(0);
    flags.set_chunk_type(1);
    flags.set_compressed_size(1000);
    assert_eq!(flags.0, (1000 << 2) | 1);
    assert_eq!(MAX_CHUNK_SIZE, (1 << 30) - 1);
}

#[test]
fn replacing_data_drops_stored_bytes() {
    let mut doc = TexDocument::default();
    doc.textures[0] = Texture::new(TextureFormat::R8Unorm, 64, 64, 1);
    doc.textures[0].set_image_data(vec![vec![0u8; 4096]]).expect("set");
    let bytes = doc.to_bytes(&DeflateCodec::default()).expect("write");

    let mut back = TexDocument::from_bytes(&bytes).expect("read");
    back.textures[0].chunks[0].set_data(vec![1u8; 4096]);
    let rewritten = back.to_bytes(&DeflateCodec::default()).expect("rewrite");

    let again = TexDocument::from_bytes(&rewritten).expect("reread");
    assert!(again.textures[0].chunks[0].data().iter().all(|&b| b == 1));
}

#[test]
fn huge_expected_length_is_truncation_not_allocation() {
    let codec = DeflateCodec::default();
    let packed = codec.compress(&[7u8; 32]).expect("compress");
    match codec.decompress(&packed, 1usize << 40) {
        Err(TexError::TruncatedData { needed, available }) => {
            assert_eq!(needed, 1u64 << 40);
            assert_eq!(available, 32);
        }
        other => panic!("expected TruncatedData, got {other:?}"),
    }
}

#[test]
fn compressed_state_follows_the_held_bytes() {
    let mut doc = TexDocument::default();
    doc.textures[0] = Texture::new(TextureFormat::R8Unorm, 64, 64, 1);
    doc.textures[0].set_image_data(vec![vec![0u8; 4096]]).expect("set");
    assert!(!doc.textures[0].chunks[0].is_compressed());

    let bytes = doc.to_bytes(&DeflateCodec::default()).expect("write");
    assert!(doc.textures[0].chunks[0].is_compressed());

    let mut back = TexDocument::from_bytes(&bytes).expect("read");
    let chunk = &mut back.textures[0].chunks[0];
    assert!(chunk.is_compressed());

    // Stale size words must not make a replaced payload look compressed.
    chunk.set_data(vec![9u8; 4096]);
    assert!(!chunk.is_compressed());
    assert_eq!(chunk.decompressed_size(), 4096);
}
