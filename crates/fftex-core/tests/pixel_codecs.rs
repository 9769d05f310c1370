use fftex_core::prelude::*;
use rand::{Rng, SeedableRng};

fn random_rgba(rng: &mut rand::rngs::StdRng, pixels: usize) -> Vec<u8> {
    (0..pixels * 4).map(|_| rng.r#gen::<u8>()).collect()
}

fn max_step(bits: u8) -> i32 {
    if bits == 0 {
        return 0;
    }
    let mask = (1u64 << bits) - 1;
    (255 / mask as i32) + 1
}

#[test]
fn unorm_layouts_round_trip_within_one_step() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(0x7E57);
    let shapes: [[u8; 4]; 6] = [
        [8, 8, 8, 8],
        [5, 6, 5, 0],
        [4, 4, 4, 4],
        [5, 5, 5, 1],
        [10, 10, 10, 2],
        [16, 0, 0, 0],
    ];
    for bits in shapes {
        let layout = ChannelLayout::new(bits, ChannelKind::Unorm).expect("layout");
        let (w, h) = (7, 5);
        let src = random_rgba(&mut rng, w * h);
        let packed = layout.encode(&src, w as u32, h as u32);
        assert_eq!(packed.len(), layout.calculate_size(w as u32, h as u32));
        let out = layout.decode(&packed, w as u32, h as u32);

        for (a, b) in src.chunks_exact(4).zip(out.chunks_exact(4)) {
            for c in 0..4 {
                if bits[c] == 0 {
                    assert_eq!(b[c], 255, "empty channel {c} of {bits:?} decodes to full");
                } else {
                    let diff = (a[c] as i32 - b[c] as i32).abs();
                    assert!(diff <= max_step(bits[c]), "{bits:?} channel {c}: {} -> {}", a[c], b[c]);
                }
            }
        }
    }
}

#[test]
fn rgba8_is_exact_and_bgra8_swaps_bytes() {
    let px = [10u8, 20, 30, 40];
    let rgba = ImageCodec::Rgba(ChannelLayout::rgba8());
    assert_eq!(rgba.encode(&px, 1, 1, BcQuality::Fast).expect("encode"), px);

    let bgra = ChannelLayout::bgra8();
    let packed = bgra.encode(&px, 1, 1);
    assert_eq!(packed, vec![30, 20, 10, 40]);
    assert_eq!(bgra.decode(&packed, 1, 1), px);
}

#[test]
fn snorm_round_trip_is_close() {
    let layout = ChannelLayout::rg8_snorm();
    for v in [0u8, 1, 64, 127, 128, 200, 254, 255] {
        let packed = layout.encode(&[v, 255 - v, 0, 0], 1, 1);
        let out = layout.decode(&packed, 1, 1);
        assert!((out[0] as i32 - v as i32).abs() <= 2, "{v} -> {}", out[0]);
        assert!((out[1] as i32 - (255 - v) as i32).abs() <= 2);
    }
    // Full scale maps to the largest positive code.
    assert_eq!(layout.encode(&[255, 0, 0, 0], 1, 1), vec![0x7F, 0x81]);
}

#[test]
fn float_layouts_round_trip() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(99);
    for layout in [ChannelLayout::rgba16_float(), ChannelLayout::rgba32_float()] {
        let src = random_rgba(&mut rng, 16);
        let out = layout.decode(&layout.encode(&src, 4, 4), 4, 4);
        for (a, b) in src.iter().zip(&out) {
            assert!((*a as i32 - *b as i32).abs() <= 1);
        }
    }

    // 1.0 as a half float.
    let packed = ChannelLayout::r16_float().encode(&[255, 0, 0, 0], 1, 1);
    assert_eq!(packed, vec![0x00, 0x3C]);
}

#[test]
fn single_channel_presets_replicate_and_place() {
    let r8 = ChannelLayout::r8();
    let gray = r8.decode(&[77], 1, 1);
    assert_eq!(gray, vec![77, 77, 77, 255]);

    let encoded = r8.encode(&[90, 90, 90, 10], 1, 1);
    assert!((encoded[0] as i32 - 90).abs() <= 1);

    let a8 = ChannelLayout::a8();
    assert_eq!(a8.decode(&[33], 1, 1), vec![255, 255, 255, 33]);
    assert_eq!(a8.encode(&[1, 2, 3, 200], 1, 1), vec![200]);
}

#[test]
fn luminance_uses_rec709_weights() {
    assert!(fftex_core::codec::rgba::luminance(&[255, 255, 255, 255]) >= 254);
    assert_eq!(fftex_core::codec::rgba::luminance(&[0, 0, 0, 255]), 0);
    // Green dominates.
    let g = fftex_core::codec::rgba::luminance(&[0, 255, 0, 255]);
    let r = fftex_core::codec::rgba::luminance(&[255, 0, 0, 255]);
    assert!(g > r);
    assert_eq!(r, 54);
}

#[test]
fn custom_order_fills_unknown_slots_with_full_intensity() {
    let layout = ChannelLayout::new([8, 8, 0, 0], ChannelKind::Unorm)
        .expect("layout")
        .with_order("GRX1");
    assert_eq!(layout.decode(&[1, 2], 1, 1), vec![2, 1, 255, 255]);
}

#[test]
fn degenerate_layouts_are_rejected() {
    let cases: [([u8; 4], ChannelKind); 5] = [
        ([0, 0, 0, 0], ChannelKind::Unorm),
        ([33, 0, 0, 0], ChannelKind::Unorm),
        ([8, 8, 8, 0], ChannelKind::Float),
        ([1, 0, 0, 0], ChannelKind::Snorm),
        ([32, 32, 32, 32], ChannelKind::Snorm),
    ];
    for (i, (bits, kind)) in cases.into_iter().enumerate() {
        let result = ChannelLayout::new(bits, kind);
        if i == 4 {
            assert!(result.is_ok(), "128 bits is the upper bound");
            continue;
        }
        match result {
            Err(TexError::InvalidInput(_)) => {}
            other => panic!("{bits:?} {kind:?}: expected InvalidInput, got {other:?}"),
        }
    }
}

#[test]
fn short_buffers_are_reported() {
    let codec = ImageCodec::Rgba(ChannelLayout::rgba8());
    match codec.decode(&[0u8; 15], 2, 2) {
        Err(TexError::TruncatedData { needed, available }) => {
            assert_eq!(needed, 16);
            assert_eq!(available, 15);
        }
        other => panic!("expected TruncatedData, got {other:?}"),
    }
    assert!(matches!(
        codec.encode(&[0u8; 4], 2, 2, BcQuality::Fast),
        Err(TexError::InvalidInput(_))
    ));
}

#[test]
fn codec_geometry() {
    let bc1 = TextureFormat::Bc1Unorm.codec().expect("bc1");
    assert_eq!(bc1.block_dimensions(), (4, 4));
    assert_eq!(bc1.bytes_per_unit(), 8);
    assert_eq!(bc1.calculate_size(5, 5), 2 * 2 * 8);

    let bc7 = TextureFormat::Bc7UnormSrgb.codec().expect("bc7");
    assert_eq!(bc7.calculate_size(64, 64), 16 * 16 * 16);

    let r11 = TextureFormat::R11G11B10Float.codec().expect("r11");
    assert_eq!(r11, ImageCodec::R11G11B10);
    assert_eq!(r11.calculate_size(3, 3), 36);

    assert!(matches!(
        TextureFormat::D32Float.codec(),
        Err(TexError::UnsupportedFormat(_))
    ));
}

#[test]
fn bc1_encode_decode_keeps_flat_color() {
    let codec = TextureFormat::Bc1Unorm.codec().expect("bc1");
    let (w, h) = (8u32, 4u32);
    let src: Vec<u8> = std::iter::repeat([255u8, 0, 0, 255])
        .take((w * h) as usize)
        .flatten()
        .collect();
    let blocks = codec.encode(&src, w, h, BcQuality::UltraFast).expect("encode");
    assert_eq!(blocks.len(), 16);
    let out = codec.decode(&blocks, w, h).expect("decode");
    for px in out.chunks_exact(4) {
        assert!(px[0] >= 248 && px[1] <= 8 && px[2] <= 8, "{px:?}");
        assert_eq!(px[3], 255);
    }
}

#[test]
fn bc2_decodes_explicit_alpha_but_does_not_encode() {
    let codec = TextureFormat::Bc2Unorm.codec().expect("bc2");
    // Alpha nibbles 0xF, colour 0 = pure white, all indices 0.
    let mut block = [0u8; 16];
    block[..8].fill(0x8F);
    block[8] = 0xFF;
    block[9] = 0xFF;
    let out = codec.decode(&block, 4, 4).expect("decode");
    assert_eq!(&out[..4], &[255, 255, 255, 0xFF]);
    assert_eq!(&out[4..8], &[255, 255, 255, 0x88]);

    // Partial edge blocks are cropped to the logical size.
    let blocks: Vec<u8> = block.iter().copied().cycle().take(16 * 4).collect();
    let cropped = codec.decode(&blocks, 6, 5).expect("decode 6x5");
    assert_eq!(cropped.len(), 6 * 5 * 4);
    assert_eq!(&cropped[6 * 4 * 4..6 * 4 * 4 + 4], &[255, 255, 255, 0xFF]);

    let rgba = vec![0u8; 64];
    assert!(matches!(
        codec.encode(&rgba, 4, 4, BcQuality::Fast),
        Err(TexError::UnimplementedCodec(_))
    ));
}

#[test]
fn signed_block_encoding_is_unimplemented() {
    let codec = TextureFormat::Bc5Snorm.codec().expect("bc5s");
    assert!(matches!(
        codec.encode(&[0u8; 64], 4, 4, BcQuality::Fast),
        Err(TexError::UnimplementedCodec(_))
    ));
}

#[test]
fn wide_channels_follow_the_layout_kind() {
    // Unorm fields wider than 8 bits are scaled integers, not float storage.
    let word: u32 = 1023 | (512 << 10) | (3 << 30);
    let rgb10a2 = ChannelLayout::rgb10a2().decode(&word.to_le_bytes(), 1, 1);
    assert_eq!(rgb10a2, vec![255, 127, 0, 255]);

    let r16 = ChannelLayout::r16_unorm().decode(&0x8000u16.to_le_bytes(), 1, 1);
    assert_eq!(r16[0], 127);

    // 32-bit float channels reinterpret IEEE-754 singles and scale by 255.
    let r32 = ChannelLayout::r32_float().decode(&0.5f32.to_le_bytes(), 1, 1);
    assert_eq!(r32, vec![128, 128, 128, 255]);

    // Float kinds only accept 16 and 32 bit channels.
    assert!(matches!(
        ChannelLayout::new([10, 10, 10, 2], ChannelKind::Float),
        Err(TexError::InvalidInput(_))
    ));
}
